use lazy_static::lazy_static;
use prometheus::{Gauge, Registry, TextEncoder};

lazy_static! {
    pub static ref SESSIONS: Gauge = Gauge::new("sessions", "active recording sessions").unwrap();
    pub static ref BATCHES: Gauge = Gauge::new("upload_batches", "stored upload batches").unwrap();
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("cloudrec".to_string()), None).unwrap();
    pub static ref ENCODER: TextEncoder = TextEncoder::new();
}
