use crate::config::Config;
use crate::ingest::Ingestor;
use crate::session::manager::Manager;
use crate::uploads::UploadStore;

pub mod files;
pub mod recording;
pub mod webhook;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Manager,
    pub uploads: UploadStore,
    pub ingestor: Ingestor,
}
