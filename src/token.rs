use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Expiry for a credential valid for `ttl` seconds from now.
pub fn expiry_timestamp(ttl: u64) -> u64 {
    (SystemTime::now() + Duration::from_secs(ttl))
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Mints the bearer credential the recorder bot presents when joining a
/// channel. Scope: app + channel + uid, bounded by `expires_at`.
///
/// combo -> "{app_id}:{channel}:{uid}:{expires_at}",
/// credential -> base64(combo) + "." + base64(hmac_sha1(combo, certificate))
pub fn recorder_credential(
    app_id: &str,
    certificate: &str,
    channel: &str,
    uid: u64,
    expires_at: u64,
) -> String {
    let combo = format!("{}:{}:{}:{}", app_id, channel, uid, expires_at);
    let signature = sign(certificate, &combo);
    format!("{}.{}", STANDARD.encode(&combo), signature)
}

fn sign(certificate: &str, combo: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(certificate.as_bytes()).expect("HMAC can take key of any size");
    mac.update(combo.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}
