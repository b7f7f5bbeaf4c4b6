//! Off-runtime backup decryption
//!
//! Opening a sealed backup costs a full PBKDF2 derivation at the container
//! tier, so it runs on the blocking pool. Dropping the returned future
//! abandons the result.

use crate::Result;
use kosh_storage::container;
use zeroize::Zeroizing;

/// Decode backup bytes into their JSON document.
///
/// `Ok(None)` means the bytes could not be opened with `pin`; an error means
/// the worker itself failed.
pub async fn open_backup(data: Vec<u8>, pin: Option<String>) -> Result<Option<serde_json::Value>> {
    let pin = pin.map(Zeroizing::new);
    let opened = tokio::task::spawn_blocking(move || {
        container::deserialize_value(&data, pin.as_ref().map(|p| p.as_str()))
    })
    .await?;
    Ok(opened)
}
