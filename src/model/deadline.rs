use std::future::Future;
use std::time::Duration;

use rocket::tokio::time;

use crate::error::{Error, Result};

/// Run a call to an external collaborator, failing with [`Error::Timeout`]
/// naming `peer` if it does not complete within `limit`.
pub async fn with_timeout<T, F>(peer: &'static str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("Call to the {peer} exceeded {}ms", limit.as_millis());
            Err(Error::Timeout(peer))
        }
    }
}
