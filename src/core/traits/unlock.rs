use std::future::Future;

use async_trait::async_trait;

use crate::core::errors::Result;
use crate::core::models::key::Key;
use crate::core::models::message::UnlockedKey;

/// Capability that turns a locked private key into usable material.
///
/// Fails with `UnlockFailed` or `UnlockCancelled`. Retrying is the
/// implementation's business: callers ask exactly once per operation.
#[async_trait]
pub trait KeyUnlocker: Send + Sync {
    async fn unlock(&self, key: &Key) -> Result<UnlockedKey>;
}

#[async_trait]
impl<F, Fut> KeyUnlocker for F
where
    F: Fn(Key) -> Fut + Send + Sync,
    Fut: Future<Output = Result<UnlockedKey>> + Send + 'static,
{
    async fn unlock(&self, key: &Key) -> Result<UnlockedKey> {
        (self)(key.clone()).await
    }
}
