use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::OtpRecord;

/// Keyed storage for outstanding OTP records, one per email.
///
/// Implementations only need plain get/set/delete. Read-modify-write
/// sequences are serialized by [`super::OtpManager`].
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn get(&self, email: &str) -> anyhow::Result<Option<OtpRecord>>;

    /// Overwrites any existing record for `email`.
    async fn set(&self, email: &str, record: OtpRecord) -> anyhow::Result<()>;

    async fn delete(&self, email: &str) -> anyhow::Result<()>;
}

/// Process-local store. Everything is lost on restart.
#[derive(Default)]
pub struct InMemoryOtpStore {
    records: RwLock<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn get(&self, email: &str) -> anyhow::Result<Option<OtpRecord>> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn set(&self, email: &str, record: OtpRecord) -> anyhow::Result<()> {
        self.records.write().await.insert(email.to_owned(), record);
        Ok(())
    }

    async fn delete(&self, email: &str) -> anyhow::Result<()> {
        self.records.write().await.remove(email);
        Ok(())
    }
}
