use anyhow::Context;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use super::{store::OtpStore, OtpRecord};

/// How long a record may linger in redis before it is evicted.
///
/// Logical expiry is checked by the manager. This only bounds memory for
/// codes that are never verified.
pub const OTP_RECORD_RETENTION: time::Duration = time::Duration::days(1);

/// Stores records as JSON under `otp:{email}`.
pub struct RedisOtpStore {
    client: Client,
}

impl RedisOtpStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn get_db_key(&self, email: &str) -> String {
        format!("otp:{}", email)
    }

    async fn connection(&self) -> anyhow::Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .context("failed to connect to redis")
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    #[tracing::instrument(name = "Getting OTP record from redis", skip_all)]
    async fn get(&self, email: &str) -> anyhow::Result<Option<OtpRecord>> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(self.get_db_key(email))
            .await
            .context("failed to get value from redis")?;

        raw.map(|v| serde_json::from_str(&v).context("failed to decode OTP record"))
            .transpose()
    }

    #[tracing::instrument(name = "Storing OTP record into redis", skip_all)]
    async fn set(&self, email: &str, record: OtpRecord) -> anyhow::Result<()> {
        let mut conn = self.connection().await?;
        let value = serde_json::to_string(&record).context("failed to encode OTP record")?;

        let _: () = conn
            .set_ex(
                self.get_db_key(email),
                value,
                OTP_RECORD_RETENTION.whole_seconds() as u64,
            )
            .await
            .context("failed to store value to redis")?;

        Ok(())
    }

    #[tracing::instrument(name = "Deleting OTP record from redis", skip_all)]
    async fn delete(&self, email: &str) -> anyhow::Result<()> {
        let mut conn = self.connection().await?;

        let _: () = conn
            .del(self.get_db_key(email))
            .await
            .context("failed to delete key")?;

        Ok(())
    }
}
