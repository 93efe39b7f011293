use std::{ops::RangeInclusive, sync::Arc};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::app::email::{client::EmailTransport, template};

pub mod clock;
pub mod redis_store;
pub mod store;

use clock::Clock;
use store::OtpStore;

/// A code older than this is rejected on the next verify.
pub const OTP_EXPIRY: time::Duration = time::Duration::minutes(10);

/// Failed guesses allowed before the challenge is dropped.
pub const OTP_MAX_ATTEMPTS: u32 = 3;

/// Six digits without a leading zero.
pub const OTP_CODE_RANGE: RangeInclusive<u32> = 100_000..=999_999;

/// One outstanding challenge for an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    NotFound,
    Expired,
    LockedOut,
    Invalid,
}

impl VerifyOutcome {
    /// Message shown to the user when the outcome is a rejection.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Verified => "OTP verified",
            Self::NotFound => "OTP expired or not found",
            Self::Expired => "OTP expired",
            Self::LockedOut => "Too many failed attempts",
            Self::Invalid => "Invalid OTP",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

#[derive(Error, Debug)]
pub enum OtpError {
    #[error("failed to deliver OTP email")]
    Transport(#[source] anyhow::Error),

    #[error("failed to access OTP store")]
    Store(#[source] anyhow::Error),
}

pub fn generate_code() -> String {
    rand::thread_rng().gen_range(OTP_CODE_RANGE).to_string()
}

/// Issues and verifies email OTPs.
///
/// Store access is serialized by a single lock so an issue and a verify
/// for the same address never interleave.
pub struct OtpManager {
    store: Arc<dyn OtpStore>,
    transport: Arc<dyn EmailTransport>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl OtpManager {
    pub fn new(
        store: Arc<dyn OtpStore>,
        transport: Arc<dyn EmailTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Send a fresh code to `email`, replacing any outstanding one.
    ///
    /// Nothing is stored unless the email went out.
    #[tracing::instrument(name = "Issuing OTP", skip_all, fields(email = %email))]
    pub async fn issue(&self, email: &str) -> Result<(), OtpError> {
        let code = generate_code();
        let message = template::password_reset_otp(&code, OTP_EXPIRY.whole_minutes());

        self.transport
            .send_email(email, &message.subject, &message.html_body)
            .await
            .map_err(OtpError::Transport)?;

        let record = OtpRecord {
            code,
            issued_at: self.clock.now(),
            attempts: 0,
        };

        let _guard = self.lock.lock().await;
        self.store
            .set(email, record)
            .await
            .map_err(OtpError::Store)?;

        tracing::info!("OTP issued");
        Ok(())
    }

    #[tracing::instrument(name = "Verifying OTP", skip(self, submitted))]
    pub async fn verify(&self, email: &str, submitted: &str) -> Result<VerifyOutcome, OtpError> {
        let _guard = self.lock.lock().await;

        let Some(mut record) = self.store.get(email).await.map_err(OtpError::Store)? else {
            return Ok(VerifyOutcome::NotFound);
        };

        let outcome = if self.clock.now() - record.issued_at > OTP_EXPIRY {
            VerifyOutcome::Expired
        } else if submitted == record.code {
            VerifyOutcome::Verified
        } else {
            record.attempts += 1;
            if record.attempts >= OTP_MAX_ATTEMPTS {
                VerifyOutcome::LockedOut
            } else {
                VerifyOutcome::Invalid
            }
        };

        if outcome.is_terminal() {
            self.store.delete(email).await.map_err(OtpError::Store)?;
        } else {
            self.store
                .set(email, record)
                .await
                .map_err(OtpError::Store)?;
        }

        tracing::info!(?outcome, "OTP verify finished");
        Ok(outcome)
    }
}
