use std::sync::Arc;

use foodorder::app::otp::{
    clock::SystemClock,
    redis_store::{RedisOtpStore, OTP_RECORD_RETENTION},
    store::OtpStore,
    OtpManager, OtpRecord, VerifyOutcome,
};
use redis::AsyncCommands;
use time::OffsetDateTime;

mod common;
use common::helpers::{random_email, redis_test_client, Outbox};

fn key_for(email: &str) -> String {
    format!("otp:{}", email)
}

async fn raw_record(client: &redis::Client, email: &str) -> Option<OtpRecord> {
    let mut conn = client
        .get_multiplexed_tokio_connection()
        .await
        .expect("failed to connect to redis");

    let raw: Option<String> = conn
        .get(key_for(email))
        .await
        .expect("failed to get value from redis");

    raw.map(|v| serde_json::from_str(&v).expect("stored record is not json"))
}

#[tokio::test]
async fn redis_store_set_get_delete() {
    let client = redis_test_client();
    let store = RedisOtpStore::new(client.clone());
    let email = random_email();

    let record = OtpRecord {
        code: "482913".to_string(),
        issued_at: OffsetDateTime::now_utc().replace_nanosecond(0).unwrap(),
        attempts: 1,
    };
    store.set(&email, record.clone()).await.unwrap();

    let mut conn = client.get_multiplexed_tokio_connection().await.unwrap();
    let exists: bool = conn.exists(key_for(&email)).await.unwrap();
    assert!(exists, "expected record under otp:<email>");

    let ttl: i64 = conn.ttl(key_for(&email)).await.unwrap();
    assert!(ttl > 0, "expected a retention ttl, got {}", ttl);
    assert!(ttl <= OTP_RECORD_RETENTION.whole_seconds());

    assert_eq!(store.get(&email).await.unwrap(), Some(record));

    store.delete(&email).await.unwrap();
    assert!(store.get(&email).await.unwrap().is_none());

    let exists: bool = conn.exists(key_for(&email)).await.unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn redis_store_get_missing_is_none() {
    let store = RedisOtpStore::new(redis_test_client());

    assert!(store.get(&random_email()).await.unwrap().is_none());
}

#[tokio::test]
async fn manager_over_redis_persists_failed_attempts() {
    let client = redis_test_client();
    let outbox = Arc::new(Outbox::default());
    let manager = OtpManager::new(
        Arc::new(RedisOtpStore::new(client.clone())),
        outbox.clone(),
        Arc::new(SystemClock),
    );
    let email = random_email();

    manager.issue(&email).await.unwrap();
    let code = outbox.last_code_for(&email).expect("no email sent");

    let stored = raw_record(&client, &email).await.expect("no record stored");
    assert_eq!(stored.code, code);
    assert_eq!(stored.attempts, 0);

    let wrong = if code == "999999" { "999998" } else { "999999" };
    assert_eq!(
        manager.verify(&email, wrong).await.unwrap(),
        VerifyOutcome::Invalid
    );
    assert_eq!(raw_record(&client, &email).await.unwrap().attempts, 1);

    assert_eq!(
        manager.verify(&email, &code).await.unwrap(),
        VerifyOutcome::Verified
    );
    assert!(raw_record(&client, &email).await.is_none());

    assert_eq!(
        manager.verify(&email, &code).await.unwrap(),
        VerifyOutcome::NotFound
    );
}

#[tokio::test]
async fn manager_over_redis_locks_out() {
    let client = redis_test_client();
    let outbox = Arc::new(Outbox::default());
    let manager = OtpManager::new(
        Arc::new(RedisOtpStore::new(client.clone())),
        outbox.clone(),
        Arc::new(SystemClock),
    );
    let email = random_email();

    manager.issue(&email).await.unwrap();
    let code = outbox.last_code_for(&email).unwrap();
    let wrong = if code == "999999" { "999998" } else { "999999" };

    manager.verify(&email, wrong).await.unwrap();
    manager.verify(&email, wrong).await.unwrap();
    assert_eq!(
        manager.verify(&email, wrong).await.unwrap(),
        VerifyOutcome::LockedOut
    );
    assert!(raw_record(&client, &email).await.is_none());
}
