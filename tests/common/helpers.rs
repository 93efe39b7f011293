use async_trait::async_trait;
use clap::Parser;
use fake::{faker::internet::en::SafeEmail, Fake};
use foodorder::{
    app::{
        email::client::EmailTransport,
        otp::{clock::SystemClock, store::InMemoryOtpStore, OtpManager},
        get_redis_client, Application,
    },
    config::AppConfig,
    telemetry::register_telemetry,
};
use std::sync::{Arc, LazyLock, Mutex};

static TELEMETRY: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        register_telemetry(std::io::stdout);
    } else {
        register_telemetry(std::io::sink);
    }
});

pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Keeps every email instead of sending it.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<SentEmail>>,
}

impl Outbox {
    pub fn count_for(&self, email: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == email)
            .count()
    }

    /// Code from the most recent email sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let body = &sent.iter().rev().find(|m| m.to == email)?.html_body;

        let start = body.find("<h2>")? + "<h2>".len();
        let end = body[start..].find("</h2>")? + start;
        Some(body[start..end].to_string())
    }

    pub fn last_subject_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == email)
            .map(|m| m.subject.clone())
    }
}

#[async_trait]
impl EmailTransport for Outbox {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct BrokenTransport;

#[async_trait]
impl EmailTransport for BrokenTransport {
    async fn send_email(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
        anyhow::bail!("email provider unavailable")
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub outbox: Arc<Outbox>,
    pub store: Arc<InMemoryOtpStore>,
}

impl TestApp {
    pub async fn post_send_otp(&self, email: &str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/api/send-otp", &self.address))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn post_verify_otp(&self, email: &str, otp: &str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/api/verify-otp", &self.address))
            .json(&serde_json::json!({ "email": email, "otp": otp }))
            .send()
            .await
            .expect("failed to execute request")
    }
}

pub fn random_email() -> String {
    SafeEmail().fake()
}

fn test_config() -> AppConfig {
    AppConfig::parse_from([
        "foodorder",
        "--stage",
        "dev",
        "--app-application-host",
        "127.0.0.1",
        // Use a random OS port
        "--app-application-port",
        "0",
        "--email-sender",
        "noreply@example.com",
        "--email-should-mock",
    ])
}

/// Client for the redis instance at `REDIS_URI`, local default otherwise.
pub fn redis_test_client() -> redis::Client {
    dotenvy::dotenv().ok();

    let uri = std::env::var("REDIS_URI").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let mut config = test_config();
    config.redis_uri = Some(uri.into());

    get_redis_client(&config).expect("invalid redis uri")
}

pub async fn spawn_app() -> TestApp {
    let outbox = Arc::new(Outbox::default());
    spawn_app_with_transport(outbox.clone(), outbox).await
}

/// `outbox` is only inspected, `transport` is what the app sends through.
pub async fn spawn_app_with_transport(
    transport: Arc<dyn EmailTransport>,
    outbox: Arc<Outbox>,
) -> TestApp {
    LazyLock::force(&TELEMETRY);

    let store = Arc::new(InMemoryOtpStore::new());
    let otp_manager = OtpManager::new(store.clone(), transport, Arc::new(SystemClock));

    let app = Application::build_with_otp_manager(test_config(), otp_manager)
        .await
        .expect("failed to build application");

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let test_app = TestApp {
        address: format!("http://127.0.0.1:{}", &app.port),
        port: app.port,
        api_client,
        outbox,
        store,
    };

    _ = tokio::spawn(app.run_until_stopped());

    test_app
}
