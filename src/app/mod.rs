use anyhow::Context;
use aws_config::BehaviorVersion;
use axum::Router;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

use axum::{extract::MatchedPath, http::Request};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info_span;

pub mod email;
pub mod error;
pub mod extrator;
pub mod otp;

use crate::{
    config::{AppConfig, OtpStoreKind, Stage},
    routes::{docs, health_check, otp as otp_routes},
};
use email::client::{EmailClient, EmailTransport};
use otp::{
    clock::SystemClock,
    redis_store::RedisOtpStore,
    store::{InMemoryOtpStore, OtpStore},
    OtpManager,
};

pub struct Application {
    listener: TcpListener,
    pub port: u16,
    app: Router,
}

#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<AppConfig>,
    pub otp_manager: Arc<OtpManager>,
}

impl Application {
    pub async fn build(config: AppConfig) -> Result<Self, anyhow::Error> {
        let otp_manager = build_otp_manager(&config).await?;

        Self::build_with_otp_manager(config, otp_manager).await
    }

    /// Build with an already wired OTP manager, tests use this to swap the
    /// email transport.
    pub async fn build_with_otp_manager(
        config: AppConfig,
        otp_manager: OtpManager,
    ) -> Result<Self, anyhow::Error> {
        // Connection
        let addr = format!(
            "{}:{}",
            config.app_application_host, config.app_application_port
        );
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        let api_context = ApiContext {
            config: Arc::new(config),
            otp_manager: Arc::new(otp_manager),
        };

        let app = build_routes(api_context);

        Ok(Self {
            port,
            listener,
            app,
        })
    }

    /// Used in main, run the app
    pub async fn run_gracefully(
        self,
        close_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move {
                _ = close_rx.await;
            })
            .await
            .context("server error")
    }

    /// Useful for tests
    /// Don't use in main
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.app)
            .await
            .context("server error")
    }
}

fn build_routes(api_context: ApiContext) -> Router {
    Router::new()
        .merge(health_check::router())
        .merge(docs::router())
        .nest("/api", otp_routes::router())
        .with_state(api_context)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let request_id = Uuid::new_v4();

                    let matched_path = req
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str);

                    info_span!(
                        "http_request",
                        method = ?req.method(),
                        matched_path,
                        request_id = ?request_id,
                    )
                })
                .on_failure(()),
        )
}

pub fn get_redis_client(config: &AppConfig) -> anyhow::Result<redis::Client> {
    let uri = config
        .redis_uri
        .as_ref()
        .context("REDIS_URI is required when OTP_STORE=redis")?;

    redis::Client::open(uri.expose_secret()).context("invalid redis uri")
}

/// Wire the OTP manager from config: store backend, SES transport, system clock.
pub async fn build_otp_manager(config: &AppConfig) -> anyhow::Result<OtpManager> {
    let store: Arc<dyn OtpStore> = match config.otp_store {
        OtpStoreKind::Memory => Arc::new(InMemoryOtpStore::new()),
        OtpStoreKind::Redis => Arc::new(RedisOtpStore::new(get_redis_client(config)?)),
    };
    tracing::info!(store = ?config.otp_store, "OTP store ready");

    if config.stage == Stage::Prod && config.email_should_mock {
        tracing::warn!("email is mocked in prod, OTP codes will not be delivered");
    }

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let transport: Arc<dyn EmailTransport> = Arc::new(EmailClient::new(
        &sdk_config,
        config.email_sender.clone(),
        config.email_should_mock,
    ));

    Ok(OtpManager::new(store, transport, Arc::new(SystemClock)))
}
