use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives when `RUST_LOG` is unset.
///
/// axum logs rejections from built-in extractors with the `axum::rejection`
/// target, at `TRACE` level, so that target is opened up as well.
fn default_filter() -> EnvFilter {
    format!(
        "{}=info,tower_http=info,axum::rejection=trace",
        env!("CARGO_CRATE_NAME")
    )
    .into()
}

/// Register telemetry as global default to process span data.
///
/// Output goes to `sink`; tests pass `std::io::sink` to stay quiet.
/// It should only be called once
pub fn register_telemetry<Sink>(sink: Sink)
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter()))
        .with(tracing_subscriber::fmt::layer().with_writer(sink))
        .init();
}
