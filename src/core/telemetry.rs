use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Initializes the subscriber from settings. The configured level applies
/// to the engine's own code; sqlx statement logging and tower-http request
/// chatter are capped unless RUST_LOG overrides them.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(settings)));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if settings.telemetry().json {
        builder
            .json()
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    } else {
        builder
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    }

    tracing::debug!(
        level = %settings.telemetry().log_level,
        json = settings.telemetry().json,
        "Tracing initialized"
    );
    Ok(())
}

fn default_directives(settings: &Settings) -> String {
    format!("{},sqlx::query=warn,tower_http=info", settings.telemetry().log_level)
}
