use tracing_subscriber::{Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    format::LoggerFormat,
    timer::UtcRfc3339,
};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the output layer for `cfg.format`, filtered by `cfg.level`, as the global subscriber.
pub(crate) fn install(cfg: &LoggerConfig) -> LoggerResult<()> {
    let layer = output_layer(cfg)?.with_filter(cfg.level.to_env_filter());

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

fn output_layer(cfg: &LoggerConfig) -> LoggerResult<OutputLayer> {
    let layer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.should_use_color())
            .with_target(cfg.with_targets)
            .with_timer(UtcRfc3339)
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(UtcRfc3339)
            .boxed(),
        LoggerFormat::Journald => journald()?,
    };
    Ok(layer)
}

#[cfg(target_os = "linux")]
fn journald() -> LoggerResult<OutputLayer> {
    tracing_journald::layer()
        .map(|layer| layer.boxed())
        .map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))
}

#[cfg(not(target_os = "linux"))]
fn journald() -> LoggerResult<OutputLayer> {
    Err(LoggerError::JournaldNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_json_layers_build_without_installing() {
        for format in [LoggerFormat::Text, LoggerFormat::Json] {
            let cfg = LoggerConfig {
                format,
                level: "monitor_core=debug,info".parse().unwrap(),
                ..Default::default()
            };
            assert!(output_layer(&cfg).is_ok(), "{format} layer");
        }
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn journald_is_linux_only() {
        let cfg = LoggerConfig {
            format: LoggerFormat::Journald,
            ..Default::default()
        };
        assert!(matches!(output_layer(&cfg), Err(LoggerError::JournaldNotSupported)));
    }
}
