//! Logging setup shared by the monitor binaries.
//!
//! ```rust
//! use monitor_observe::{LoggerConfig, init_logger};
//!
//! init_logger(&LoggerConfig::default()).expect("logger");
//! tracing::info!("logger initialized");
//! ```
mod config;
mod error;
mod format;
mod init;
mod level;
mod timer;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;
pub use timer::UtcRfc3339;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a global subscriber is already set.
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    init::install(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        let cfg = LoggerConfig {
            use_color: false,
            ..Default::default()
        };
        // another test may have won the race; either way the second call must fail
        let _ = init_logger(&cfg);
        assert!(matches!(init_logger(&cfg), Err(LoggerError::AlreadyInitialized)));
    }
}
