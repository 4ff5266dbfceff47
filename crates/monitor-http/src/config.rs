use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::error::{HttpError, HttpResult};

/// Default exposition path.
pub const DEFAULT_PATH: &str = "/metrics";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 9100;
/// Prefix of the profiling route tree.
pub const PPROF_PREFIX: &str = "/debug/pprof";

/// HTTP exposition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// URL path the scrape endpoint is mounted on.
    pub path: String,
    /// Listen address.
    pub host: IpAddr,
    /// Listen port, `0` picks a free one.
    pub port: u16,
    /// Mount `/debug/pprof/*` and turn on the process-wide sampling switches.
    pub profiling: bool,
    /// Serve the families that encode fine when one of them fails, instead of answering 500.
    pub continue_on_error: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            profiling: true,
            continue_on_error: true,
        }
    }
}

/// Single configuration override, applied in order.
pub type ConfigOption = Box<dyn FnOnce(&mut HttpConfig) + Send>;

impl HttpConfig {
    /// Defaults with `opts` applied on top.
    pub fn from_options(opts: impl IntoIterator<Item = ConfigOption>) -> Self {
        let mut cfg = Self::default();
        cfg.apply(opts);
        cfg
    }

    /// Apply options in order; later options override earlier ones.
    pub fn apply(&mut self, opts: impl IntoIterator<Item = ConfigOption>) {
        for opt in opts {
            opt(self);
        }
    }

    /// Check that the exposition path can be mounted next to the profiling tree.
    pub fn validate(&self) -> HttpResult<()> {
        let p = &self.path;
        if !p.starts_with('/') {
            return Err(HttpError::InvalidPath(format!("{p}: must start with '/'")));
        }
        if p.contains(['{', '}', '*']) {
            return Err(HttpError::InvalidPath(format!(
                "{p}: wildcards and captures are not allowed"
            )));
        }
        if p.starts_with(PPROF_PREFIX) {
            return Err(HttpError::InvalidPath(format!(
                "{p}: reserved for profiling"
            )));
        }
        Ok(())
    }
}

pub fn with_path(path: impl Into<String>) -> ConfigOption {
    let path = path.into();
    Box::new(move |c| c.path = path)
}

pub fn with_host(host: IpAddr) -> ConfigOption {
    Box::new(move |c| c.host = host)
}

pub fn with_port(port: u16) -> ConfigOption {
    Box::new(move |c| c.port = port)
}

pub fn with_profiling(enabled: bool) -> ConfigOption {
    Box::new(move |c| c.profiling = enabled)
}

pub fn with_continue_on_error(enabled: bool) -> ConfigOption {
    Box::new(move |c| c.continue_on_error = enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = HttpConfig::default();
        assert_eq!(cfg.path, "/metrics");
        assert_eq!(cfg.port, 9100);
        assert!(cfg.profiling);
        assert!(cfg.continue_on_error);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn later_options_win() {
        let cfg = HttpConfig::from_options([
            with_path("/a"),
            with_port(1),
            with_path("/b"),
            with_profiling(false),
        ]);
        assert_eq!(cfg.path, "/b");
        assert_eq!(cfg.port, 1);
        assert!(!cfg.profiling);
        assert!(cfg.continue_on_error);
    }

    #[test]
    fn no_options_keeps_defaults() {
        assert_eq!(HttpConfig::from_options(Vec::<ConfigOption>::new()), HttpConfig::default());
    }

    #[test]
    fn rejects_unmountable_paths() {
        for bad in ["metrics", "/metrics/{id}", "/debug/pprof/metrics", "/m/*rest"] {
            let cfg = HttpConfig::from_options([with_path(bad)]);
            assert!(
                matches!(cfg.validate(), Err(HttpError::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: HttpConfig = serde_json::from_str(r#"{"port": 9200, "host": "127.0.0.1"}"#).unwrap();
        assert_eq!(cfg.port, 9200);
        assert_eq!(cfg.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cfg.path, DEFAULT_PATH);
    }
}
