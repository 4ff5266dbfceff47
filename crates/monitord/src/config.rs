use std::{net::IpAddr, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use monitor_http::{
    ConfigOption, HttpConfig, with_continue_on_error, with_host, with_path, with_port,
    with_profiling,
};
use monitor_observe::LoggerConfig;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "MONITORD_CONFIG";

/// Per-field overrides of the `http` section, applied after the file in this order.
pub const HTTP_PATH_ENV: &str = "MONITORD_HTTP_PATH";
pub const HTTP_HOST_ENV: &str = "MONITORD_HTTP_HOST";
pub const HTTP_PORT_ENV: &str = "MONITORD_HTTP_PORT";
pub const HTTP_PROFILING_ENV: &str = "MONITORD_HTTP_PROFILING";
pub const HTTP_CONTINUE_ON_ERROR_ENV: &str = "MONITORD_HTTP_CONTINUE_ON_ERROR";

/// Daemon configuration; every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub logger: LoggerConfig,
    pub http: HttpConfig,
}

impl DaemonConfig {
    /// Read the file named by [`CONFIG_ENV`] (defaults when unset), then apply the `MONITORD_HTTP_*` overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Same as [`DaemonConfig::from_env`] with an explicit variable lookup.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.http.apply(http_overrides(&lookup)?);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Option functions for every `MONITORD_HTTP_*` variable that is set.
pub fn http_overrides(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Vec<ConfigOption>> {
    let mut opts = Vec::new();

    if let Some(path) = lookup(HTTP_PATH_ENV) {
        opts.push(with_path(path));
    }
    if let Some(host) = lookup(HTTP_HOST_ENV) {
        let host: IpAddr = host
            .parse()
            .with_context(|| format!("{HTTP_HOST_ENV}={host}"))?;
        opts.push(with_host(host));
    }
    if let Some(port) = lookup(HTTP_PORT_ENV) {
        let port: u16 = port
            .parse()
            .with_context(|| format!("{HTTP_PORT_ENV}={port}"))?;
        opts.push(with_port(port));
    }
    if let Some(flag) = lookup(HTTP_PROFILING_ENV) {
        opts.push(with_profiling(parse_flag(HTTP_PROFILING_ENV, &flag)?));
    }
    if let Some(flag) = lookup(HTTP_CONTINUE_ON_ERROR_ENV) {
        opts.push(with_continue_on_error(parse_flag(
            HTTP_CONTINUE_ON_ERROR_ENV,
            &flag,
        )?));
    }
    Ok(opts)
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key}={raw}: expected a boolean"),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn empty_object_is_default() {
        let cfg: DaemonConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, DaemonConfig::default());
    }

    #[test]
    fn sections_are_independent() {
        let cfg: DaemonConfig =
            serde_json::from_str(r#"{"http": {"port": 9300, "profiling": false}}"#).unwrap();
        assert_eq!(cfg.http.port, 9300);
        assert!(!cfg.http.profiling);
        assert_eq!(cfg.http.path, "/metrics");
        assert_eq!(cfg.logger, LoggerConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = DaemonConfig::from_file(Path::new("/nonexistent/monitord.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn no_variables_is_default() {
        assert_eq!(DaemonConfig::load(vars(&[])).unwrap(), DaemonConfig::default());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cfg = DaemonConfig::load(vars(&[
            (HTTP_PATH_ENV, "/stats"),
            (HTTP_HOST_ENV, "127.0.0.1"),
            (HTTP_PORT_ENV, "9400"),
            (HTTP_PROFILING_ENV, "off"),
        ]))
        .unwrap();

        assert_eq!(cfg.http.path, "/stats");
        assert_eq!(cfg.http.host.to_string(), "127.0.0.1");
        assert_eq!(cfg.http.port, 9400);
        assert!(!cfg.http.profiling);
        assert!(cfg.http.continue_on_error);
    }

    #[test]
    fn overrides_win_over_the_file() {
        let path = std::env::temp_dir().join(format!("monitord-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{"http": {"port": 9300, "path": "/from-file", "continue_on_error": false}}"#)
            .unwrap();

        let path_str = path.to_string_lossy().into_owned();
        let cfg = DaemonConfig::load(vars(&[
            (CONFIG_ENV, path_str.as_str()),
            (HTTP_PORT_ENV, "9500"),
        ]))
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.http.port, 9500);
        assert_eq!(cfg.http.path, "/from-file");
        assert!(!cfg.http.continue_on_error);
    }

    #[test]
    fn malformed_override_is_an_error() {
        let err = DaemonConfig::load(vars(&[(HTTP_PORT_ENV, "ninety")])).unwrap_err();
        assert!(err.to_string().contains(HTTP_PORT_ENV));

        let err = DaemonConfig::load(vars(&[(HTTP_PROFILING_ENV, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn only_set_variables_produce_options() {
        assert!(http_overrides(vars(&[])).unwrap().is_empty());
        assert_eq!(
            http_overrides(vars(&[(HTTP_CONTINUE_ON_ERROR_ENV, "1")]))
                .unwrap()
                .len(),
            1
        );
    }
}
