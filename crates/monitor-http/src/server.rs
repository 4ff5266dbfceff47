use std::{net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use prometheus::Registry;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::{ConfigOption, HttpConfig},
    error::{HttpError, HttpResult},
    exporter::{Exporter, scrape},
    profiling::{self, NoopProfiler, ProfilerHandle, pprof_router},
};

/// Router serving only the scrape endpoint, for mounting into an existing application.
pub fn metrics_router(registry: Registry, cfg: &HttpConfig) -> HttpResult<Router> {
    cfg.validate()?;
    Ok(Router::new()
        .route(&cfg.path, get(scrape))
        .with_state(Exporter::new(registry, cfg.continue_on_error)))
}

/// Scrape endpoint plus, when `cfg.profiling` is set, the profiling tree.
pub fn router(registry: Registry, cfg: &HttpConfig, profiler: ProfilerHandle) -> HttpResult<Router> {
    let app = metrics_router(registry, cfg)?;
    if cfg.profiling {
        Ok(app.merge(pprof_router(profiler)))
    } else {
        Ok(app)
    }
}

/// Running exposition server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<HttpResult<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ask the server to stop accepting connections and drain.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Wait for the server task to finish.
    pub async fn wait(self) -> HttpResult<()> {
        match self.task.await {
            Ok(res) => res,
            Err(e) => Err(HttpError::Io(std::io::Error::other(e))),
        }
    }

    /// [`ServerHandle::shutdown`] followed by [`ServerHandle::wait`].
    pub async fn stop(self) -> HttpResult<()> {
        self.shutdown();
        self.wait().await
    }
}

/// Serve `registry` with defaults overridden by `opts` and no profile capture backend.
///
/// See [`serve_with`].
pub async fn serve(
    registry: Registry,
    opts: impl IntoIterator<Item = ConfigOption>,
) -> HttpResult<ServerHandle> {
    serve_with(registry, HttpConfig::from_options(opts), Arc::new(NoopProfiler)).await
}

/// Bind the listener and spawn the server on the current tokio runtime.
///
/// Bind failures are returned here. Failures after that are logged and surface from [`ServerHandle::wait`].
/// With `cfg.profiling` the process-wide sampling switches are turned on before serving.
pub async fn serve_with(
    registry: Registry,
    cfg: HttpConfig,
    profiler: ProfilerHandle,
) -> HttpResult<ServerHandle> {
    let app = router(registry, &cfg, profiler)?;
    if cfg.profiling {
        profiling::enable();
    }

    let addr = SocketAddr::new(cfg.host, cfg.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| HttpError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, path = %cfg.path, profiling = cfg.profiling, "metrics server listening");

    let token = CancellationToken::new();
    let shutdown = token.clone().cancelled_owned();
    let task = tokio::spawn(async move {
        let res = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        match res {
            Ok(()) => {
                info!(addr = %local_addr, "metrics server stopped");
                Ok(())
            }
            Err(e) => {
                error!(addr = %local_addr, error = %e, "metrics server failed");
                Err(HttpError::Io(e))
            }
        }
    });

    Ok(ServerHandle {
        local_addr,
        token,
        task,
    })
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use monitor_core::{MetricDesc, Monitor};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{with_continue_on_error, with_host, with_path, with_port, with_profiling};

    async fn get_status(app: Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn serves_metrics_on_configured_path() {
        let monitor = Monitor::new();
        monitor
            .add_metric(MetricDesc::counter("requests_total").namespace("api"))
            .unwrap()
            .inc(&[])
            .unwrap();

        let cfg = HttpConfig::from_options([with_path("/custom")]);
        let app = router(monitor.registry().clone(), &cfg, Arc::new(NoopProfiler)).unwrap();

        let (status, body) = get_status(app.clone(), "/custom").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("api_requests_total 1"), "{body}");

        let (status, _) = get_status(app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scrape_sees_updates_made_after_router_is_built() {
        let monitor = Monitor::new();
        let cfg = HttpConfig::default();
        let app = metrics_router(monitor.registry().clone(), &cfg).unwrap();

        let m = monitor.add_metric(MetricDesc::gauge("queue_depth")).unwrap();
        m.set_gauge_value(&[], 5.0).unwrap();

        let (_, body) = get_status(app, "/metrics").await;
        assert!(body.contains("queue_depth 5"), "{body}");
    }

    #[tokio::test]
    async fn pprof_tree_follows_profiling_flag() {
        let registry = Registry::new();

        let on = router(registry.clone(), &HttpConfig::default(), Arc::new(NoopProfiler)).unwrap();
        let (status, _) = get_status(on, "/debug/pprof/").await;
        assert_eq!(status, StatusCode::OK);

        let cfg = HttpConfig::from_options([with_profiling(false)]);
        let off = router(registry, &cfg, Arc::new(NoopProfiler)).unwrap();
        let (status, _) = get_status(off, "/debug/pprof/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_path_is_rejected_before_routing() {
        let cfg = HttpConfig::from_options([with_path("/debug/pprof/metrics")]);
        assert!(matches!(
            metrics_router(Registry::new(), &cfg),
            Err(HttpError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn serve_binds_answers_and_shuts_down() {
        let monitor = Monitor::new();
        monitor
            .add_metric(MetricDesc::gauge("up"))
            .unwrap()
            .set_gauge_value(&[], 1.0)
            .unwrap();

        let handle = serve(
            monitor.registry().clone(),
            [
                with_host(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                with_port(0),
                with_continue_on_error(true),
            ],
        )
        .await
        .unwrap();
        assert_ne!(handle.local_addr().port(), 0);

        let mut stream = tokio::net::TcpStream::connect(handle.local_addr()).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut resp = String::new();
        stream.read_to_string(&mut resp).await.unwrap();
        assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
        assert!(resp.contains("up 1"), "{resp}");

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = serve(
            Registry::new(),
            [with_host(IpAddr::V4(Ipv4Addr::LOCALHOST)), with_port(0)],
        )
        .await
        .unwrap();
        let port = first.local_addr().port();

        let second = serve(
            Registry::new(),
            [with_host(IpAddr::V4(Ipv4Addr::LOCALHOST)), with_port(port)],
        )
        .await;
        assert!(matches!(second, Err(HttpError::Bind { .. })));

        first.stop().await.unwrap();
    }
}
