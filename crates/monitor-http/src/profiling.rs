//! Process-wide profiling switches and the `/debug/pprof/*` route tree.
//!
//! Sampling itself is done by a [`Profiler`] implementation supplied by the host.
//! The default [`NoopProfiler`] answers every capture with 501.
use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    config::PPROF_PREFIX,
    error::{HttpError, HttpResult},
};

static BLOCK_PROFILE_RATE: AtomicU32 = AtomicU32::new(0);
static MUTEX_PROFILE_FRACTION: AtomicU32 = AtomicU32::new(0);

/// Default capture length of `/debug/pprof/profile`.
pub const DEFAULT_PROFILE_SECONDS: u64 = 30;
/// Default capture length of `/debug/pprof/trace`.
pub const DEFAULT_TRACE_SECONDS: u64 = 1;

/// Sample every blocking event and every mutex contention event from now on.
///
/// Idempotent. There is no way to switch sampling off again.
pub fn enable() {
    let was = BLOCK_PROFILE_RATE.swap(1, Ordering::SeqCst);
    MUTEX_PROFILE_FRACTION.store(1, Ordering::SeqCst);
    if was == 0 {
        info!("block and mutex profiling enabled");
    }
}

/// Current block-event sampling rate, `0` when off.
pub fn block_profile_rate() -> u32 {
    BLOCK_PROFILE_RATE.load(Ordering::SeqCst)
}

/// Current mutex-contention sampling fraction, `0` when off.
pub fn mutex_profile_fraction() -> u32 {
    MUTEX_PROFILE_FRACTION.load(Ordering::SeqCst)
}

/// Profile capture backend.
#[async_trait]
pub trait Profiler: Send + Sync + 'static {
    /// Capture a CPU profile for `duration`.
    async fn cpu_profile(&self, duration: Duration) -> HttpResult<Vec<u8>>;

    /// Capture an execution trace for `duration`.
    async fn trace(&self, duration: Duration) -> HttpResult<Vec<u8>>;

    /// Resolve program counters to symbol names; `None` for unknown addresses.
    fn symbols(&self, addrs: &[u64]) -> HttpResult<Vec<Option<String>>>;

    /// Whether [`Profiler::symbols`] can resolve anything at all.
    fn has_symbols(&self) -> bool {
        false
    }
}

/// Profiler that supports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProfiler;

#[async_trait]
impl Profiler for NoopProfiler {
    async fn cpu_profile(&self, _: Duration) -> HttpResult<Vec<u8>> {
        Err(HttpError::ProfilingUnsupported("cpu profile".into()))
    }

    async fn trace(&self, _: Duration) -> HttpResult<Vec<u8>> {
        Err(HttpError::ProfilingUnsupported("trace".into()))
    }

    fn symbols(&self, _: &[u64]) -> HttpResult<Vec<Option<String>>> {
        Err(HttpError::ProfilingUnsupported("symbol lookup".into()))
    }
}

/// Shared handle to a profiler.
pub type ProfilerHandle = Arc<dyn Profiler>;

/// Build the `/debug/pprof/*` router.
///
/// Routes:
/// - GET  /debug/pprof/          - index
/// - GET  /debug/pprof/cmdline   - process arguments, NUL separated
/// - GET  /debug/pprof/profile   - CPU profile, `?seconds=N` (default 30)
/// - GET  /debug/pprof/symbol    - `num_symbols: N`
/// - POST /debug/pprof/symbol    - resolve `+`-separated hex addresses
/// - GET  /debug/pprof/trace     - execution trace, `?seconds=N` (default 1)
pub fn pprof_router(profiler: ProfilerHandle) -> Router {
    Router::new()
        .route(PPROF_PREFIX, get(index))
        .route(&format!("{PPROF_PREFIX}/"), get(index))
        .route(&format!("{PPROF_PREFIX}/cmdline"), get(cmdline))
        .route(&format!("{PPROF_PREFIX}/profile"), get(profile))
        .route(
            &format!("{PPROF_PREFIX}/symbol"),
            get(symbol_count).post(symbol_lookup),
        )
        .route(&format!("{PPROF_PREFIX}/trace"), get(trace))
        .route(&format!("{PPROF_PREFIX}/{{name}}"), get(unknown))
        .with_state(profiler)
}

#[derive(Debug, Deserialize)]
struct CaptureQuery {
    seconds: Option<u64>,
}

impl CaptureQuery {
    fn duration(&self, default_secs: u64) -> Duration {
        match self.seconds {
            Some(s) if s > 0 => Duration::from_secs(s),
            _ => Duration::from_secs(default_secs),
        }
    }
}

fn octet_stream(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response()
}

async fn index() -> String {
    format!(
        "profiles:\n\
         \tcmdline\n\
         \tprofile?seconds={DEFAULT_PROFILE_SECONDS}\n\
         \tsymbol\n\
         \ttrace?seconds={DEFAULT_TRACE_SECONDS}\n\
         \n\
         block_profile_rate: {}\n\
         mutex_profile_fraction: {}\n",
        block_profile_rate(),
        mutex_profile_fraction(),
    )
}

async fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join("\0")
}

async fn profile(
    State(profiler): State<ProfilerHandle>,
    Query(q): Query<CaptureQuery>,
) -> Result<Response, HttpError> {
    let duration = q.duration(DEFAULT_PROFILE_SECONDS);
    debug!(?duration, "cpu profile requested");
    Ok(octet_stream(profiler.cpu_profile(duration).await?))
}

async fn trace(
    State(profiler): State<ProfilerHandle>,
    Query(q): Query<CaptureQuery>,
) -> Result<Response, HttpError> {
    let duration = q.duration(DEFAULT_TRACE_SECONDS);
    debug!(?duration, "trace requested");
    Ok(octet_stream(profiler.trace(duration).await?))
}

async fn symbol_count(State(profiler): State<ProfilerHandle>) -> String {
    format!("num_symbols: {}\n", u8::from(profiler.has_symbols()))
}

async fn symbol_lookup(
    State(profiler): State<ProfilerHandle>,
    body: String,
) -> Result<String, HttpError> {
    let addrs = parse_addrs(&body)?;
    let names = profiler.symbols(&addrs)?;

    let mut out = String::new();
    for (addr, name) in addrs.iter().zip(names) {
        if let Some(name) = name {
            out.push_str(&format!("{addr:#x} {name}\n"));
        }
    }
    Ok(out)
}

async fn unknown(Path(name): Path<String>) -> HttpError {
    HttpError::NotFound(format!("unknown profile: {name}"))
}

/// Parse `0x1234+0xabcd` style address lists.
fn parse_addrs(body: &str) -> HttpResult<Vec<u64>> {
    body.trim()
        .split('+')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let hex = s.trim_start_matches("0x").trim_start_matches("0X");
            u64::from_str_radix(hex, 16)
                .map_err(|_| HttpError::BadRequest(format!("invalid address: {s}")))
        })
        .collect()
}
