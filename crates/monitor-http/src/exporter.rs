//! Scrape endpoint: encodes a [`Registry`] in the Prometheus text format.
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, Registry, TextEncoder, proto::MetricFamily};
use tracing::{trace, warn};

use crate::error::{HttpError, HttpResult};

/// Shared state of the scrape handler.
#[derive(Clone)]
pub struct Exporter {
    registry: Registry,
    continue_on_error: bool,
}

impl Exporter {
    pub fn new(registry: Registry, continue_on_error: bool) -> Self {
        Self {
            registry,
            continue_on_error,
        }
    }

    /// Gather and encode everything currently registered.
    pub fn render(&self) -> HttpResult<Vec<u8>> {
        encode_families(&self.registry.gather(), self.continue_on_error)
    }
}

/// Encode `families` one by one.
///
/// With `continue_on_error` a family that fails to encode is logged and left out of the output,
/// otherwise the first failure is returned.
pub fn encode_families(families: &[MetricFamily], continue_on_error: bool) -> HttpResult<Vec<u8>> {
    let encoder = TextEncoder::new();
    let mut out = Vec::new();

    for family in families {
        let mut chunk = Vec::new();
        match encoder.encode(std::slice::from_ref(family), &mut chunk) {
            Ok(()) => out.extend_from_slice(&chunk),
            Err(e) if continue_on_error => {
                warn!(family = family.name(), error = %e, "skipping metric family");
            }
            Err(e) => return Err(HttpError::Encode(e)),
        }
    }
    Ok(out)
}

/// `GET <path>`
pub(crate) async fn scrape(State(exporter): State<Exporter>) -> Result<Response, HttpError> {
    let body = exporter.render()?;
    trace!(bytes = body.len(), "scrape served");

    let content_type = TextEncoder::new().format_type().to_string();
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
