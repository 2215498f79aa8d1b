//! Prometheus exporter endpoint.

use actix_web::{get, App, HttpServer, Responder};
use anyhow::Result;
use prometheus::{Encoder, TextEncoder};

/// Serves `/metrics` on the configured port.
pub async fn serve_metrics(port: u16) -> Result<()> {
    HttpServer::new(|| App::new().service(index).service(metrics))
        .bind(("0.0.0.0", port))
        .map_err(|e| anyhow::anyhow!(e))?
        .run()
        .await?;
    Ok(())
}

#[get("/")]
async fn index() -> impl Responder {
    "trustless-gateway metrics: visit /metrics"
}

#[get("/metrics")]
async fn metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(target: "metrics", "failed to encode prometheus metrics: {e}");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
