use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Wraps every request in an `http_request` span carrying a trace id.
///
/// The id is taken from an incoming `x-trace-id` header when it is a valid
/// UUID, otherwise generated, and echoed on the response. Bodies are not
/// logged: they carry user SQL and chat text.
pub async fn trace_middleware(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("→ request started");
        let header = HeaderValue::from_str(&trace_id.to_string()).ok();
        if let Some(value) = &header {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let mut response = next.run(req).await;

        if let Some(value) = header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}
