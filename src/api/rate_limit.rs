//! Per-caller limits on webhook deliveries
//!
//! Callers are identified by the first `X-Forwarded-For` hop when the
//! gateway sits behind a proxy, otherwise by the peer address.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use super::ApiState;

/// Caller key used when neither a forwarded address nor a peer is known
const UNKNOWN_CALLER: &str = "unknown";

/// Webhook limiter keyed by caller
pub type SharedLimiter = Arc<DefaultKeyedRateLimiter<String>>;

/// Create a limiter allowing `deliveries_per_minute` per caller
#[must_use]
pub fn create_limiter(deliveries_per_minute: u32) -> SharedLimiter {
    let per_minute = NonZeroU32::new(deliveries_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}

/// Forget callers whose budget is fully replenished
pub fn forget_idle_callers(limiter: &SharedLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
}

/// Identify the caller of `req`
fn caller_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(addr) = forwarded {
        return addr.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| UNKNOWN_CALLER.to_string(), |info| info.0.ip().to_string())
}

/// Reject deliveries from callers over budget (only when a limiter is configured)
pub async fn limit_webhook_callers(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ref limiter) = state.webhook_limiter {
        let caller = caller_key(&req);
        if limiter.check_key(&caller).is_err() {
            tracing::warn!(%caller, "webhook caller over its delivery budget");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }
    Ok(next.run(req).await)
}
