//! Per-IP rate limiting for the credential endpoints
//!
//! Sign-in and sign-up are the only endpoints an anonymous client can hammer
//! with guesses, so they get a keyed `governor` limiter. Requests without
//! connection info (in-process tests) are not limited.

use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use tracing::{debug, warn};

use crate::config::RateLimitSettings;
use crate::utils::ErrorResponse;

#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl RateLimitState {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let per_minute = NonZeroU32::new(settings.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(settings.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// `Err(wait)` when the address has used up its quota
    fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }

    /// Forget addresses whose buckets have fully refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

/// Rate limiting middleware for the credential routes
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return next.run(request).await;
    };

    match rate_limit.check(ip) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            warn!(%ip, path = %request.uri().path(), "Rate limit exceeded");
            RateLimitExceeded {
                retry_after_secs: wait.as_secs().max(1),
            }
            .into_response()
        }
    }
}

pub struct RateLimitExceeded {
    retry_after_secs: u64,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, self.retry_after_secs.to_string())],
            Json(ErrorResponse::new(
                "rate_limited",
                "Too many attempts. Please wait and try again.",
            )),
        )
            .into_response()
    }
}

/// Periodically drop idle per-IP state
pub fn spawn_rate_limit_cleanup(state: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            state.prune();
            debug!("Rate limiter state pruned");
        }
    });
}
