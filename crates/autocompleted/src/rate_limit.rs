//! Per-client request rate limiting
//!
//! One token bucket per peer IP.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::server::AppState;

/// Keyed token buckets, one per client address
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl ClientRateLimiter {
    /// Allow `per_second` sustained requests with bursts up to `burst`
    pub fn new(per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::keyed(Quota::per_second(per_second).allow_burst(burst)),
        }
    }

    /// Take one request from `client`'s bucket
    ///
    /// # Returns
    /// * `bool` - False if the client is over its rate
    pub fn check(&self, client: IpAddr) -> bool {
        self.limiter.check_key(&client).is_ok()
    }

    /// Forget clients whose buckets have refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.limiter.len()
    }
}

/// Peer address of the request, unspecified when not served over TCP
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Reject requests from clients over their rate
pub async fn limit_per_client(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_ip(&request);

    if !state.limiter.check(client) {
        warn!("Rate limit exceeded for {}", client);
        return Err(ApiError::TooManyRequests);
    }

    Ok(next.run(request).await)
}
