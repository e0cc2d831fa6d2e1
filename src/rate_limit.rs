//! Per-route, per-client sliding window rate limiting.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::{ContentType, HeaderMap, RETRY_AFTER};
use actix_web::middleware::Next;
use actix_web::{HttpResponse, ResponseError, web};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::utils::{ResponseErrorMessage, e500};

const REJECTION_MESSAGE: &str =
    "Too many requests from this IP, please try again after 15 minutes.";
// Idle clients are swept once the map grows past this many keys, at most
// once per window.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, PartialEq)]
pub enum RateLimitDecision {
    Allowed { remaining: usize },
    Rejected { retry_after: Duration },
}

/// Keeps the timestamp of every accepted request inside the window.
/// A request is accepted while fewer than `max_requests` timestamps are
/// younger than `window`; rejected requests are not recorded.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
    sweep_threshold: usize,
    last_sweep: Mutex<Instant>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_sweep_threshold(max_requests, window, SWEEP_THRESHOLD)
    }

    fn with_sweep_threshold(
        max_requests: usize,
        window: Duration,
        sweep_threshold: usize,
    ) -> Self {
        Self {
            max_requests,
            window,
            hits: DashMap::new(),
            sweep_threshold,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        if self.hits.len() > self.sweep_threshold {
            self.maybe_sweep(now);
        }

        let mut hits = self.hits.entry(key.to_string()).or_default();
        self.prune(&mut hits, now);

        if hits.len() >= self.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return RateLimitDecision::Rejected { retry_after };
        }

        hits.push_back(now);
        RateLimitDecision::Allowed {
            remaining: self.max_requests - hits.len(),
        }
    }

    // Skipped when another request is already sweeping.
    fn maybe_sweep(&self, now: Instant) {
        if let Ok(mut last_sweep) = self.last_sweep.try_lock() {
            if now.duration_since(*last_sweep) >= self.window {
                self.purge_expired_at(now);
                *last_sweep = now;
            }
        }
    }

    /// Drops clients whose whole history has left the window.
    pub fn purge_expired(&self) {
        self.purge_expired_at(Instant::now());
    }

    fn purge_expired_at(&self, now: Instant) {
        self.hits.retain(|_, hits| {
            self.prune(hits, now);
            !hits.is_empty()
        });
    }

    fn prune(&self, hits: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = hits.front() {
            if now.duration_since(*oldest) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }
}

/// The limiters of the rate-limited routes, shared across workers.
pub struct RouteRateLimiters {
    pub subscribe: SlidingWindowLimiter,
    pub contact: SlidingWindowLimiter,
}

/// First hop of `X-Forwarded-For` when present, else the peer address.
pub fn client_key(req: &ServiceRequest) -> String {
    first_forwarded_address(req.headers())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn first_forwarded_address(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(String::from)
}

#[derive(Debug, thiserror::Error)]
#[error("{}", REJECTION_MESSAGE)]
pub struct TooManyRequests {
    retry_after: Duration,
}

impl ResponseError for TooManyRequests {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        // Round up so clients never retry a moment too early.
        let seconds = self.retry_after.as_secs() + u64::from(self.retry_after.subsec_nanos() > 0);

        HttpResponse::build(self.status_code())
            .insert_header((RETRY_AFTER, seconds.to_string()))
            .content_type(ContentType::json())
            .json(ResponseErrorMessage {
                error: REJECTION_MESSAGE.to_string(),
            })
    }
}

pub async fn limit_subscriptions(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let limiters = route_limiters(&req)?;
    enforce(&limiters.subscribe, req, next).await
}

pub async fn limit_contact_messages(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let limiters = route_limiters(&req)?;
    enforce(&limiters.contact, req, next).await
}

fn route_limiters(req: &ServiceRequest) -> Result<web::Data<RouteRateLimiters>, actix_web::Error> {
    req.app_data::<web::Data<RouteRateLimiters>>()
        .cloned()
        .ok_or_else(|| e500("Rate limiters are not registered."))
}

async fn enforce<B: MessageBody>(
    limiter: &SlidingWindowLimiter,
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let key = client_key(&req);

    match limiter.check(&key) {
        RateLimitDecision::Allowed { .. } => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_left_body),
        RateLimitDecision::Rejected { retry_after } => {
            tracing::warn!(client = %key, path = %req.path(), "Rate limit exceeded");
            Ok(req
                .error_response(TooManyRequests { retry_after })
                .map_into_right_body())
        }
    }
}
