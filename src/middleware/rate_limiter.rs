//! Per-client rate limiting
//!
//! Token-bucket limiter keyed by client IP. Requests over the cap are
//! rejected with 429 before they reach any handler; the nonce, login, and
//! refresh endpoints all sit behind it.

use axum::{
    body::Body,
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::RwLock;

use crate::error::ApiError;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, refill_per_second: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_second).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared rate limiter state
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
    refill_per_second: f64,
    capacity: f64,
}

impl RateLimiter {
    /// Allow `requests_per_second` sustained, with a burst of twice that
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            refill_per_second: f64::from(requests_per_second),
            capacity: f64::from(requests_per_second) * 2.0,
        }
    }

    /// Check whether a request from `key` is allowed right now
    pub async fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(self.capacity));
        bucket.try_consume(self.refill_per_second, self.capacity)
    }

    /// Drop buckets idle longer than `max_age`
    pub async fn cleanup(&self, max_age: std::time::Duration) {
        let now = Instant::now();
        self.buckets
            .write()
            .await
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < max_age);
    }
}

/// Create a rate limiting middleware layer
pub fn rate_limit_layer(
    limiter: RateLimiter,
) -> impl Fn(
    Request<Body>,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone
       + Send {
    move |request: Request<Body>, next: Next| {
        let limiter = limiter.clone();
        Box::pin(async move {
            let client_key = client_ip(&request);

            if !limiter.check(&client_key).await {
                tracing::warn!(client = %client_key, "Rate limit exceeded");
                let mut response = ApiError::TooManyRequests.into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, "1".parse().expect("static header"));
                return response;
            }

            next.run(request).await
        })
    }
}

fn client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
