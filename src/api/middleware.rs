//! Request authentication and per-client rate limiting.
//!
//! Both stay off unless `STUDY_PLANNER_API_KEY` is set, which marks a remote
//! deployment rather than a single student running the planner locally.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::{HashMap, VecDeque},
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Requests per client per minute when `STUDY_PLANNER_RATE_LIMIT` is unset.
pub const DEFAULT_RATE_LIMIT: u32 = 100;
/// Clients tracked at once before idle or stale ones are dropped.
pub const DEFAULT_MAX_TRACKED_CLIENTS: usize = 10_000;

const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Bearer token every API request must carry.
    pub api_key: Option<String>,
    /// Allowed CORS origins. Any origin is allowed when unset.
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// - `STUDY_PLANNER_API_KEY`: enables auth and rate limiting
    /// - `STUDY_PLANNER_CORS_ORIGINS`: comma-separated origin list
    /// - `STUDY_PLANNER_RATE_LIMIT`: requests per client per minute
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = var("STUDY_PLANNER_API_KEY").filter(|k| !k.is_empty());

        let cors_origins = var("STUDY_PLANNER_CORS_ORIGINS").map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect()
        });

        let limit = var("STUDY_PLANNER_RATE_LIMIT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);
        let rate_limiter = api_key
            .is_some()
            .then(|| RateLimiter::new(limit, RATE_WINDOW));

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// No auth, no rate limit, permissive CORS.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::disabled()
        }
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
            ..Self::disabled()
        }
    }

    pub fn with_rate_limit(max_requests: u32) -> Self {
        Self {
            rate_limiter: Some(RateLimiter::new(max_requests, RATE_WINDOW)),
            ..Self::disabled()
        }
    }
}

/// Sliding-window request counter keyed by client address.
///
/// The number of tracked clients is capped. When a new client arrives at the
/// cap, clients with no requests left in the window are dropped first, then
/// the one seen least recently.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    max_clients: usize,
    clients: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_max_clients(max_requests, window, DEFAULT_MAX_TRACKED_CLIENTS)
    }

    pub fn with_max_clients(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            max_clients: max_clients.max(1),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a request from `ip`. Returns false if it is over the limit.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");

        if !clients.contains_key(&ip) && clients.len() >= self.max_clients {
            self.make_room(&mut clients, now);
        }

        let hits = clients.entry(ip).or_default();
        while hits
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() < self.max_requests {
            hits.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drop clients with no requests inside the window.
    pub fn cleanup(&self) {
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");
        self.prune_idle(&mut clients, Instant::now());
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().expect("rate limiter lock poisoned").len()
    }

    fn prune_idle(&self, clients: &mut HashMap<IpAddr, VecDeque<Instant>>, now: Instant) {
        clients.retain(|_, hits| {
            hits.back()
                .is_some_and(|&t| now.duration_since(t) < self.window)
        });
    }

    fn make_room(&self, clients: &mut HashMap<IpAddr, VecDeque<Instant>>, now: Instant) {
        self.prune_idle(clients, now);
        if clients.len() < self.max_clients {
            return;
        }

        let stalest = clients
            .iter()
            .min_by_key(|(_, hits)| hits.back().copied())
            .map(|(ip, _)| *ip);
        if let Some(ip) = stalest {
            tracing::debug!("Rate limiter full, forgetting {}", ip);
            clients.remove(&ip);
        }
    }
}

pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let rejection = match bearer_token(&request) {
        Some(token) if token == expected => None,
        Some(_) => Some("invalid API key"),
        None => Some("missing bearer token"),
    };

    match rejection {
        None => Ok(next.run(request).await),
        Some(reason) => {
            tracing::warn!("Rejected request: {}", reason);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request);

    if rate_limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then localhost.
fn client_ip(request: &Request<Body>) -> IpAddr {
    header(request, "X-Forwarded-For")
        .and_then(|value| value.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
        .or_else(|| header(request, "X-Real-IP").and_then(|ip| ip.trim().parse().ok()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn header<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request.headers().get(name)?.to_str().ok()
}
