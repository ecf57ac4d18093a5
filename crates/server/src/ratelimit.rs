use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::errors::ApiError;
use crate::routes::AppState;

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed-window request counter keyed by client IP. Every request consumes
/// one unit of quota regardless of route; once a client exceeds
/// `max_requests` inside the window it is rejected until the window rolls
/// over. Rejected requests do not extend the window.
pub struct FixedWindowLimiter {
    windows: DashMap<IpAddr, WindowEntry>,
    max_requests: u32,
    window: Duration,
    last_sweep: Mutex<Instant>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(cfg: &configs::RateLimitConfig) -> Self {
        Self::new(cfg.max_requests, Duration::from_secs(cfg.window_secs))
    }

    /// Drop entries whose window already rolled over, at most once per
    /// window, so the map does not grow with every client IP ever seen.
    /// Must not hold a map entry while retaining.
    fn sweep_expired(&self) {
        if let Ok(mut last) = self.last_sweep.try_lock() {
            if last.elapsed() >= self.window {
                self.windows.retain(|_, e| e.window_start.elapsed() < self.window);
                *last = Instant::now();
            }
        }
    }

    /// Consume one unit of quota for the client. Returns false once the
    /// client is over its limit for the current window.
    pub fn try_acquire(&self, client: IpAddr) -> bool {
        self.sweep_expired();

        let mut entry = self
            .windows
            .entry(client)
            .or_insert_with(|| WindowEntry { count: 0, window_start: Instant::now() });

        if entry.window_start.elapsed() >= self.window {
            entry.count = 0;
            entry.window_start = Instant::now();
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            debug!(%client, used = entry.count, "quota consumed");
            true
        } else {
            false
        }
    }
}

/// Middleware: gate every request on the per-client quota. The client is
/// identified by the connection peer address.
pub async fn enforce(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.limiter.try_acquire(addr.ip()) {
        warn!(client = %addr.ip(), "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}
