//! Per-route, per-client request rate limiting

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::config::RateLimitSettings;
use crate::core::errors::{NlpError, Result};

/// Expired windows are swept once the table grows past this many keys
const SWEEP_THRESHOLD: usize = 10_000;

/// Minimum time between two sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Period unit of a limit expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl PeriodUnit {
    fn seconds(self) -> u64 {
        match self {
            PeriodUnit::Second => 1,
            PeriodUnit::Minute => 60,
            PeriodUnit::Hour => 3600,
            PeriodUnit::Day => 86400,
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodUnit::Second => write!(f, "second"),
            PeriodUnit::Minute => write!(f, "minute"),
            PeriodUnit::Hour => write!(f, "hour"),
            PeriodUnit::Day => write!(f, "day"),
        }
    }
}

/// A request budget such as `20/minute` or `5 per 10 seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub multiplier: u64,
    pub unit: PeriodUnit,
}

impl RateLimit {
    /// Length of one counting window
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.multiplier * self.unit.seconds())
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {} {}", self.requests, self.multiplier, self.unit)
    }
}

fn limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\d+)\s*(?:/|per)\s*(\d+)?\s*(second|minute|hour|day)s?\s*$")
            .expect("rate limit pattern is valid")
    })
}

impl FromStr for RateLimit {
    type Err = NlpError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NlpError::ConfigError {
            message: format!("Invalid rate limit expression: '{}'", s),
        };

        let caps = limit_pattern().captures(s).ok_or_else(invalid)?;

        let requests: u32 = caps[1].parse().map_err(|_| invalid())?;
        let multiplier: u64 = match caps.get(2) {
            Some(m) => m.as_str().parse().map_err(|_| invalid())?,
            None => 1,
        };
        if requests == 0 || multiplier == 0 {
            return Err(invalid());
        }

        let unit = match caps[3].to_lowercase().as_str() {
            "second" => PeriodUnit::Second,
            "minute" => PeriodUnit::Minute,
            "hour" => PeriodUnit::Hour,
            _ => PeriodUnit::Day,
        };

        Ok(Self {
            requests,
            multiplier,
            unit,
        })
    }
}

/// Counting window for one route/client key
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Live windows plus the time of the last sweep
#[derive(Debug)]
struct WindowTable {
    entries: HashMap<(String, String), Window>,
    last_sweep: Instant,
}

/// Fixed-window rate limiter keyed by route and client address
#[derive(Debug, Clone)]
pub struct RateLimiter {
    enabled: bool,
    default_limit: RateLimit,
    limits: Arc<HashMap<String, RateLimit>>,
    windows: Arc<Mutex<WindowTable>>,
    sweep_threshold: usize,
}

impl RateLimiter {
    /// Create a limiter from explicit limits
    pub fn new(default_limit: RateLimit, limits: HashMap<String, RateLimit>) -> Self {
        Self {
            enabled: true,
            default_limit,
            limits: Arc::new(limits),
            windows: Arc::new(Mutex::new(WindowTable {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            sweep_threshold: SWEEP_THRESHOLD,
        }
    }

    /// Create from configuration
    pub fn from_settings(settings: &RateLimitSettings) -> anyhow::Result<Self> {
        let default_limit: RateLimit = settings.default_limit.parse()?;
        let limits = settings
            .parsed()?
            .into_iter()
            .map(|(route, limit)| (route.to_string(), limit))
            .collect();

        let mut limiter = Self::new(default_limit, limits);
        limiter.enabled = settings.enabled;
        Ok(limiter)
    }

    /// Limit that applies to a route
    pub fn limit_for(&self, route: &str) -> RateLimit {
        self.limits.get(route).copied().unwrap_or(self.default_limit)
    }

    /// Count one request, failing with `RateLimitError` once the window is exhausted
    pub async fn check(&self, route: &str, client: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let limit = self.limit_for(route);
        let period = limit.period();
        let now = Instant::now();

        let mut table = self.windows.lock().await;

        if table.entries.len() > self.sweep_threshold
            && now.duration_since(table.last_sweep) >= SWEEP_INTERVAL
        {
            table
                .entries
                .retain(|(r, _), w| now.duration_since(w.started) < self.limit_for(r).period());
            table.last_sweep = now;
            debug!("Swept rate limit windows, {} remaining", table.entries.len());
        }

        let window = table
            .entries
            .entry((route.to_string(), client.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(window.started) >= period {
            window.started = now;
            window.count = 0;
        }

        if window.count >= limit.requests {
            let elapsed = now.duration_since(window.started);
            let retry_after = period.saturating_sub(elapsed).as_secs_f64().ceil().max(1.0) as u64;
            warn!(route, client, limit = %limit, "Rate limit exceeded");
            return Err(NlpError::RateLimitError {
                limit: limit.to_string(),
                retry_after,
            });
        }

        window.count += 1;
        Ok(())
    }
}
