//! Environment classification
//!
//! Decides once, at client construction, whether calls go to the live
//! platform or are served locally, and which base URL relative paths are
//! joined onto. Local mode also simulates latency on fixture reads.

use std::time::Duration;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Url;
use spbridge_domain::{ClientConfig, Mode, Result, SpError};
use tracing::debug;

/// Site-relative path such as `/sites/MySite/`.
static SITE_PATH: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^/\w+/\w+/").ok());

/// Live when `location` contains any of the configured hosts.
#[must_use]
pub fn classify(location: &str, production_hosts: &[String]) -> Mode {
    let live = production_hosts.iter().any(|host| !host.is_empty() && location.contains(host.as_str()));
    if live {
        Mode::Live
    } else {
        Mode::Local
    }
}

/// Guess the site path from the first two segments of the location's path.
#[must_use]
pub fn guess_site_path(location: &str) -> Option<String> {
    let path = Url::parse(location).map(|url| url.path().to_string()).unwrap_or_else(|_| location.to_string());
    SITE_PATH.as_ref()?.find(&path).map(|m| m.as_str().to_string())
}

/// Resolve the base URL every relative path is joined onto.
///
/// Absolute `base_url`s are used as is; site-relative ones (`/sites/x/`) are
/// joined onto the origin of `location`; a missing one is guessed from the
/// location's path. The result always ends with `/`.
///
/// # Errors
/// Returns [`SpError::InvalidInput`] when a relative base is given but the
/// location has no usable origin.
pub fn resolve_base_url(location: &str, base_url: Option<&str>) -> Result<String> {
    let base = match base_url.filter(|b| !b.is_empty()) {
        Some(base) if base.starts_with("http") => base.to_string(),
        Some(base) => format!("{}{}", origin(location)?, ensure_leading_slash(base)),
        None => {
            let path = guess_site_path(location).unwrap_or_else(|| "/".to_string());
            format!("{}{}", origin(location)?, path)
        }
    };
    Ok(ensure_trailing_slash(base))
}

fn origin(location: &str) -> Result<String> {
    let url = Url::parse(location)
        .map_err(|e| SpError::InvalidInput(format!("location {location} is not a URL: {e}")))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(SpError::InvalidInput(format!("location {location} has no origin")));
    }
    Ok(origin.ascii_serialization())
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn ensure_trailing_slash(mut base: String) -> String {
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Artificial latency applied to local-mode reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalDelay {
    None,
    Fixed(Duration),
    /// Uniformly random between `min` and `min + max(1ms, max - min)`.
    Range { min: Duration, max: Duration },
}

impl LocalDelay {
    /// Range wins when both bounds are set, then the fixed delay.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        match (config.dev_load_delay_min_ms, config.dev_load_delay_max_ms, config.dev_load_delay_ms) {
            (Some(min), Some(max), _) if min > 0 && max > 0 => {
                Self::Range { min: Duration::from_millis(min), max: Duration::from_millis(max) }
            }
            (_, _, Some(fixed)) if fixed > 0 => Self::Fixed(Duration::from_millis(fixed)),
            _ => Self::None,
        }
    }

    /// Next delay to apply.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Range { min, max } => {
                let span = max.saturating_sub(min).max(Duration::from_millis(1));
                let span_ms = millis(span);
                min + Duration::from_millis(rand::thread_rng().gen_range(0..=span_ms))
            }
        }
    }

    /// Sleep for the next delay.
    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            debug!(delay_ms = millis(delay), "simulating local latency");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Everything a client decides about where it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub mode: Mode,
    pub base_url: String,
    pub delay: LocalDelay,
}

impl Environment {
    /// Classify `location` (the page or service address the client acts for).
    ///
    /// # Errors
    /// Propagates [`resolve_base_url`] failures.
    pub fn detect(location: &str, base_url: Option<&str>, config: &ClientConfig) -> Result<Self> {
        let mode = classify(location, &config.production_hosts);
        let base_url = resolve_base_url(location, base_url)?;
        debug!(?mode, %base_url, "environment classified");
        Ok(Self { mode, base_url, delay: LocalDelay::from_config(config) })
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.mode.is_live()
    }

    /// Resolve a configured endpoint path: `http…` paths are kept,
    /// site-absolute paths (`/…`) are joined onto the origin and anything
    /// else onto the base URL.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else if path.starts_with('/') {
            match origin(&self.base_url) {
                Ok(origin) => format!("{origin}{path}"),
                Err(_) => path.to_string(),
            }
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}
