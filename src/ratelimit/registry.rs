//! The set of independently configured limiters, one per action class.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::limiter::RateLimiter;
use super::record::RateLimitStatus;
use crate::config::LimitsConfig;
use crate::error::{Result, ThrottleError};

/// The kinds of client action that are throttled separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionClass {
    Login,
    Api,
    Upload,
}

impl ActionClass {
    pub const ALL: [ActionClass; 3] = [ActionClass::Login, ActionClass::Api, ActionClass::Upload];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionClass::Login => "login",
            ActionClass::Api => "api",
            ActionClass::Upload => "upload",
        }
    }
}

impl std::fmt::Display for ActionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionClass {
    type Err = ThrottleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "login" => Ok(ActionClass::Login),
            "api" => Ok(ActionClass::Api),
            "upload" => Ok(ActionClass::Upload),
            other => Err(ThrottleError::UnknownLimiter(other.to_string())),
        }
    }
}

/// One limiter per action class, each with its own quota and key space.
///
/// Built once by the owner and handed (usually as `Arc<LimiterSet>`) to
/// whatever needs to gate actions.
#[derive(Debug)]
pub struct LimiterSet {
    login: RateLimiter,
    api: RateLimiter,
    upload: RateLimiter,
}

impl LimiterSet {
    /// Build the limiters on the system clock.
    pub fn new(limits: &LimitsConfig) -> Result<Self> {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    /// Build the limiters on a shared clock.
    pub fn with_clock(limits: &LimitsConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            login: RateLimiter::from_config(&limits.login, clock.clone())?
                .named(ActionClass::Login.as_str()),
            api: RateLimiter::from_config(&limits.api, clock.clone())?
                .named(ActionClass::Api.as_str()),
            upload: RateLimiter::from_config(&limits.upload, clock)?
                .named(ActionClass::Upload.as_str()),
        })
    }

    pub fn login(&self) -> &RateLimiter {
        &self.login
    }

    pub fn api(&self) -> &RateLimiter {
        &self.api
    }

    pub fn upload(&self) -> &RateLimiter {
        &self.upload
    }

    /// The limiter for `class`.
    pub fn get(&self, class: ActionClass) -> &RateLimiter {
        match class {
            ActionClass::Login => &self.login,
            ActionClass::Api => &self.api,
            ActionClass::Upload => &self.upload,
        }
    }

    /// Gate an action of `class` for `key`.
    pub fn check(&self, class: ActionClass, key: &str) -> bool {
        self.get(class).check(key)
    }

    pub fn get_status(&self, class: ActionClass, key: &str) -> RateLimitStatus {
        self.get(class).get_status(key)
    }

    /// Sweep expired records from every limiter.
    ///
    /// Returns the total number of records removed.
    pub fn cleanup_all(&self) -> usize {
        ActionClass::ALL
            .iter()
            .map(|class| self.get(*class).cleanup())
            .sum()
    }

    /// Keys held across all limiters.
    pub fn tracked_keys(&self) -> usize {
        ActionClass::ALL
            .iter()
            .map(|class| self.get(*class).tracked_keys())
            .sum()
    }
}
