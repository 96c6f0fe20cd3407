//! Client configuration
//!
//! One [`ClientConfig`] value is owned by each client instance. Nothing here
//! is process-wide, so two clients with different settings never interfere.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONTEXT_INFO_PATH, DEFAULT_DEV_LOAD_DELAY_MS, DEFAULT_LIST_PATH, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_RENEWALS, DEFAULT_PRODUCTION_HOST, DEFAULT_REFRESH_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};

/// How the write token is renewed in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenewalPolicy {
    /// Renew at most `max_renewals` times, then stop.
    Bounded { max_renewals: u32 },
    /// Renew until the owning client is shut down.
    Unbounded,
}

impl RenewalPolicy {
    /// Whether another renewal may run after `completed` renewals.
    #[must_use]
    pub fn allows(&self, completed: u32) -> bool {
        match self {
            Self::Bounded { max_renewals } => completed < *max_renewals,
            Self::Unbounded => true,
        }
    }
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self::Bounded { max_renewals: DEFAULT_MAX_RENEWALS }
    }
}

/// Configuration for a single list client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hostnames that mark a location as live. Substring match.
    pub production_hosts: Vec<String>,
    pub list_path: String,
    pub context_info_path: String,
    pub current_user_properties_path_prefix: String,
    pub people_manager_path_prefix: String,
    pub ensure_user_path: String,
    pub send_email_path: String,
    pub profile_default_select: String,
    pub my_profile_default_select: String,
    pub account_name_prefix: String,
    pub form_digest_refresh_interval_ms: u64,
    pub renewal_policy: RenewalPolicy,
    /// Fixed local-mode latency. Ignored when both range bounds are set.
    pub dev_load_delay_ms: Option<u64>,
    pub dev_load_delay_min_ms: Option<u64>,
    pub dev_load_delay_max_ms: Option<u64>,
    pub request_timeout_ms: u64,
    /// Total transport attempts per call (initial try + retries).
    pub max_attempts: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            production_hosts: vec![DEFAULT_PRODUCTION_HOST.to_string()],
            list_path: DEFAULT_LIST_PATH.to_string(),
            context_info_path: DEFAULT_CONTEXT_INFO_PATH.to_string(),
            current_user_properties_path_prefix:
                "_api/sp.userprofiles.peoplemanager/getmyproperties/?$select=".to_string(),
            people_manager_path_prefix:
                "_api/sp.userprofiles.peoplemanager/GetPropertiesFor(accountName=@v)?@v="
                    .to_string(),
            ensure_user_path: "_api/web/ensureuser".to_string(),
            send_email_path: "_api/SP.Utilities.Utility.SendEmail".to_string(),
            profile_default_select:
                "AccountName,DisplayName,Email,PictureUrl,PersonalUrl,Title,UserProfileProperties"
                    .to_string(),
            my_profile_default_select: "DisplayName,AccountName,Email,PictureUrl,PersonalUrl,Title"
                .to_string(),
            account_name_prefix: "i:0#.f|membership|".to_string(),
            form_digest_refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            renewal_policy: RenewalPolicy::default(),
            dev_load_delay_ms: Some(DEFAULT_DEV_LOAD_DELAY_MS),
            dev_load_delay_min_ms: None,
            dev_load_delay_max_ms: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    /// Interval between background token renewals.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.form_digest_refresh_interval_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Path of the list collection endpoint, e.g. `_api/Web/Lists/getbytitle('Tasks')`.
    #[must_use]
    pub fn list_endpoint(&self, list_name: &str) -> String {
        format!("{}getbytitle('{}')", self.list_path, list_name)
    }
}
