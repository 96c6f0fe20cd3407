//! Form digest manager with background renewal
//!
//! Manages the write-token lifecycle:
//! - Acquisition through the context-info endpoint (live mode only)
//! - A fixed placeholder token in local mode
//! - Background renewal on a fixed interval, bounded or unbounded
//! - Readiness reporting for mutating calls

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use spbridge_domain::constants::{
    HEADER_ACCEPT, HEADER_HTTP_METHOD, LOCAL_TOKEN, METHOD_POST, ODATA_VERBOSE_SPACED,
};
use spbridge_domain::utils::odata::context_token;
use spbridge_domain::{ClientConfig, Mode, RenewalPolicy, Result, SpError};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::environment::millis;
use crate::http::{Transport, TransportRequest};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// State shared between the manager and its renewal task.
struct Session {
    transport: Arc<dyn Transport>,
    mode: Mode,
    context_info_url: RwLock<String>,
    token: RwLock<Option<String>>,
    /// Serialises acquisitions so concurrent callers never race a second call.
    acquisition: Mutex<()>,
    renewals: AtomicU32,
}

impl Session {
    async fn acquire(&self) -> Result<String> {
        let _guard = self.acquisition.lock().await;
        self.fetch().await
    }

    async fn fetch(&self) -> Result<String> {
        if !self.mode.is_live() {
            *self.token.write().await = Some(LOCAL_TOKEN.to_string());
            return Ok(LOCAL_TOKEN.to_string());
        }

        let url = self.context_info_url.read().await.clone();
        let request = TransportRequest::post(url.as_str())
            .header(HEADER_ACCEPT, ODATA_VERBOSE_SPACED)
            .header(HEADER_HTTP_METHOD, METHOD_POST)
            .json(json!({}))
            .with_credentials();

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| SpError::TokenUnavailable(e.to_string()))?;

        let token = context_token(&response.body)
            .ok_or_else(|| SpError::TokenUnavailable(SpError::NoTokenProvided.to_string()))?;

        *self.token.write().await = Some(token.clone());
        debug!(%url, "form digest acquired");
        Ok(token)
    }
}

/// Owns the form digest of one client.
///
/// Dropping the manager cancels its renewal task.
pub struct SessionTokenManager {
    session: Arc<Session>,
    policy: RenewalPolicy,
    interval: Duration,
    cancellation_token: CancellationToken,
    renewal_handle: TaskHandle,
}

impl SessionTokenManager {
    /// Create a manager that acquires tokens from `context_info_url`.
    ///
    /// No call is made until the first acquisition.
    pub fn new(
        transport: Arc<dyn Transport>,
        mode: Mode,
        context_info_url: impl Into<String>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            session: Arc::new(Session {
                transport,
                mode,
                context_info_url: RwLock::new(context_info_url.into()),
                token: RwLock::new(None),
                acquisition: Mutex::new(()),
                renewals: AtomicU32::new(0),
            }),
            policy: config.renewal_policy,
            interval: config.refresh_interval(),
            cancellation_token: CancellationToken::new(),
            renewal_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Acquire a fresh token.
    ///
    /// Local mode resolves with the placeholder token without any call. Every
    /// attempt, successful or not, makes sure the renewal task is running.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::TokenUnavailable`] wrapping the transport failure or
    /// the missing-token marker.
    #[instrument(skip(self), fields(mode = ?self.session.mode))]
    pub async fn acquire_token(&self) -> Result<String> {
        let result = self.session.acquire().await;
        self.start_renewal().await;
        result
    }

    /// Current token, acquiring the first one if none is stored yet.
    ///
    /// Callers arriving while an acquisition is in flight wait for it and
    /// reuse its token instead of issuing a second call.
    ///
    /// # Errors
    ///
    /// Same as [`Self::acquire_token`].
    pub async fn ensure_token(&self) -> Result<String> {
        if let Some(token) = self.token().await {
            return Ok(token);
        }

        let result = {
            let _guard = self.session.acquisition.lock().await;
            match self.token().await {
                Some(token) => return Ok(token),
                None => self.session.fetch().await,
            }
        };
        self.start_renewal().await;
        result
    }

    /// True in local mode, or once a live token is stored.
    pub async fn is_ready(&self) -> bool {
        !self.session.mode.is_live() || self.session.token.read().await.is_some()
    }

    /// Stored token, if any.
    pub async fn token(&self) -> Option<String> {
        self.session.token.read().await.clone()
    }

    /// Number of background renewals run so far.
    pub fn renewal_count(&self) -> u32 {
        self.session.renewals.load(Ordering::SeqCst)
    }

    /// Mode the manager was created for.
    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    /// Point future acquisitions at a different context-info endpoint.
    pub async fn set_context_info_url(&self, url: impl Into<String>) {
        *self.session.context_info_url.write().await = url.into();
    }

    /// Whether the renewal task is currently scheduled.
    pub async fn is_renewing(&self) -> bool {
        self.renewal_handle.lock().await.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the renewal task and wait for it to finish.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();

        if let Some(handle) = self.renewal_handle.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Renewal task panicked: {}", e),
                Err(_) => warn!("Renewal task did not complete within timeout"),
            }
        }

        debug!("session shut down");
    }

    async fn start_renewal(&self) {
        if !self.session.mode.is_live() || self.interval.is_zero() {
            return;
        }
        if self.cancellation_token.is_cancelled() {
            return;
        }

        let mut handle = self.renewal_handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        if !self.policy.allows(self.renewal_count()) {
            return;
        }

        let session = Arc::clone(&self.session);
        let policy = self.policy;
        let interval = self.interval;
        let cancel = self.cancellation_token.clone();

        *handle = Some(tokio::spawn(async move {
            Self::renewal_loop(session, policy, interval, cancel).await;
        }));

        debug!(interval_ms = millis(interval), ?policy, "token renewal scheduled");
    }

    async fn renewal_loop(
        session: Arc<Session>,
        policy: RenewalPolicy,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            if !policy.allows(session.renewals.load(Ordering::SeqCst)) {
                debug!("Renewal budget exhausted");
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Renewal loop cancelled");
                    break;
                }
                () = tokio::time::sleep(interval) => {
                    let renewal = session.renewals.fetch_add(1, Ordering::SeqCst) + 1;
                    match session.acquire().await {
                        Ok(_) => info!(renewal, "Refreshed digest value"),
                        Err(e) => warn!(renewal, error = %e, "Digest renewal failed"),
                    }
                }
            }
        }
    }
}

impl Drop for SessionTokenManager {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::http::TransportResponse;

    /// Counts calls and answers every one with the same reply.
    struct FakeTransport {
        calls: AtomicUsize,
        requests: std::sync::Mutex<Vec<TransportRequest>>,
        reply: Result<Value>,
        latency: Duration,
    }

    impl FakeTransport {
        fn replying(reply: Result<Value>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                requests: std::sync::Mutex::new(Vec::new()),
                reply,
                latency: Duration::ZERO,
            })
        }

        fn slow(reply: Value, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                requests: std::sync::Mutex::new(Vec::new()),
                reply: Ok(reply),
                latency,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.reply.clone().map(|body| TransportResponse { status: 200, body })
        }
    }

    fn config(policy: RenewalPolicy, interval_ms: u64) -> ClientConfig {
        ClientConfig {
            renewal_policy: policy,
            form_digest_refresh_interval_ms: interval_ms,
            ..ClientConfig::default()
        }
    }

    fn nested_token(token: &str) -> Value {
        json!({"d": {"GetContextWebInformation": {"FormDigestValue": token}}})
    }

    const URL: &str = "https://h.sharepoint.com/sites/a/_api/contextinfo";

    #[tokio::test]
    async fn local_mode_uses_placeholder_without_calls() {
        let transport = FakeTransport::replying(Ok(Value::Null));
        let manager =
            SessionTokenManager::new(transport.clone(), Mode::Local, URL, &ClientConfig::default());

        assert!(manager.is_ready().await);
        assert_eq!(manager.acquire_token().await.unwrap(), "dev digest value");
        assert_eq!(manager.ensure_token().await.unwrap(), "dev digest value");
        assert_eq!(transport.calls(), 0);
        assert!(!manager.is_renewing().await);
    }

    /// Validates the context-info call shape and nested token extraction.
    ///
    /// Assertions:
    /// - Not ready before the first acquisition
    /// - POST with spaced verbose Accept, X-HTTP-Method and credentials
    /// - Token stored and renewal scheduled afterwards
    #[tokio::test]
    async fn live_acquisition_extracts_nested_token() {
        let transport = FakeTransport::replying(Ok(nested_token("0xABC,01 Jan")));
        let manager =
            SessionTokenManager::new(transport.clone(), Mode::Live, URL, &ClientConfig::default());

        assert!(!manager.is_ready().await);
        assert_eq!(manager.acquire_token().await.unwrap(), "0xABC,01 Jan");
        assert!(manager.is_ready().await);
        assert_eq!(manager.token().await.as_deref(), Some("0xABC,01 Jan"));
        assert!(manager.is_renewing().await);

        let requests = transport.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.url, URL);
        assert_eq!(request.header_value("Accept"), Some("application/json; odata=verbose"));
        assert_eq!(request.header_value("X-HTTP-Method"), Some("POST"));
        assert_eq!(request.body, Some(json!({})));
        assert!(request.with_credentials);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn live_acquisition_accepts_top_level_token() {
        let transport = FakeTransport::replying(Ok(json!({"FormDigestValue": "flat"})));
        let manager =
            SessionTokenManager::new(transport, Mode::Live, URL, &ClientConfig::default());

        assert_eq!(manager.acquire_token().await.unwrap(), "flat");
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn missing_token_is_unavailable() {
        let transport = FakeTransport::replying(Ok(json!({"d": {}})));
        let manager =
            SessionTokenManager::new(transport, Mode::Live, URL, &ClientConfig::default());

        let err = manager.acquire_token().await.unwrap_err();
        assert_eq!(err, SpError::TokenUnavailable("No digest provided".into()));
        assert!(!manager.is_ready().await);
        // Failed attempts still schedule the renewal
        assert!(manager.is_renewing().await);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let transport = FakeTransport::replying(Err(SpError::Transport("refused".into())));
        let manager =
            SessionTokenManager::new(transport, Mode::Live, URL, &ClientConfig::default());

        let err = manager.acquire_token().await.unwrap_err();
        assert!(matches!(err, SpError::TokenUnavailable(msg) if msg.contains("refused")));
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_acquisition() {
        let transport = FakeTransport::slow(nested_token("shared"), Duration::from_millis(50));
        let manager =
            SessionTokenManager::new(transport.clone(), Mode::Live, URL, &ClientConfig::default());

        let (a, b, c) =
            tokio::join!(manager.ensure_token(), manager.ensure_token(), manager.ensure_token());

        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(c.unwrap(), "shared");
        assert_eq!(transport.calls(), 1);
        manager.shutdown().await;
    }

    /// Validates the bounded renewal schedule.
    ///
    /// Assertions:
    /// - Exactly `max_renewals` renewals run, one per interval
    /// - The task ends on its own afterwards
    #[tokio::test(start_paused = true)]
    async fn bounded_policy_stops_after_max_renewals() {
        let transport = FakeTransport::replying(Ok(nested_token("t")));
        let manager = SessionTokenManager::new(
            transport.clone(),
            Mode::Live,
            URL,
            &config(RenewalPolicy::Bounded { max_renewals: 3 }, 1_000),
        );

        manager.acquire_token().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(manager.renewal_count(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(manager.renewal_count(), 3);
        assert_eq!(transport.calls(), 4);
        assert!(!manager.is_renewing().await);

        // A later acquisition does not restart an exhausted budget
        manager.acquire_token().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_policy_runs_until_shutdown() {
        let transport = FakeTransport::replying(Ok(nested_token("t")));
        let manager = SessionTokenManager::new(
            transport.clone(),
            Mode::Live,
            URL,
            &config(RenewalPolicy::Unbounded, 1_000),
        );

        manager.acquire_token().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(manager.renewal_count(), 10);

        manager.shutdown().await;
        let calls = transport.calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.calls(), calls);
        assert!(!manager.is_renewing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn renewal_failures_are_swallowed() {
        let transport = FakeTransport::replying(Err(SpError::Transport("down".into())));
        let manager = SessionTokenManager::new(
            transport.clone(),
            Mode::Live,
            URL,
            &config(RenewalPolicy::Bounded { max_renewals: 2 }, 1_000),
        );

        assert!(manager.acquire_token().await.is_err());
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(manager.renewal_count(), 2);
        assert_eq!(transport.calls(), 3);
        assert!(!manager.is_ready().await);
    }

    /// Succeeds on the first call, then fails every later one after `latency`.
    struct FailingAfterFirst {
        calls: AtomicUsize,
        token: &'static str,
        latency: Duration,
    }

    #[async_trait]
    impl Transport for FailingAfterFirst {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(TransportResponse { status: 200, body: nested_token(self.token) });
            }
            tokio::time::sleep(self.latency).await;
            Err(SpError::Transport("down".into()))
        }
    }

    /// Validates readiness survives renewals after the first token.
    ///
    /// Assertions:
    /// - Ready while a renewal is in flight
    /// - Failed renewals keep the first token
    #[tokio::test(start_paused = true)]
    async fn stored_token_survives_slow_failing_renewals() {
        let transport = Arc::new(FailingAfterFirst {
            calls: AtomicUsize::new(0),
            token: "first",
            latency: Duration::from_millis(500),
        });
        let manager = SessionTokenManager::new(
            transport.clone(),
            Mode::Live,
            URL,
            &config(RenewalPolicy::Bounded { max_renewals: 2 }, 1_000),
        );

        assert_eq!(manager.acquire_token().await.unwrap(), "first");

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert_eq!(manager.renewal_count(), 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert!(manager.is_ready().await);
        assert_eq!(manager.token().await.as_deref(), Some("first"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(manager.renewal_count(), 2);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert!(manager.is_ready().await);
        assert_eq!(manager.ensure_token().await.unwrap(), "first");

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn context_info_url_can_change() {
        let transport = FakeTransport::replying(Ok(nested_token("t")));
        let manager =
            SessionTokenManager::new(transport.clone(), Mode::Live, URL, &ClientConfig::default());

        manager.set_context_info_url("https://h.sharepoint.com/sites/b/_api/contextinfo").await;
        manager.acquire_token().await.unwrap();

        let requests = transport.requests.lock().unwrap().clone();
        assert_eq!(requests[0].url, "https://h.sharepoint.com/sites/b/_api/contextinfo");
        manager.shutdown().await;
    }
}
