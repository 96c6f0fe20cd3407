//! List client
//!
//! Shapes read, write, update, delete and query calls against list
//! endpoints, unwraps the verbose OData envelopes and runs the two-phase
//! optimistic update. In local mode reads are served from fixtures and
//! writes are logged dry runs; nothing is sent.

use std::sync::Arc;

use serde_json::Value;
use spbridge_domain::constants::{
    CONCURRENCY_SELECT, HEADER_ACCEPT, HEADER_CONTENT_TYPE, HEADER_HTTP_METHOD, HEADER_IF_MATCH,
    HEADER_REQUEST_DIGEST, MATCH_ANY, METHOD_DELETE, METHOD_MERGE, METHOD_POST, ODATA_VERBOSE,
};
use spbridge_domain::utils::odata::{
    caml_query_payload, etag, list_item_type, unwrap_read_envelope, unwrap_write_envelope,
    with_item_type,
};
use spbridge_domain::{
    cast_to_payload, ClientConfig, CollectionQuery, Location, Mode, ReadTarget, Record, Result,
    SpError, WriteOutcome,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::environment::{resolve_base_url, Environment, LocalDelay};
use crate::errors::InfraError;
use crate::http::{HttpClient, Transport, TransportRequest};
use crate::session::SessionTokenManager;

/// Client for the list endpoints of one site.
///
/// The execution mode is decided once at construction from the location the
/// client acts for. Each client owns its configuration and its session.
pub struct ListClient {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) config: ClientConfig,
    pub(super) mode: Mode,
    pub(super) delay: LocalDelay,
    pub(super) base_url: RwLock<String>,
    pub(super) session: SessionTokenManager,
}

impl ListClient {
    /// Create a client backed by the reqwest transport.
    ///
    /// # Arguments
    ///
    /// * `location` - Address of the page or service the client acts for
    /// * `base_url` - Site URL; guessed from `location` when `None`
    /// * `config` - Client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot be resolved.
    pub fn new(location: &str, base_url: Option<&str>, config: ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .max_attempts(config.max_attempts)
            .build()?;
        Self::with_transport(location, base_url, config, Arc::new(http))
    }

    /// Create a client over any transport.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] when the base URL cannot be resolved.
    pub fn with_transport(
        location: &str,
        base_url: Option<&str>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let environment = Environment::detect(location, base_url, &config)?;
        let session = SessionTokenManager::new(
            Arc::clone(&transport),
            environment.mode,
            environment.api_url(&config.context_info_path),
            &config,
        );

        info!(mode = ?environment.mode, base_url = %environment.base_url, "list client created");

        Ok(Self {
            transport,
            mode: environment.mode,
            delay: environment.delay,
            base_url: RwLock::new(environment.base_url),
            session,
            config,
        })
    }

    /// Mode detected from the client's location.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL relative paths resolve against.
    pub async fn base_url(&self) -> String {
        self.base_url.read().await.clone()
    }

    /// Change the base URL of subsequent requests.
    ///
    /// Site-relative values are joined onto the origin of the current base.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for an empty or unresolvable value.
    pub async fn set_base_url(&self, base_url: &str) -> Result<()> {
        if base_url.is_empty() {
            return Err(SpError::InvalidInput("No base URL provided".into()));
        }

        let resolved = {
            let mut current = self.base_url.write().await;
            *current = resolve_base_url(&current, Some(base_url))?;
            current.clone()
        };

        let context_info_url = self.environment_for(&resolved).api_url(&self.config.context_info_path);
        self.session.set_context_info_url(context_info_url).await;
        debug!(base_url = %resolved, "base URL changed");
        Ok(())
    }

    /// True when mutating calls can be sent right away.
    pub async fn is_write_ready(&self) -> bool {
        self.session.is_ready().await
    }

    /// Acquire a fresh write token (see [`SessionTokenManager::acquire_token`]).
    ///
    /// # Errors
    ///
    /// Returns [`SpError::TokenUnavailable`] when acquisition fails.
    pub async fn acquire_token(&self) -> Result<String> {
        self.session.acquire_token().await
    }

    /// Token session shared by the client's mutating calls.
    #[must_use]
    pub fn session(&self) -> &SessionTokenManager {
        &self.session
    }

    /// Stop background token renewal.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }

    /// Read a resource.
    ///
    /// Live: GET with credentials, unwrapped as `d.results`, `d` or the raw
    /// body. Local: the target's fixture after the artificial delay.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::NoLocalFixture`] in local mode without a fixture,
    /// otherwise any transport failure.
    #[instrument(skip(self, target))]
    pub async fn read(&self, target: ReadTarget) -> Result<Value> {
        if !self.mode.is_live() {
            return match target.fixture.as_deref() {
                Some(fixture) => self.fetch_fixture(fixture).await,
                None => Err(SpError::NoLocalFixture(format!("{:?}", target.location))),
            };
        }

        let url = target.location.resolve(&self.base_url().await)?;
        debug!(url = %url, "GET request");

        let response = self.transport.send(read_request(url)).await?;
        Ok(unwrap_read_envelope(response.body))
    }

    /// Read the items of a list with optional OData clauses.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for an empty list name, otherwise the
    /// errors of [`Self::read`].
    pub async fn read_collection(&self, list_name: &str, query: CollectionQuery) -> Result<Value> {
        if list_name.is_empty() {
            return Err(SpError::InvalidInput("No list name provided".into()));
        }

        let mut path = format!("{}/items", self.config.list_endpoint(list_name));
        let query_string = query.to_query_string();
        if !query_string.is_empty() {
            path.push('?');
            path.push_str(&query_string);
        }

        let mut target = ReadTarget::path(path);
        if let Some(base) = query.base_url {
            target = target.with_base_url(base);
        }
        if let Some(fixture) = query.fixture {
            target = target.with_fixture(fixture);
        }
        self.read(target).await
    }

    /// POST a payload with the current write token.
    ///
    /// Local mode logs the payload and echoes it as a dry run.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for a missing location or payload,
    /// token acquisition failures, or any transport failure.
    #[instrument(skip(self, location, payload))]
    pub async fn write(&self, location: Location, payload: Value) -> Result<WriteOutcome> {
        if payload.is_null() {
            return Err(SpError::InvalidInput("No path or data provided".into()));
        }
        let url = location.resolve(&self.base_url().await)?;

        if !self.mode.is_live() {
            info!(url = %url, payload = %payload, "Post to SharePoint (dry run)");
            return Ok(WriteOutcome::DryRun(payload));
        }

        let digest = self.session.ensure_token().await?;
        debug!(url = %url, "POST request");

        let request = write_request(url, &digest, METHOD_POST).json(payload);
        let response = self.transport.send(request).await?;
        Ok(unwrap_write_envelope(response.body))
    }

    /// Append a record to a list as a new item.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for an empty list name or record,
    /// otherwise the errors of [`Self::write`].
    pub async fn add_item(&self, list_name: &str, record: &Record) -> Result<WriteOutcome> {
        let payload = self.item_payload(list_name, record)?;
        let path = format!("{}/items", self.config.list_endpoint(list_name));
        self.write(Location::path(path), payload).await
    }

    /// Update an existing item with a fresh version tag.
    ///
    /// Reads `item_url?$select=ID` to obtain the current tag, then MERGEs
    /// the record with `If-Match` set to the normalised tag. A tag mismatch
    /// (HTTP 412) is returned as is; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::NoConcurrencyTag`] when the read carries no tag,
    /// the read's own error when it fails, or the write's error.
    #[instrument(skip(self, record), fields(item_url = %item_url))]
    pub async fn update_item(
        &self,
        list_name: &str,
        record: &Record,
        item_url: &str,
    ) -> Result<WriteOutcome> {
        if item_url.is_empty() {
            return Err(SpError::InvalidInput("No list, item URL or data provided".into()));
        }
        let payload = self.item_payload(list_name, record)?;

        if !self.mode.is_live() {
            info!(item_url = %item_url, payload = %payload, "Update in SharePoint (dry run)");
            return Ok(WriteOutcome::DryRun(payload));
        }

        let tag_url = format!("{item_url}{CONCURRENCY_SELECT}");
        debug!(url = %tag_url, "GET request");
        let response = self.transport.send(read_request(tag_url).single_attempt()).await?;
        let item = unwrap_read_envelope(response.body);
        let tag = etag(&item).ok_or_else(|| SpError::NoConcurrencyTag(item_url.to_string()))?;

        let digest = self.session.ensure_token().await?;
        debug!(item_url = %item_url, "MERGE request");

        let request = write_request(item_url.to_string(), &digest, METHOD_MERGE)
            .header(HEADER_IF_MATCH, tag.normalized())
            .json(payload);
        let response = self.transport.send(request).await?;
        Ok(unwrap_write_envelope(response.body))
    }

    /// Delete an item regardless of its version.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for an empty URL, token acquisition
    /// failures, or any transport failure.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_url: &str) -> Result<()> {
        if item_url.is_empty() {
            return Err(SpError::InvalidInput("No item URL provided".into()));
        }

        if !self.mode.is_live() {
            info!(item_url = %item_url, "Delete item in SharePoint (dry run)");
            return Ok(());
        }

        let digest = self.session.ensure_token().await?;
        let request = TransportRequest::post(item_url)
            .header(HEADER_REQUEST_DIGEST, digest)
            .header(HEADER_IF_MATCH, MATCH_ANY)
            .header(HEADER_HTTP_METHOD, METHOD_DELETE)
            .with_credentials();

        self.transport.send(request).await?;
        info!(item_url = %item_url, "item deleted");
        Ok(())
    }

    /// Run a CAML query against a list and return the matching items.
    ///
    /// Local mode returns `fixture` when given, otherwise echoes the query
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for an empty list name or query.
    pub async fn query(
        &self,
        list_name: &str,
        view_xml: &str,
        fixture: Option<&str>,
    ) -> Result<Value> {
        if list_name.is_empty() || view_xml.is_empty() {
            return Err(SpError::InvalidInput("No list or query provided".into()));
        }

        if !self.mode.is_live() {
            if let Some(fixture) = fixture {
                return self.fetch_fixture(fixture).await;
            }
        }

        let path = format!("{}/getitems", self.config.list_endpoint(list_name));
        let outcome = self.write(Location::path(path), caml_query_payload(view_xml)).await?;
        Ok(outcome.into_value())
    }

    /// Load a local fixture: `http(s)://` through the transport, anything
    /// else (optionally `file://`) from disk. Applies the artificial delay.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::NoLocalFixture`] for a missing file, or a
    /// transport/serialization error.
    pub async fn fetch_fixture(&self, fixture: &str) -> Result<Value> {
        let body = if fixture.starts_with("http://") || fixture.starts_with("https://") {
            self.transport.send(TransportRequest::get(fixture)).await?.body
        } else {
            let path = fixture.strip_prefix("file://").unwrap_or(fixture);
            let raw = tokio::fs::read_to_string(path).await.map_err(InfraError::from)?;
            serde_json::from_str(&raw)?
        };

        self.delay.wait().await;
        debug!(fixture = %fixture, "served local fixture");
        Ok(body)
    }

    /// Wait out the local-mode delay.
    pub(super) async fn local_delay(&self) {
        self.delay.wait().await;
    }

    /// Resolve a configured endpoint path against the current base URL.
    pub(super) async fn api_url(&self, path: &str) -> String {
        self.environment_for(&self.base_url().await).api_url(path)
    }

    fn environment_for(&self, base_url: &str) -> Environment {
        Environment { mode: self.mode, base_url: base_url.to_string(), delay: self.delay }
    }

    fn item_payload(&self, list_name: &str, record: &Record) -> Result<Value> {
        if list_name.is_empty() || record.is_empty() {
            return Err(SpError::InvalidInput("No list or data provided".into()));
        }
        let item_type = list_item_type(list_name)?;
        Ok(with_item_type(&item_type, cast_to_payload(record)))
    }
}

/// GET with credentials and the verbose OData media type.
pub(super) fn read_request(url: impl Into<String>) -> TransportRequest {
    TransportRequest::get(url)
        .header(HEADER_ACCEPT, ODATA_VERBOSE)
        .header(HEADER_CONTENT_TYPE, ODATA_VERBOSE)
        .with_credentials()
}

/// POST carrying the write token and the tunnelled HTTP method.
pub(super) fn write_request(url: impl Into<String>, digest: &str, method: &str) -> TransportRequest {
    TransportRequest::post(url)
        .header(HEADER_ACCEPT, ODATA_VERBOSE)
        .header(HEADER_CONTENT_TYPE, ODATA_VERBOSE)
        .header(HEADER_REQUEST_DIGEST, digest)
        .header(HEADER_HTTP_METHOD, method)
        .with_credentials()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use spbridge_domain::FieldValue;

    use super::*;
    use crate::http::TransportResponse;

    /// Fails the test if anything reaches the network.
    #[derive(Default)]
    struct NoNetwork {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for NoNetwork {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SpError::Transport(format!("unexpected call to {}", request.url)))
        }
    }

    fn local_client() -> (ListClient, Arc<NoNetwork>) {
        let transport = Arc::new(NoNetwork::default());
        let config = ClientConfig { dev_load_delay_ms: None, ..ClientConfig::default() };
        let client = ListClient::with_transport(
            "http://localhost:8080/sites/Dev/index.html",
            None,
            config,
            transport.clone(),
        )
        .unwrap();
        (client, transport)
    }

    fn record() -> Record {
        Record::new().with("Title", "hello").with("Owner", FieldValue::single_ref(7))
    }

    #[tokio::test]
    async fn local_client_is_ready_without_token() {
        let (client, transport) = local_client();

        assert_eq!(client.mode(), Mode::Local);
        assert_eq!(client.base_url().await, "http://localhost:8080/sites/Dev/");
        assert!(client.is_write_ready().await);
        assert_eq!(client.acquire_token().await.unwrap(), "dev digest value");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_writes_are_dry_runs() {
        let (client, transport) = local_client();

        let added = client.add_item("project tasks", &record()).await.unwrap();
        assert_eq!(
            added,
            WriteOutcome::DryRun(json!({
                "__metadata": {"type": "SP.Data.Project_x0020_tasksListItem"},
                "Title": "hello",
                "OwnerId": 7
            }))
        );

        let updated = client.update_item("Tasks", &record(), "https://h/item(1)").await.unwrap();
        assert!(updated.is_dry_run());

        client.delete_item("https://h/item(1)").await.unwrap();

        let echoed = client.query("Tasks", "<View/>", None).await.unwrap();
        assert_eq!(echoed["query"]["ViewXml"], "<View/>");

        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_read_without_fixture_fails() {
        let (client, _) = local_client();
        let err = client.read(ReadTarget::path("_api/web")).await.unwrap_err();
        assert!(matches!(err, SpError::NoLocalFixture(_)));
    }

    #[tokio::test]
    async fn local_read_serves_file_fixture() {
        let (client, _) = local_client();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"d": {{"results": [{{"ID": 1}}]}}}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        // Fixtures are returned verbatim, envelope included
        let body = client
            .read_collection("Tasks", CollectionQuery::new().fixture(path.clone()))
            .await
            .unwrap();
        assert_eq!(body, json!({"d": {"results": [{"ID": 1}]}}));

        let via_scheme = client.fetch_fixture(&format!("file://{path}")).await.unwrap();
        assert_eq!(via_scheme, body);

        let missing = client.fetch_fixture("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(missing, SpError::NoLocalFixture(_)));
    }

    #[tokio::test]
    async fn rejects_missing_inputs_before_any_call() {
        let (client, transport) = local_client();

        assert!(matches!(
            client.add_item("", &record()).await,
            Err(SpError::InvalidInput(_))
        ));
        assert!(matches!(
            client.add_item("Tasks", &Record::new()).await,
            Err(SpError::InvalidInput(_))
        ));
        assert!(matches!(
            client.update_item("Tasks", &record(), "").await,
            Err(SpError::InvalidInput(_))
        ));
        assert!(matches!(client.delete_item("").await, Err(SpError::InvalidInput(_))));
        assert!(matches!(client.query("Tasks", "", None).await, Err(SpError::InvalidInput(_))));
        assert!(matches!(
            client.read_collection("", CollectionQuery::new()).await,
            Err(SpError::InvalidInput(_))
        ));
        assert!(matches!(
            client.write(Location::path(""), json!({"a": 1})).await,
            Err(SpError::InvalidInput(_))
        ));
        assert!(matches!(
            client.write(Location::path("x"), Value::Null).await,
            Err(SpError::InvalidInput(_))
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_base_url_joins_relative_sites() {
        let (client, _) = local_client();

        client.set_base_url("/sites/Other").await.unwrap();
        assert_eq!(client.base_url().await, "http://localhost:8080/sites/Other/");
        assert_eq!(
            client.api_url("_api/web/ensureuser").await,
            "http://localhost:8080/sites/Other/_api/web/ensureuser"
        );

        client.set_base_url("https://x.sharepoint.com/sites/Y").await.unwrap();
        assert_eq!(client.base_url().await, "https://x.sharepoint.com/sites/Y/");
        assert!(client.set_base_url("").await.is_err());
    }

    #[test]
    fn request_shapes_carry_verbose_headers() {
        let read = read_request("https://h/_api/web");
        assert_eq!(read.header_value("accept"), Some(ODATA_VERBOSE));
        assert_eq!(read.header_value("content-type"), Some(ODATA_VERBOSE));
        assert!(read.with_credentials);

        let write = write_request("https://h/item", "digest", METHOD_MERGE);
        assert_eq!(write.header_value("X-RequestDigest"), Some("digest"));
        assert_eq!(write.header_value("X-HTTP-Method"), Some("MERGE"));
        assert_eq!(write.header_value("If-Match"), None);
    }
}
