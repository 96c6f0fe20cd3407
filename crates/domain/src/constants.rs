//! Platform constants
//!
//! Header names, header values, path templates and fixed tokens shared by the
//! codec, the session manager and the request engine.

// Headers
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_REQUEST_DIGEST: &str = "X-RequestDigest";
pub const HEADER_HTTP_METHOD: &str = "X-HTTP-Method";
pub const HEADER_IF_MATCH: &str = "If-Match";

pub const ODATA_VERBOSE: &str = "application/json;odata=verbose";
/// The context-info endpoint historically received a spaced media type.
pub const ODATA_VERBOSE_SPACED: &str = "application/json; odata=verbose";

pub const METHOD_POST: &str = "POST";
pub const METHOD_MERGE: &str = "MERGE";
pub const METHOD_DELETE: &str = "DELETE";
pub const MATCH_ANY: &str = "*";

// Envelope keys
pub const ENVELOPE_DATA: &str = "d";
pub const ENVELOPE_RESULTS: &str = "results";
pub const ENVELOPE_METADATA: &str = "__metadata";

// Fixed values
pub const LOCAL_TOKEN: &str = "dev digest value";
pub const LOCAL_SITE_USER_ID: i64 = 1234;
pub const CAML_QUERY_TYPE: &str = "SP.CamlQuery";
pub const EMAIL_PROPERTIES_TYPE: &str = "SP.Utilities.EmailProperties";
pub const SPACE_ENCODING: &str = "_x0020_";
pub const CONCURRENCY_SELECT: &str = "?$select=ID";

// Defaults
pub const DEFAULT_PRODUCTION_HOST: &str = "yoursite.sharepoint.com";
pub const DEFAULT_LIST_PATH: &str = "_api/Web/Lists/";
pub const DEFAULT_CONTEXT_INFO_PATH: &str = "_api/contextinfo";
pub const DEFAULT_FILTER_OPERATOR: &str = "eq";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 19 * 60 * 1000;
pub const DEFAULT_MAX_RENEWALS: u32 = 5;
pub const DEFAULT_DEV_LOAD_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
