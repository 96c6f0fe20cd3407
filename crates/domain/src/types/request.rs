//! Request targets and collection query options

use crate::errors::{Result, SpError};

/// Where a call is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Fully-formed URL, used as is.
    Url(String),
    /// Path joined onto `base_url`, or onto the client's base when `None`.
    Relative { base_url: Option<String>, path: String },
}

impl Location {
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Relative { base_url: None, path: path.into() }
    }

    /// Resolve against the client's base URL.
    ///
    /// # Errors
    /// Returns [`SpError::InvalidInput`] for an empty URL or path.
    pub fn resolve(&self, client_base: &str) -> Result<String> {
        match self {
            Self::Url(url) if url.is_empty() => Err(SpError::InvalidInput("No URL provided".into())),
            Self::Url(url) => Ok(url.clone()),
            Self::Relative { path, .. } if path.is_empty() => {
                Err(SpError::InvalidInput("No path provided".into()))
            }
            Self::Relative { base_url, path } => {
                Ok(format!("{}{}", base_url.as_deref().unwrap_or(client_base), path))
            }
        }
    }
}

/// Target of a read: the live location plus an optional local fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTarget {
    pub location: Location,
    /// Static JSON served in local mode (`http(s)://`, `file://` or a path).
    pub fixture: Option<String>,
}

impl ReadTarget {
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self { location: Location::url(url), fixture: None }
    }

    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self { location: Location::path(path), fixture: None }
    }

    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        if let Location::Relative { base_url, .. } = &mut self.location {
            *base_url = Some(base.into());
        }
        self
    }

    #[must_use]
    pub fn with_fixture(mut self, fixture: impl Into<String>) -> Self {
        self.fixture = Some(fixture.into());
        self
    }
}

/// OData options for reading a list's items.
///
/// Clauses are emitted only when set, in the order `$top`, `$orderby`,
/// `$select`, `$expand`, `$filter`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    pub select: Option<String>,
    pub filter: Option<String>,
    pub expand: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u32>,
    pub base_url: Option<String>,
    pub fixture: Option<String>,
}

impl CollectionQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Empty filters, as produced by the filter builder for unusable input,
    /// are treated as "no filter".
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    #[must_use]
    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn fixture(mut self, fixture: impl Into<String>) -> Self {
        self.fixture = Some(fixture.into());
        self
    }

    /// Render the query string without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        let mut parts = Vec::new();
        if let Some(top) = self.top.filter(|top| *top > 0) {
            parts.push(format!("$top={top}"));
        }
        if let Some(order_by) = non_empty(&self.order_by) {
            parts.push(format!("$orderby={order_by}"));
        }
        if let Some(select) = non_empty(&self.select) {
            parts.push(format!("$select={select}"));
        }
        if let Some(expand) = non_empty(&self.expand) {
            parts.push(format!("$expand={expand}"));
        }
        if let Some(filter) = non_empty(&self.filter) {
            parts.push(format!("$filter={filter}"));
        }
        parts.join("&")
    }
}
