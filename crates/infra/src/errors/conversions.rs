//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use spbridge_domain::SpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SpError);

impl From<InfraError> for SpError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SpError> for InfraError {
    fn from(value: SpError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSpError {
    fn into_sp_error(self) -> SpError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SpError */
/* -------------------------------------------------------------------------- */

impl IntoSpError for HttpError {
    fn into_sp_error(self) -> SpError {
        if self.is_timeout() {
            return SpError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SpError::Transport(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return SpError::InvalidInput(format!("HTTP request could not be built: {self}"));
        }

        if let Some(status) = self.status() {
            let url = self.url().map(ToString::to_string).unwrap_or_default();
            return SpError::HttpStatus {
                status: status.as_u16(),
                url,
                body: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        if self.is_decode() {
            return SpError::Serialization(format!("HTTP body could not be decoded: {self}"));
        }

        SpError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sp_error())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → SpError */
/* -------------------------------------------------------------------------- */

impl IntoSpError for std::io::Error {
    fn into_sp_error(self) -> SpError {
        match self.kind() {
            std::io::ErrorKind::NotFound => {
                SpError::NoLocalFixture(format!("fixture file not found: {self}"))
            }
            _ => SpError::Transport(format!("fixture read failed: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_sp_error())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_412_maps_to_precondition_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::PRECONDITION_FAILED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error =
            client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: SpError = InfraError::from(error).into();
        assert!(mapped.is_precondition_failed(), "got {mapped:?}");
    }

    #[tokio::test]
    async fn connection_refused_maps_to_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: SpError = InfraError::from(error).into();
        match mapped {
            SpError::Transport(msg) => assert!(msg.to_lowercase().contains("http")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn missing_fixture_file_maps_to_no_local_fixture() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped: SpError = InfraError::from(err).into();
        assert!(matches!(mapped, SpError::NoLocalFixture(_)));
    }
}
