use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::BackendError;
use crate::report::{ReportRow, RowId, RowStatus};

/// Remote service that owns the authoritative state of report rows
#[async_trait]
pub trait StatusBackend: Send + Sync {
    /// Move row `id` to `status` and return the row as the service now holds it
    async fn update_status(&self, id: RowId, status: RowStatus) -> Result<ReportRow, BackendError>;
}

/// HTTP client for the RPA status service
pub struct HttpStatusBackend {
    endpoint: String,
    http_client: Client,
}

impl HttpStatusBackend {
    /// Client without a request timeout; a slow call waits for its answer
    pub fn new(endpoint: &str) -> Result<Self, BackendError> {
        Self::build(endpoint, None)
    }

    /// Client whose calls fail with `BackendError::Http` after `timeout`
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        Self::build(endpoint, Some(timeout))
    }

    fn build(endpoint: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn status_url(&self, id: RowId, status: RowStatus) -> String {
        format!("{}/api/v1/rpa/{}/status/{}", self.endpoint, id, status.as_str())
    }
}

#[async_trait]
impl StatusBackend for HttpStatusBackend {
    /// PUT /api/v1/rpa/:id/status/:status
    async fn update_status(&self, id: RowId, status: RowStatus) -> Result<ReportRow, BackendError> {
        let url = self.status_url(id, status);

        let resp = self.http_client.put(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status,
                message: body,
            });
        }

        let row: ReportRow = resp
            .json()
            .await
            .map_err(|e| BackendError::Deserialize(e.to_string()))?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_endpoint_trailing_slash_removed() {
        let backend = HttpStatusBackend::new("http://rpa-api:8080/").unwrap();
        assert_eq!(backend.endpoint(), "http://rpa-api:8080");
    }

    #[test]
    fn test_status_url() {
        let backend = HttpStatusBackend::new("http://rpa-api:8080").unwrap();
        assert_eq!(
            backend.status_url(12, RowStatus::Completed),
            "http://rpa-api:8080/api/v1/rpa/12/status/Completed"
        );
    }

    #[tokio::test]
    async fn test_update_status_returns_server_row() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/rpa/3/status/Completed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 3,
                "status": "Completed",
                "name": "Ada",
                "email": "ada@example.com",
                "company": "Acme",
                "time": "2.40s"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = HttpStatusBackend::new(&mock_server.uri()).unwrap();
        let row = backend.update_status(3, RowStatus::Completed).await.unwrap();
        assert_eq!(row.id, 3);
        assert_eq!(row.status, RowStatus::Completed);
        assert_eq!(row.company, "Acme");
        assert_eq!(row.time, "2.40s");
    }

    #[tokio::test]
    async fn test_update_status_server_error_returns_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/rpa/9/status/Completed"))
            .respond_with(ResponseTemplate::new(500).set_body_string("robot crashed"))
            .mount(&mock_server)
            .await;

        let backend = HttpStatusBackend::new(&mock_server.uri()).unwrap();
        let err = backend.update_status(9, RowStatus::Completed).await.unwrap_err();
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "robot crashed");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_update_status_bad_body_returns_deserialize_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/rpa/4/status/Completed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let backend = HttpStatusBackend::new(&mock_server.uri()).unwrap();
        let err = backend.update_status(4, RowStatus::Completed).await.unwrap_err();
        assert!(matches!(err, BackendError::Deserialize(_)));
    }

    #[tokio::test]
    async fn test_slow_reply_still_completes_without_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/rpa/5/status/Completed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 5, "status": "Completed"}))
                    .set_delay(Duration::from_millis(1500)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = HttpStatusBackend::new(&mock_server.uri()).unwrap();
        let row = backend.update_status(5, RowStatus::Completed).await.unwrap();
        assert_eq!(row.id, 5);
        assert_eq!(row.status, RowStatus::Completed);
    }

    #[tokio::test]
    async fn test_configured_timeout_cuts_slow_reply() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/rpa/6/status/Completed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 6, "status": "Completed"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let backend =
            HttpStatusBackend::with_timeout(&mock_server.uri(), Duration::from_millis(200)).unwrap();
        let err = backend.update_status(6, RowStatus::Completed).await.unwrap_err();
        assert!(matches!(err, BackendError::Http(e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_unreachable_backend_returns_http_error() {
        let backend = HttpStatusBackend::with_timeout("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = backend.update_status(1, RowStatus::Completed).await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
    }
}
