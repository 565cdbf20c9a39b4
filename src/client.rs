//! Remote collection client
//!
//! Issues read/create/delete requests against the collection endpoint.
//! Each call is attempted exactly once; the caller decides what to do with a
//! failure.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::ClientConfig;
use crate::error::{Result, SyncError};
use crate::record::{Draft, Record, RecordId};

/// Access to the remote collection
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Read the entire collection in server order
    async fn load(&self) -> Result<Vec<Record>>;

    /// Create a record and return it with its server-assigned id
    async fn create(&self, draft: &Draft) -> Result<Record>;

    /// Delete a record by id
    async fn remove(&self, id: &RecordId) -> Result<()>;
}

/// JSON-over-HTTP implementation of [`RemoteCollection`]
#[derive(Clone)]
pub struct HttpCollectionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCollectionClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http_client(http, config))
    }

    /// Use an already configured `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint(),
        }
    }

    /// Collection endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn record_url(&self, id: &RecordId) -> String {
        format!("{}/{}", self.endpoint, id.to_path_segment())
    }
}

/// Read a response body that is about to be reported as an error
async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl RemoteCollection for HttpCollectionClient {
    async fn load(&self) -> Result<Vec<Record>> {
        tracing::debug!(endpoint = %self.endpoint, "GET collection");

        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("Failed to reach {}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(SyncError::Network(format!(
                "GET {} returned {}: {}",
                self.endpoint, status, body
            )));
        }

        let bytes = response.bytes().await?;
        let records: Vec<Record> = serde_json::from_slice(&bytes)?;
        Ok(records)
    }

    async fn create(&self, draft: &Draft) -> Result<Record> {
        tracing::debug!(endpoint = %self.endpoint, name = %draft.name, "POST record");

        let response = self
            .http
            .post(&self.endpoint)
            .json(draft)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("Failed to reach {}: {}", self.endpoint, e)))?;

        let status = response.status();
        match status {
            s if s.is_success() => {
                let bytes = response.bytes().await?;
                let record: Record = serde_json::from_slice(&bytes)?;
                Ok(record)
            }
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = error_body(response).await;
                Err(SyncError::Validation(format!("{}: {}", status, body)))
            }
            _ => {
                let body = error_body(response).await;
                Err(SyncError::Network(format!(
                    "POST {} returned {}: {}",
                    self.endpoint, status, body
                )))
            }
        }
    }

    async fn remove(&self, id: &RecordId) -> Result<()> {
        let url = self.record_url(id);
        tracing::debug!(url = %url, "DELETE record");

        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(SyncError::NotFound(id.clone())),
            _ => {
                let body = error_body(response).await;
                Err(SyncError::Network(format!(
                    "DELETE {} returned {}: {}",
                    url, status, body
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{routing::get, Router};

    use super::*;
    use crate::backend::{spawn_local, CollectionStore};

    fn client_for(addr: SocketAddr) -> HttpCollectionClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpCollectionClient::with_http_client(
            http,
            &ClientConfig::with_base_url(&format!("http://{}", addr)),
        )
    }

    #[tokio::test]
    async fn test_load_returns_server_order() {
        let addr = spawn_local(CollectionStore::seeded()).await;
        let client = client_for(addr);

        let records = client.load().await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pele", "Diego Maradona", "Johan Cruyff"]);
    }

    #[tokio::test]
    async fn test_create_returns_assigned_id() {
        let store = CollectionStore::seeded();
        let addr = spawn_local(store.clone()).await;
        let client = client_for(addr);

        let record = client.create(&Draft::new("Eusebio", "Portugal")).await.unwrap();
        assert_eq!(record, Record::new(4, "Eusebio", "Portugal"));
        assert_eq!(store.list().await.last(), Some(&record));
    }

    #[tokio::test]
    async fn test_server_rejection_is_validation_error() {
        let addr = spawn_local(CollectionStore::new()).await;
        let client = client_for(addr);

        let err = client.create(&Draft::new("", "Brazil")).await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_absent_is_not_found() {
        let store = CollectionStore::seeded();
        let addr = spawn_local(store.clone()).await;
        let client = client_for(addr);

        client.remove(&RecordId::Number(1)).await.unwrap();
        let err = client.remove(&RecordId::Number(1)).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(RecordId::Number(1))));
        assert_eq!(store.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(addr).load().await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/athletes", get(|| async { "<html>oops</html>" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = client_for(addr).load().await.unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[tokio::test]
    async fn test_controller_round_trip_over_http() {
        let store = CollectionStore::seeded();
        let addr = spawn_local(store.clone()).await;
        let controller = crate::sync::SyncController::new(std::sync::Arc::new(client_for(addr)));

        assert_eq!(controller.load().await.unwrap().len(), 3);
        let added = controller.add(Draft::new("Pele", "Brazil")).await.unwrap();
        controller.remove(&RecordId::Number(2)).await.unwrap();

        let reloaded = controller.load().await.unwrap();
        assert_eq!(reloaded, store.list().await);
        assert_eq!(reloaded.last(), Some(&added));
        assert!(!reloaded.iter().any(|r| r.id == RecordId::Number(2)));
    }
}
