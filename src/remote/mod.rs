// Remote module - client for the possessions REST backend

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::PatrimoineError;
use crate::importers::WireBatch;

const POSSESSIONS_PATH: &str = "/api/possessions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Read-only client for `GET /api/possessions`
pub struct RemoteClient {
    client: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("patrimoine/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn possessions_url(&self) -> String {
        format!("{}{}", self.base_url, POSSESSIONS_PATH)
    }

    /// Fetch the whole collection; no retries. Malformed elements are kept
    /// aside in the batch rather than failing the request.
    pub async fn fetch_possessions(&self) -> Result<WireBatch> {
        let url = self.possessions_url();
        info!("Fetching possessions from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Error fetching possessions: {}", e);
            PatrimoineError::Remote(format!("request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Possessions backend returned {}", status);
            return Err(
                PatrimoineError::Remote(format!("{} returned status {}", url, status)).into(),
            );
        }

        let values: Vec<serde_json::Value> = response
            .json()
            .await
            .context("Failed to parse possessions response")?;
        let batch = WireBatch::from_values(values);

        info!(
            "Fetched {} possessions ({} unreadable)",
            batch.len(),
            batch.rejected.len()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response, returns the base URL
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            assert!(String::from_utf8_lossy(&request).starts_with("GET /api/possessions "));

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    fn local_client(base_url: &str) -> RemoteClient {
        let client = Client::builder().no_proxy().build().unwrap();
        RemoteClient::with_client(base_url, client)
    }

    #[test]
    fn test_possessions_url_trims_slash() {
        let client = local_client("http://localhost:5000/");
        assert_eq!(
            client.possessions_url(),
            "http://localhost:5000/api/possessions"
        );
    }

    #[tokio::test]
    async fn test_fetch_possessions() {
        let base = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"libelle":"Voiture","valeur":12000,"dateDebut":"2020-05-01","dateFin":null,"tauxAmortissement":15}]"#,
        )
        .await;

        let batch = local_client(&base).fetch_possessions().await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].label, "Voiture");
        assert!(batch.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_keeps_valid_records_when_one_is_malformed() {
        let base = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"libelle":"Voiture","valeur":12000,"dateDebut":"2020-05-01"},{"libelle":"Typo","valeur":"12 000 €","dateDebut":"2021-01-01"}]"#,
        )
        .await;

        let batch = local_client(&base).fetch_possessions().await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected.len(), 1);
        assert!(batch.rejected[0].starts_with("Typo"));
    }

    #[tokio::test]
    async fn test_fetch_reports_http_status() {
        let base = serve_once("HTTP/1.1 500 Internal Server Error", "oops").await;

        let err = local_client(&base).fetch_possessions().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatrimoineError>(),
            Some(PatrimoineError::Remote(_))
        ));
        assert!(err.to_string().contains("500"));
    }
}
