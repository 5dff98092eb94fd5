use async_trait::async_trait;
use kioskflow_types::{
    EndDepositRequest, EndMembershipRequest, MachineStatus, SettlementResponse,
};
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use super::SettlementBackend;
use crate::config::BackendConfig;
use crate::error::{KioskError, KioskResult};
use crate::flow::product::MEMBERSHIP_FINALIZE_ENDPOINT;

/// HTTP client for the settlement backend
pub struct BackendClient {
    http: Client,
    config: BackendConfig,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("url", &self.config.url)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new backend client from config
    pub fn new(config: &BackendConfig) -> KioskResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    /// POST a JSON body and check the status
    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> KioskResult<Response> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            KioskError::Http(e)
        })?;

        check_status(response).await
    }

    async fn post_empty(&self, path: &str) -> KioskResult<()> {
        self.post(path, &serde_json::json!({})).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> KioskResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!("Backend returned {}: {}", status, body);
    Err(KioskError::Backend {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SettlementBackend for BackendClient {
    async fn stats(&self) -> KioskResult<MachineStatus> {
        let url = self.url("stats");
        let response = self.http.get(&url).send().await?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| KioskError::invalid_response(format!("stats: {}", e)))
    }

    async fn start_deposit(&self) -> KioskResult<()> {
        info!("Opening deposit");
        self.post_empty("deposit/start").await
    }

    async fn cancel_deposit(&self) -> KioskResult<()> {
        info!("Cancelling deposit");
        self.post_empty("deposit/cancel").await
    }

    async fn end_deposit(&self, endpoint: &str, recipient: &str) -> KioskResult<SettlementResponse> {
        info!("Finalizing deposit via {} for {}", endpoint, recipient);
        let request = EndDepositRequest {
            recipient: recipient.to_string(),
        };
        let response = self.post(endpoint, &request).await?;

        response.json().await.map_err(|e| {
            error!("Failed to parse settlement response: {}", e);
            KioskError::invalid_response(format!("settlement: {}", e))
        })
    }

    async fn end_membership(&self, fob_id: &str) -> KioskResult<()> {
        info!("Finalizing membership deposit for fob {}", fob_id);
        let request = EndMembershipRequest {
            fob_key: fob_id.to_string(),
        };
        self.post(MEMBERSHIP_FINALIZE_ENDPOINT, &request).await?;
        Ok(())
    }

    async fn empty_payout(&self) -> KioskResult<()> {
        info!("Emptying payout");
        self.post_empty("payout/empty").await
    }

    async fn reset_machine(&self) -> KioskResult<()> {
        info!("Resetting machine state");
        self.post_empty("machine/state/reset").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = BackendClient::new(&BackendConfig {
            url: "http://kiosk.local:3000/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.url("stats"), "http://kiosk.local:3000/stats");
        assert_eq!(
            client.url("/deposit/end/matic"),
            "http://kiosk.local:3000/deposit/end/matic"
        );
    }
}
