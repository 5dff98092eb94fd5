use async_trait::async_trait;
use kioskflow_types::MemberRecord;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, error};

use super::MemberDirectory;
use crate::config::IdentityConfig;
use crate::error::{KioskError, KioskResult};

/// Client for the membership identity service
#[derive(Debug)]
pub struct IdentityClient {
    http: Client,
    base_url: Url,
}

impl IdentityClient {
    pub fn new(config: &IdentityConfig) -> KioskResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.url)
            .map_err(|e| KioskError::internal(format!("identity url {}: {}", config.url, e)))?;

        Ok(Self { http, base_url })
    }

    /// `<base>/fob/{id}/user`, with the fob id percent-encoded.
    fn user_url(&self, fob_id: &str) -> KioskResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| KioskError::internal("identity url cannot be a base"))?
            .pop_if_empty()
            .extend(["fob", fob_id, "user"]);
        Ok(url)
    }
}

#[async_trait]
impl MemberDirectory for IdentityClient {
    async fn lookup(&self, fob_id: &str) -> KioskResult<MemberRecord> {
        let url = self.user_url(fob_id)?;
        debug!("Looking up fob at {}", url);

        let response = self.http.get(url).send().await.map_err(|e| {
            error!("Fob lookup failed: {}", e);
            KioskError::Http(e)
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(MemberRecord::default());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Fob lookup returned {}: {}", status, body);
            return Err(KioskError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| KioskError::invalid_response(format!("member record: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> IdentityClient {
        IdentityClient::new(&IdentityConfig {
            url: url.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_user_url() {
        let url = client("https://members.example.org/api/").user_url("0042").unwrap();
        assert_eq!(url.as_str(), "https://members.example.org/api/fob/0042/user");
    }

    #[test]
    fn test_user_url_escapes_fob() {
        let url = client("https://members.example.org").user_url("a/b").unwrap();
        assert_eq!(url.as_str(), "https://members.example.org/fob/a%2Fb/user");
    }
}
