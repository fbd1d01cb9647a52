use super::{AlertGetter, AlertQueryError, RawAlert};
use async_trait::async_trait;
use serde::Deserialize;

const ALERTS_PATH: &str = "/api/v1/alerts";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<AlertsData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct AlertsData {
    #[serde(default)]
    alerts: Vec<RawAlert>,
}

/// Reads alerts from a Prometheus-compatible `/api/v1/alerts` endpoint
pub struct PrometheusAlertGetter {
    client: reqwest::Client,
    url: String,
}

impl PrometheusAlertGetter {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        PrometheusAlertGetter {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), ALERTS_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertGetter for PrometheusAlertGetter {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn alerts(&self) -> Result<Vec<RawAlert>, AlertQueryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(AlertQueryError::Transport)?;
        let status = response.status();
        tracing::debug!(%status, "received alerts response");
        let body = response.text().await.map_err(AlertQueryError::Transport)?;
        if !status.is_success() {
            // Prometheus reports query errors in an envelope with a non-2xx status
            return Err(match parse_alerts_response(&body) {
                Err(err @ AlertQueryError::Api { .. }) => err,
                _ => AlertQueryError::Status(status.as_u16()),
            });
        }
        parse_alerts_response(&body)
    }
}

/// Decodes the alerting API envelope, turning error envelopes into
/// [`AlertQueryError::Api`].
pub fn parse_alerts_response(body: &str) -> Result<Vec<RawAlert>, AlertQueryError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    if response.status != "success" {
        return Err(AlertQueryError::Api {
            error_type: response.error_type.unwrap_or(response.status),
            message: response.error.unwrap_or_default(),
        });
    }
    Ok(response.data.map(|d| d.alerts).unwrap_or_default())
}
