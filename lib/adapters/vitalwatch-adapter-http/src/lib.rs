//! REST gateway to the monitoring backend.

mod wire;

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use vitalwatch_domain::{
    AlertLog, Anomaly, HealthCheck, PatientProfile, Reading, Summary, WatchConfig,
};
use vitalwatch_ports::{GatewayError, GatewayResult, RemoteGateway};

use crate::wire::{AcknowledgeBody, HistoryBody};

/// Which resource a 404 refers to, for lookups where "missing" is expected.
type Lookup<'a> = Option<(&'static str, &'a str)>;

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    /// `base` is the REST root, e.g. `http://localhost:5000/api`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid API base URL `{base}`"))?;
        ensure!(
            matches!(base.scheme(), "http" | "https"),
            "API base URL must be http(s), got `{base}`"
        );
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        Self::new(&config.rest_base(), config.request_timeout())
    }

    pub fn connect_from_env() -> Result<Self> {
        let config = WatchConfig::from_env().context("failed to load client configuration")?;
        Self::from_config(&config)
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    /// Endpoint URL under the REST root. Each segment is percent-encoded, so
    /// ids cannot add path components or a query.
    fn url(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Transport(format!("`{}` cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        lookup: Lookup<'_>,
    ) -> GatewayResult<T> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        debug!(path = %path, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| transport(&path, err))?;
        decode(&path, response, lookup).await
    }
}

fn transport(path: &str, err: reqwest::Error) -> GatewayError {
    warn!(path, error = %err, "Request did not complete");
    GatewayError::Transport(err.to_string())
}

async fn check(path: &str, response: Response, lookup: Lookup<'_>) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some((resource, id)) = lookup {
            return Err(GatewayError::NotFound {
                resource,
                id: id.to_string(),
            });
        }
    }
    let body = response.text().await.unwrap_or_default();
    warn!(path, status = status.as_u16(), "Backend returned an error");
    Err(GatewayError::Remote {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(
    path: &str,
    response: Response,
    lookup: Lookup<'_>,
) -> GatewayResult<T> {
    let response = check(path, response, lookup).await?;
    let bytes = response.bytes().await.map_err(|err| transport(path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode {
        endpoint: path.to_string(),
        message: err.to_string(),
    })
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn fetch_summary(&self) -> GatewayResult<Summary> {
        self.get(&["dashboard", "summary"], &[], None).await
    }

    async fn fetch_patients(&self) -> GatewayResult<Vec<PatientProfile>> {
        self.get(&["patients"], &[], None).await
    }

    async fn fetch_patient(&self, patient_id: &str) -> GatewayResult<PatientProfile> {
        self.get(&["patients", patient_id], &[], Some(("patient", patient_id)))
            .await
    }

    async fn fetch_latest_reading(&self, patient_id: &str) -> GatewayResult<Reading> {
        self.get(
            &["vitals", patient_id, "latest"],
            &[],
            Some(("reading", patient_id)),
        )
        .await
    }

    async fn fetch_history(
        &self,
        patient_id: &str,
        window_hours: u32,
    ) -> GatewayResult<Vec<Reading>> {
        let body: HistoryBody = self
            .get(
                &["vitals", patient_id, "history"],
                &[("hours", window_hours.to_string())],
                None,
            )
            .await?;
        Ok(body.into_records())
    }

    async fn fetch_active_anomalies(&self) -> GatewayResult<Vec<Anomaly>> {
        self.get(&["anomalies", "active"], &[], None).await
    }

    async fn fetch_patient_anomalies(&self, patient_id: &str) -> GatewayResult<Vec<Anomaly>> {
        self.get(&["anomalies", "patient", patient_id], &[], None)
            .await
    }

    async fn submit_acknowledgment(
        &self,
        anomaly_id: &str,
        acknowledged_by: &str,
    ) -> GatewayResult<()> {
        let url = self.url(&["anomalies", anomaly_id, "acknowledge"])?;
        let path = url.path().to_string();
        debug!(path = %path, "POST");
        let response = self
            .client
            .post(url)
            .json(&AcknowledgeBody { acknowledged_by })
            .send()
            .await
            .map_err(|err| transport(&path, err))?;
        check(&path, response, Some(("anomaly", anomaly_id))).await?;
        Ok(())
    }

    async fn fetch_alert_history(&self, days: u32) -> GatewayResult<Vec<AlertLog>> {
        self.get(&["alerts", "history"], &[("days", days.to_string())], None)
            .await
    }

    async fn check_health(&self) -> GatewayResult<HealthCheck> {
        self.get(&["health"], &[], None).await
    }
}
