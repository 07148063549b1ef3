//! Request/response side channel of the dashboard backend: connectivity
//! check, manual alert submission and alert export. None of it touches the
//! live feed state.

mod client;

pub use client::{BasicClient, HttpClient};

use anyhow::{Context, Result, bail};
use reqwest::{Request, Response, Url};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::model::{Alert, Severity};

pub const ALERTS_PATH: &str = "/alerts";
pub const MANUAL_ALERT_PATH: &str = "/api/manual_alert";
pub const EXPORT_ALERTS_PATH: &str = "/api/export_alerts";

#[derive(Debug, Deserialize)]
struct ManualAlertResponse {
    #[serde(default)]
    ok: bool,
    alert: Option<Alert>,
}

pub struct DashboardApi<C> {
    client: C,
    requests: reqwest::Client,
    origin: Url,
}

impl<C: HttpClient> DashboardApi<C> {
    pub fn new(client: C, origin: Url) -> Result<Self> {
        Ok(Self {
            client,
            requests: reqwest::Client::builder().build()?,
            origin,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }

    async fn send(&self, req: Request) -> Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        debug!(%method, %url, "Sending backend request");

        let response = self
            .client
            .execute(req)
            .await
            .with_context(|| format!("{method} {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("{method} {url} returned status {status}: {body}");
        }
        Ok(response)
    }

    /// Fetches the alert list as a reachability probe and returns its length.
    pub async fn check_backend(&self) -> Result<usize> {
        let req = Request::new(reqwest::Method::GET, self.endpoint(ALERTS_PATH)?);
        let alerts: Vec<serde_json::Value> = self
            .send(req)
            .await?
            .json()
            .await
            .context("backend alert list is not a JSON array")?;

        info!(alerts = alerts.len(), "Connected to backend");
        Ok(alerts.len())
    }

    /// Posts a form-encoded manual alert. Returns the alert as stored by the
    /// backend when it echoes one back.
    pub async fn submit_manual_alert(&self, message: &str, severity: Severity) -> Result<Option<Alert>> {
        let req = self
            .requests
            .post(self.endpoint(MANUAL_ALERT_PATH)?)
            .form(&[("message", message), ("severity", severity.as_str())])
            .build()?;

        let response: ManualAlertResponse = self
            .send(req)
            .await?
            .json()
            .await
            .context("unexpected manual alert response")?;

        if !response.ok {
            bail!("backend rejected the manual alert");
        }
        info!(severity = severity.as_str(), "Manual alert submitted");
        Ok(response.alert)
    }

    /// Downloads the alert export and writes it to `path`. Returns the
    /// number of bytes written.
    pub async fn export_alerts(&self, path: &Path) -> Result<usize> {
        let req = Request::new(reqwest::Method::GET, self.endpoint(EXPORT_ALERTS_PATH)?);
        let bytes = self.send(req).await?.bytes().await?;

        std::fs::write(path, &bytes)
            .with_context(|| format!("cannot write export to {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "Alerts exported");
        Ok(bytes.len())
    }
}
