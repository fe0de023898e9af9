//! InfluxDB Write Adapter
//!
//! `PointSink` over the v2 HTTP write API:
//! `POST {host}/api/v2/write?org=..&bucket=..&precision=ns` with a line
//! protocol body and `Authorization: Token ..`.

use async_trait::async_trait;

use crate::application::ports::{PointSink, SinkError};
use crate::domain::point::Point;
use crate::infrastructure::config::InfluxSettings;

/// InfluxDB point writer.
pub struct InfluxWriter {
    http_client: reqwest::Client,
    write_url: String,
    org: String,
    database: String,
    token: String,
}

impl std::fmt::Debug for InfluxWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxWriter")
            .field("write_url", &self.write_url)
            .field("org", &self.org)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl InfluxWriter {
    /// Create a writer.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: &InfluxSettings) -> Result<Self, SinkError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            write_url: format!("{}/api/v2/write", settings.host.trim_end_matches('/')),
            org: settings.org.clone(),
            database: settings.database.clone(),
            token: settings.token().to_string(),
        })
    }
}

#[async_trait]
impl PointSink for InfluxWriter {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let body = point.to_line_protocol()?;

        let response = self
            .http_client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.database.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected { status, body });
        }

        Ok(())
    }
}
