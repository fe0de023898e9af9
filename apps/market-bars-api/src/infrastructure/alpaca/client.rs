//! Historical Bars REST Client

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::{BarsRequest, HistoricalBarsPort, HistoricalDataError};
use crate::domain::bars::{BarRow, BarTable, Cell, TimestampCell};
use crate::infrastructure::config::{Credentials, DataApiSettings};

/// One page of `GET /v2/stocks/bars`.
#[derive(Debug, Deserialize)]
struct BarsPage {
    #[serde(default)]
    bars: Option<BTreeMap<String, Vec<RawBar>>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Bar as sent by the API. Cells are kept loose and converted later.
#[derive(Debug, Deserialize)]
struct RawBar {
    #[serde(default)]
    t: serde_json::Value,
    #[serde(default)]
    o: serde_json::Value,
    #[serde(default)]
    h: serde_json::Value,
    #[serde(default)]
    l: serde_json::Value,
    #[serde(default)]
    c: serde_json::Value,
    #[serde(default)]
    v: serde_json::Value,
    #[serde(default)]
    n: serde_json::Value,
    #[serde(default)]
    vw: serde_json::Value,
}

impl RawBar {
    fn into_row(self, symbol: &str) -> BarRow {
        let timestamp = match &self.t {
            serde_json::Value::String(text) => TimestampCell::from_text(text),
            other => TimestampCell::Other(Cell::from(other)),
        };
        BarRow {
            symbol: symbol.to_string(),
            timestamp,
            open: Cell::from(&self.o),
            high: Cell::from(&self.h),
            low: Cell::from(&self.l),
            close: Cell::from(&self.c),
            volume: Cell::from(&self.v),
            trade_count: Cell::from(&self.n),
            vwap: Cell::from(&self.vw),
        }
    }
}

/// Alpaca historical stock bars client.
pub struct AlpacaBarsClient {
    http_client: reqwest::Client,
    bars_url: String,
    credentials: Credentials,
    feed: Option<String>,
    page_limit: u32,
}

impl std::fmt::Debug for AlpacaBarsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaBarsClient")
            .field("bars_url", &self.bars_url)
            .field("feed", &self.feed)
            .field("page_limit", &self.page_limit)
            .finish_non_exhaustive()
    }
}

impl AlpacaBarsClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `HistoricalDataError::Transport` if the HTTP client cannot be
    /// built.
    pub fn new(
        credentials: Credentials,
        settings: &DataApiSettings,
    ) -> Result<Self, HistoricalDataError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| HistoricalDataError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            bars_url: format!("{}/v2/stocks/bars", settings.base_url.trim_end_matches('/')),
            credentials,
            feed: settings.feed.clone(),
            page_limit: settings.page_limit,
        })
    }

    async fn fetch_page(
        &self,
        request: &BarsRequest,
        page_token: Option<&str>,
    ) -> Result<BarsPage, HistoricalDataError> {
        let mut params: Vec<(&str, String)> = vec![
            ("symbols", request.symbols.join(",")),
            ("timeframe", request.timeframe.wire()),
            ("start", request.start.to_rfc3339()),
            ("end", request.end.to_rfc3339()),
            ("limit", self.page_limit.to_string()),
        ];
        if let Some(feed) = &self.feed {
            params.push(("feed", feed.clone()));
        }
        if let Some(token) = page_token {
            params.push(("page_token", token.to_string()));
        }

        let response = self
            .http_client
            .get(&self.bars_url)
            .header("APCA-API-KEY-ID", self.credentials.api_key())
            .header("APCA-API-SECRET-KEY", self.credentials.api_secret())
            .query(&params)
            .send()
            .await
            .map_err(|e| HistoricalDataError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HistoricalDataError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(HistoricalDataError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| HistoricalDataError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HistoricalBarsPort for AlpacaBarsClient {
    async fn get_bars(&self, request: &BarsRequest) -> Result<BarTable, HistoricalDataError> {
        let mut by_symbol: BTreeMap<String, Vec<RawBar>> = BTreeMap::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0u32;

        loop {
            let page = self.fetch_page(request, page_token.as_deref()).await?;
            pages += 1;

            for (symbol, bars) in page.bars.unwrap_or_default() {
                by_symbol.entry(symbol).or_default().extend(bars);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        tracing::error!(pages, token = %token, "Page token repeated");
                        return Err(HistoricalDataError::Decode(format!(
                            "pagination did not advance: page token {token} repeated"
                        )));
                    }
                    page_token = Some(token);
                }
                None => break,
            }
        }

        let rows: Vec<BarRow> = by_symbol
            .into_iter()
            .flat_map(|(symbol, bars)| {
                bars.into_iter()
                    .map(move |bar| bar.into_row(&symbol))
                    .collect::<Vec<_>>()
            })
            .collect();

        tracing::debug!(pages, rows = rows.len(), "Fetched historical bars");
        Ok(BarTable::new(rows))
    }
}
