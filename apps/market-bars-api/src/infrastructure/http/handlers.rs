//! Route Handlers

use axum::Json;
use axum::extract::{Query, State};
use serde_json::{Value, json};

use crate::application::services::BarsQuery;
use crate::domain::bars::BarPoint;
use crate::infrastructure::http::AppState;
use crate::infrastructure::http::error::ApiError;

/// `GET /health`.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /stocks/bars`.
///
/// # Errors
///
/// 400 on invalid parameters or data source failure, 500 if the result
/// cannot be normalized.
pub async fn get_stock_bars(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<BarPoint>>, ApiError> {
    let query = parse_bars_query(&params)?;
    let points = state.bars.query_bars(query).await?;
    Ok(Json(points))
}

/// Extract `symbols` (repeatable), `timeframe`, `start` and `end`.
fn parse_bars_query(params: &[(String, String)]) -> Result<BarsQuery, ApiError> {
    let symbols: Vec<String> = params
        .iter()
        .filter(|(k, _)| k == "symbols")
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if symbols.is_empty() {
        return Err(ApiError::BadRequest(
            "symbols query parameter is required".to_string(),
        ));
    }

    let timeframe = single(params, "timeframe")?.to_string();
    let start = epoch_param(params, "start")?;
    let end = epoch_param(params, "end")?;

    Ok(BarsQuery {
        symbols,
        timeframe,
        start,
        end,
    })
}

fn single<'a>(params: &'a [(String, String)], name: &str) -> Result<&'a str, ApiError> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} query parameter is required")))
}

fn epoch_param(params: &[(String, String)], name: &str) -> Result<i64, ApiError> {
    let raw = single(params, name)?;
    raw.trim().parse::<i64>().map_err(|_| {
        ApiError::BadRequest(format!(
            "{name} must be an integer number of epoch milliseconds, got '{raw}'"
        ))
    })
}
