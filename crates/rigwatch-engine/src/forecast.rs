//! HTTP client for the external forecast service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rigwatch_core::{ForecastError, ForecastResult, Forecaster};
use serde::Serialize;
use serde_json::Value;
use url::Url;

#[derive(Serialize)]
struct PredictRequest<'a> {
    values: &'a [f64],
}

/// Forecaster that POSTs the series to a prediction endpoint
#[derive(Debug, Clone)]
pub struct HttpForecaster {
    client: Client,
    url: Url,
}

impl HttpForecaster {
    pub fn new(url: &str, timeout: Duration) -> ForecastResult<Self> {
        let url = Url::parse(url).map_err(|e| ForecastError::Transport(format!("invalid URL: {}", e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForecastError::Transport(e.to_string()))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn transport_error(e: reqwest::Error) -> ForecastError {
    if e.is_timeout() {
        ForecastError::Timeout
    } else {
        ForecastError::Transport(e.to_string())
    }
}

#[async_trait]
impl Forecaster for HttpForecaster {
    async fn predict(&self, series: &[f64]) -> ForecastResult<Vec<f64>> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&PredictRequest { values: series })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ForecastError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ForecastError::Malformed(e.to_string()))?;
        let Value::Array(items) = body else {
            return Err(ForecastError::Malformed("expected a JSON array".into()));
        };
        let mut values = items
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| ForecastError::Malformed(format!("non-numeric element {}", v)))
            })
            .collect::<ForecastResult<Vec<f64>>>()?;
        values.truncate(series.len());
        Ok(values)
    }
}

/// Run a forecast, treating any failure as "no forecast available"
pub async fn forecast_or_empty(forecaster: Option<&dyn Forecaster>, series: &[f64]) -> Vec<f64> {
    let Some(forecaster) = forecaster else {
        tracing::debug!("No forecaster configured");
        return Vec::new();
    };
    if series.is_empty() {
        return Vec::new();
    }
    match forecaster.predict(series).await {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(error = %e, "Forecast unavailable");
            Vec::new()
        }
    }
}
