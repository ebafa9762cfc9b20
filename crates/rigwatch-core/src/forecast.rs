//! Forecaster trait - the black-box series predictor

use async_trait::async_trait;

use crate::error::ForecastResult;

/// Predicts the continuation of a numeric series.
///
/// The result may be shorter than the input, never longer.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn predict(&self, series: &[f64]) -> ForecastResult<Vec<f64>>;
}
