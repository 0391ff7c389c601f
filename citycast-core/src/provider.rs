use crate::{
    Config, WeatherError,
    model::{CitySuggestion, ForecastBundle, ForecastRequest},
    provider::weatherapi::WeatherApiProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod weatherapi;

/// Source of city suggestions and forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Look up cities whose name matches `query`.
    async fn search_cities(&self, query: &str) -> Result<Vec<CitySuggestion>, WeatherError>;

    /// Fetch current conditions and a `request.days` forecast for one city.
    async fn get_forecast(&self, request: &ForecastRequest)
    -> Result<ForecastBundle, WeatherError>;
}

/// Construct the weatherapi.com provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = WeatherApiProvider::from_config(api_key.to_owned(), config)?;
    Ok(Box::new(provider))
}
