use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    Config, WeatherError,
    model::{
        Astro, CitySuggestion, Coordinates, CurrentConditions, DayForecast, ForecastBundle,
        ForecastLocation, ForecastRequest,
    },
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// weatherapi.com error code for "No matching location found."
const NO_MATCHING_LOCATION: i64 = 1006;

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    /// Build a provider honoring the configured base URL and request timeout.
    pub fn from_config(api_key: String, config: &Config) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { api_key, base_url: config.base_url.trim_end_matches('/').to_string(), http })
    }

    /// Point the provider at a different API root, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        city: &str,
    ) -> Result<String, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            if status == StatusCode::BAD_REQUEST && is_no_matching_location(&body) {
                return Err(WeatherError::NotFound(city.to_string()));
            }
            return Err(WeatherError::Status { status, body: truncate_body(&body) });
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn search_cities(&self, query: &str) -> Result<Vec<CitySuggestion>, WeatherError> {
        tracing::debug!(query, "searching cities");

        let body = self.get_json("search.json", &[("q", query)], query).await?;
        let parsed: Vec<WaSearchHit> = serde_json::from_str(&body)?;

        Ok(parsed.into_iter().map(CitySuggestion::from).collect())
    }

    async fn get_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastBundle, WeatherError> {
        tracing::debug!(city = %request.city_name, days = request.days, "fetching forecast");

        let days = request.days.to_string();
        let body = self
            .get_json(
                "forecast.json",
                &[
                    ("q", request.city_name.as_str()),
                    ("days", days.as_str()),
                    ("aqi", "no"),
                    ("alerts", "no"),
                ],
                &request.city_name,
            )
            .await?;

        let parsed: WaForecastResponse = serde_json::from_str(&body)?;
        parsed.try_into()
    }
}

#[derive(Debug, Deserialize)]
struct WaErrorEnvelope {
    error: WaErrorBody,
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct WaSearchHit {
    name: String,
    #[serde(default)]
    region: String,
    country: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl From<WaSearchHit> for CitySuggestion {
    fn from(hit: WaSearchHit) -> Self {
        Self {
            name: hit.name,
            country: hit.country,
            region: non_empty(hit.region),
            coordinates: coordinates(hit.lat, hit.lon),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    country: String,
    lat: Option<f64>,
    lon: Option<f64>,
    localtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    avgtemp_c: f64,
    maxtemp_c: f64,
    mintemp_c: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaAstro {
    sunrise: String,
    sunset: String,
    moonrise: Option<String>,
    moonset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
    astro: WaAstro,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    forecast: WaForecast,
}

impl TryFrom<WaForecastResponse> for ForecastBundle {
    type Error = WeatherError;

    fn try_from(parsed: WaForecastResponse) -> Result<Self, Self::Error> {
        if parsed.forecast.forecastday.is_empty() {
            return Err(WeatherError::EmptyForecast);
        }

        let mut forecast_days: Vec<DayForecast> = parsed
            .forecast
            .forecastday
            .into_iter()
            .map(|fd| DayForecast {
                date: fd.date,
                avg_temp_c: fd.day.avgtemp_c,
                max_temp_c: fd.day.maxtemp_c,
                min_temp_c: fd.day.mintemp_c,
                condition_text: fd.day.condition.text,
                astro: Astro {
                    sunrise: fd.astro.sunrise,
                    sunset: fd.astro.sunset,
                    moonrise: fd.astro.moonrise,
                    moonset: fd.astro.moonset,
                },
            })
            .collect();
        forecast_days.sort_by_key(|d| d.date);

        let loc = parsed.location;
        let cur = parsed.current;

        Ok(ForecastBundle {
            location: ForecastLocation {
                name: loc.name,
                region: non_empty(loc.region),
                country: loc.country,
                coordinates: coordinates(loc.lat, loc.lon),
                localtime: loc.localtime,
            },
            current: CurrentConditions {
                temp_c: cur.temp_c,
                feels_like_c: cur.feelslike_c,
                condition_text: cur.condition.text,
                wind_kph: cur.wind_kph,
                humidity_pct: cur.humidity,
                last_updated: cur.last_updated,
            },
            forecast_days,
        })
    }
}

fn is_no_matching_location(body: &str) -> bool {
    serde_json::from_str::<WaErrorEnvelope>(body)
        .map(|e| e.error.code == NO_MATCHING_LOCATION)
        .unwrap_or(false)
}

fn coordinates(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinates> {
    Some(Coordinates { lat: lat?, lon: lon? })
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
