use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of forecast days requested by the workflow unless configured otherwise.
pub const DEFAULT_FORECAST_DAYS: u8 = 14;

/// Latitude/longitude pair as reported by the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One candidate returned by a city search.
///
/// The remote API may return duplicates; nothing here deduplicates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl CitySuggestion {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self { name: name.into(), country: country.into(), region: None, coordinates: None }
    }

    /// "Name, Country" as shown in a suggestion list.
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub city_name: String,
    pub days: u8,
}

impl ForecastRequest {
    pub fn new(city_name: impl Into<String>) -> Self {
        Self { city_name: city_name.into(), days: DEFAULT_FORECAST_DAYS }
    }

    pub fn with_days(mut self, days: u8) -> Self {
        self.days = days;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub name: String,
    pub region: Option<String>,
    pub country: String,
    pub coordinates: Option<Coordinates>,
    /// Local time at the location, verbatim from the API ("2026-10-18 09:30").
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub condition_text: String,
    pub wind_kph: f64,
    pub humidity_pct: u8,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub avg_temp_c: f64,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub condition_text: String,
    pub astro: Astro,
}

/// Current conditions plus the N-day forecast for one location.
///
/// Each successful fetch produces a fresh bundle that replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub location: ForecastLocation,
    pub current: CurrentConditions,
    /// Chronological.
    pub forecast_days: Vec<DayForecast>,
}

impl ForecastBundle {
    /// Sunrise of the first forecast day, which the main view shows next to current conditions.
    pub fn today_sunrise(&self) -> Option<&str> {
        self.forecast_days.first().map(|d| d.astro.sunrise.as_str())
    }
}
