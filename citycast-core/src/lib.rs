//! Core library for `citycast`.
//!
//! This crate defines:
//! - Configuration handling
//! - The weather provider abstraction and its weatherapi.com implementation
//! - Last-city persistence over an async key-value store
//! - The forecast workflow: debounced city search, selection, forecast loading
//!
//! It is used by `citycast-cli`, but any front end can drive the workflow and
//! render its [`ViewState`].

pub mod config;
pub mod debounce;
pub mod error;
pub mod model;
pub mod provider;
pub mod store;
pub mod workflow;

pub use config::Config;
pub use error::{StoreError, WeatherError};
pub use model::{CitySuggestion, DayForecast, ForecastBundle, ForecastRequest};
pub use provider::WeatherProvider;
pub use store::{FileStore, KeyValueStore, Lookup, MemoryStore, PreferenceStore};
pub use workflow::{
    FetchFailure, ForecastState, ForecastWorkflow, LoadOutcome, SearchOutcome, SearchState,
    ViewState, WorkflowSettings,
};
