//! City search → selection → forecast state machine.
//!
//! The workflow owns all mutable screen state and publishes a [`ViewState`]
//! snapshot after every change. Forecast and suggestion fetches are tagged
//! with a generation number; a response is applied only if no newer fetch of
//! the same kind has been issued since.

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Notify, watch},
    time::Instant,
};

use crate::{
    Config,
    debounce::Debouncer,
    model::{CitySuggestion, ForecastBundle, ForecastRequest},
    provider::WeatherProvider,
    store::{Lookup, PreferenceStore},
};

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub default_city: String,
    pub forecast_days: u8,
    pub debounce: Duration,
    /// Queries of this many characters or fewer are not searched.
    pub min_query_len: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for WorkflowSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_city: config.default_city.clone(),
            forecast_days: config.forecast_days,
            debounce: config.debounce(),
            min_query_len: config.min_query_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub city: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastState {
    Loading,
    Ready(ForecastBundle),
    Failed(FetchFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Closed,
    Open,
}

/// Everything a view needs to draw the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub forecast: ForecastState,
    pub search: SearchState,
    pub suggestions: Vec<CitySuggestion>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            forecast: ForecastState::Loading,
            search: SearchState::Closed,
            suggestions: Vec::new(),
        }
    }
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self.forecast, ForecastState::Loading)
    }

    pub fn bundle(&self) -> Option<&ForecastBundle> {
        match &self.forecast {
            ForecastState::Ready(b) => Some(b),
            _ => None,
        }
    }

    /// Suggestions are only listed while the search box is open.
    pub fn visible_suggestions(&self) -> &[CitySuggestion] {
        match self.search {
            SearchState::Open => &self.suggestions,
            SearchState::Closed => &[],
        }
    }
}

/// How a forecast load ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Failed,
    /// A newer load was issued before this one finished; its result was discarded.
    Superseded,
}

/// How a suggestion search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Query too short; nothing was fetched and the list was left as is.
    Ignored,
    Applied,
    Failed,
    Superseded,
}

#[derive(Debug, Clone)]
struct LastRequest {
    city: String,
    persist: bool,
}

#[derive(Debug)]
struct Inner {
    view: ViewState,
    forecast_generation: u64,
    search_generation: u64,
    last_request: Option<LastRequest>,
    debouncer: Debouncer<String>,
}

#[derive(Debug)]
pub struct ForecastWorkflow {
    provider: Arc<dyn WeatherProvider>,
    prefs: PreferenceStore,
    settings: WorkflowSettings,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ViewState>,
    input: Notify,
    persist_lock: tokio::sync::Mutex<()>,
}

impl ForecastWorkflow {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        prefs: PreferenceStore,
        settings: WorkflowSettings,
    ) -> Self {
        let view = ViewState::default();
        let (state_tx, _) = watch::channel(view.clone());

        Self {
            provider,
            prefs,
            inner: Mutex::new(Inner {
                view,
                forecast_generation: 0,
                search_generation: 0,
                last_request: None,
                debouncer: Debouncer::new(settings.debounce),
            }),
            settings,
            state_tx,
            input: Notify::new(),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.lock().view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state_tx.subscribe()
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.view.clone());
    }

    /// Loads the forecast for the stored last city, or the default city.
    ///
    /// Does not write the preference.
    pub async fn initialize(&self) -> LoadOutcome {
        let city = match self.prefs.last_city().await {
            Lookup::Found(city) => city,
            Lookup::NotFound => self.settings.default_city.clone(),
            Lookup::ReadError(_) => {
                tracing::debug!("last city unreadable, using default");
                self.settings.default_city.clone()
            }
        };

        tracing::info!(city = %city, "initializing forecast");
        self.load_forecast(city, false).await
    }

    pub fn open_search(&self) {
        let mut inner = self.inner.lock();
        inner.view.search = SearchState::Open;
        self.publish(&inner);
    }

    /// Hides the search box and drops any query still waiting on the debounce.
    pub fn close_search(&self) {
        let mut inner = self.inner.lock();
        inner.view.search = SearchState::Closed;
        inner.debouncer.cancel();
        self.publish(&inner);
    }

    pub fn toggle_search(&self) {
        let open = self.inner.lock().view.search == SearchState::Open;
        if open { self.close_search() } else { self.open_search() }
    }

    /// Records a keystroke. The search fires once input has been quiet for
    /// the debounce period; see [`ForecastWorkflow::run_search_driver`].
    pub fn on_search_input(&self, text: &str) {
        self.inner.lock().debouncer.feed(text.to_string());
        self.input.notify_one();
    }

    /// Fires debounced searches. Spawn once per workflow; runs until aborted.
    pub async fn run_search_driver(self: Arc<Self>) {
        loop {
            let deadline = self.inner.lock().debouncer.deadline();

            let Some(at) = deadline else {
                self.input.notified().await;
                continue;
            };

            tokio::select! {
                _ = self.input.notified() => continue,
                _ = tokio::time::sleep_until(at) => {}
            }

            let due = self.inner.lock().debouncer.take_due(Instant::now());
            if let Some(query) = due {
                let wf = Arc::clone(&self);
                tokio::spawn(async move {
                    wf.search_now(&query).await;
                });
            }
        }
    }

    /// Runs the pending debounced query right away, if there is one.
    pub async fn flush_search(&self) -> Option<SearchOutcome> {
        let query = self.inner.lock().debouncer.flush()?;
        Some(self.search_now(&query).await)
    }

    /// Fetches suggestions for `text` without debouncing.
    pub async fn search_now(&self, text: &str) -> SearchOutcome {
        if text.chars().count() <= self.settings.min_query_len {
            tracing::trace!(query = text, "query too short, not searching");
            return SearchOutcome::Ignored;
        }

        let generation = {
            let mut inner = self.inner.lock();
            inner.search_generation += 1;
            inner.search_generation
        };

        let result = self.provider.search_cities(text).await;

        let mut inner = self.inner.lock();
        if inner.search_generation != generation {
            tracing::debug!(query = text, generation, "discarding stale suggestions");
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(suggestions) => {
                tracing::debug!(query = text, count = suggestions.len(), "got suggestions");
                inner.view.suggestions = suggestions;
                self.publish(&inner);
                SearchOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(query = text, error = %e, "city search failed");
                SearchOutcome::Failed
            }
        }
    }

    /// Switches to `suggestion` and remembers it as the last city once its
    /// forecast has loaded.
    pub async fn select_city(&self, suggestion: &CitySuggestion) -> LoadOutcome {
        {
            let mut inner = self.inner.lock();
            inner.debouncer.cancel();
            // Suggestions still in flight belong to the old query.
            inner.search_generation += 1;
            inner.view.suggestions.clear();
            inner.view.search = SearchState::Closed;
            self.publish(&inner);
        }

        tracing::info!(city = %suggestion.name, "city selected");
        self.load_forecast(suggestion.name.clone(), true).await
    }

    /// Re-issues the most recent forecast load. Returns `None` if nothing has
    /// been requested yet.
    pub async fn retry(&self) -> Option<LoadOutcome> {
        let last = self.inner.lock().last_request.clone()?;
        tracing::info!(city = %last.city, "retrying forecast");
        Some(self.load_forecast(last.city, last.persist).await)
    }

    async fn load_forecast(&self, city: String, persist: bool) -> LoadOutcome {
        let generation = {
            let mut inner = self.inner.lock();
            inner.forecast_generation += 1;
            inner.last_request = Some(LastRequest { city: city.clone(), persist });
            inner.view.forecast = ForecastState::Loading;
            self.publish(&inner);
            inner.forecast_generation
        };

        let request = ForecastRequest::new(city.as_str()).with_days(self.settings.forecast_days);
        let result = self.provider.get_forecast(&request).await;

        let outcome = {
            let mut inner = self.inner.lock();
            if inner.forecast_generation != generation {
                tracing::debug!(city = %city, generation, "discarding stale forecast");
                return LoadOutcome::Superseded;
            }

            let (state, outcome) = match result {
                Ok(bundle) => (ForecastState::Ready(bundle), LoadOutcome::Ready),
                Err(e) => {
                    tracing::warn!(city = %city, error = %e, "forecast fetch failed");
                    let failure = FetchFailure { city: city.clone(), message: e.to_string() };
                    (ForecastState::Failed(failure), LoadOutcome::Failed)
                }
            };
            inner.view.forecast = state;
            self.publish(&inner);
            outcome
        };

        if outcome == LoadOutcome::Ready && persist {
            // Writes run one at a time and only for the newest load, so the
            // stored city always matches the one on screen.
            let _guard = self.persist_lock.lock().await;
            if self.inner.lock().forecast_generation == generation {
                self.prefs.remember_city(&city).await;
            } else {
                tracing::debug!(city = %city, generation, "skipping stale preference write");
            }
        }

        outcome
    }
}
