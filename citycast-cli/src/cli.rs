use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use citycast_core::{
    Config, FileStore, ForecastWorkflow, LoadOutcome, Lookup, PreferenceStore, SearchOutcome,
    WorkflowSettings, provider::provider_from_config,
};
use inquire::{Confirm, Password, Select, Text};

use crate::render::{render_state, render_suggestions};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "City weather lookup")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the weatherapi.com API key and default city.
    Configure,

    /// Show the forecast for the last city, or for CITY if given.
    Show {
        /// City name; the first search match is selected and remembered.
        city: Option<String>,
    },

    /// Search for a city interactively and show its forecast.
    Search {
        /// Initial query; prompted for if absent.
        query: Option<String>,
    },

    /// Print the remembered city.
    Last,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;

        match self.command {
            Command::Configure => configure(config, &config_path),
            Command::Show { city } => show(&config, city).await,
            Command::Search { query } => search(&config, query).await,
            Command::Last => last(&config).await,
        }
    }
}

fn configure(mut config: Config, path: &std::path::Path) -> anyhow::Result<()> {
    let api_key = Password::new("weatherapi.com API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let default_city = Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Failed to read default city")?;
    config.default_city = default_city;

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn preferences(config: &Config) -> anyhow::Result<PreferenceStore> {
    let path = config.store_file_path()?;
    tracing::debug!(path = %path.display(), "using preference file");
    Ok(PreferenceStore::new(Arc::new(FileStore::new(path))))
}

fn build_workflow(config: &Config) -> anyhow::Result<Arc<ForecastWorkflow>> {
    let provider = provider_from_config(config)?;
    Ok(Arc::new(ForecastWorkflow::new(
        Arc::from(provider),
        preferences(config)?,
        WorkflowSettings::from(config),
    )))
}

async fn show(config: &Config, city: Option<String>) -> anyhow::Result<()> {
    let wf = build_workflow(config)?;

    let outcome = match city {
        None => wf.initialize().await,
        Some(city) => {
            match wf.search_now(&city).await {
                SearchOutcome::Ignored => {
                    return Err(anyhow!(
                        "City name '{city}' is too short; use more than {} characters.",
                        config.min_query_len
                    ));
                }
                SearchOutcome::Failed => {
                    return Err(anyhow!("City search for '{city}' failed; see log output."));
                }
                SearchOutcome::Applied | SearchOutcome::Superseded => {}
            }

            let suggestions = wf.snapshot().suggestions;
            let first = suggestions
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("No city matching '{city}'."))?;
            if suggestions.len() > 1 {
                print!("Matches:\n{}", render_suggestions(&suggestions));
                println!("Using {}\n", first.label());
            }
            wf.select_city(&first).await
        }
    };

    print!("{}", render_state(&wf.snapshot()));
    if outcome == LoadOutcome::Failed {
        return Err(anyhow!("Forecast unavailable."));
    }
    Ok(())
}

async fn search(config: &Config, query: Option<String>) -> anyhow::Result<()> {
    let wf = build_workflow(config)?;
    let driver = tokio::spawn(Arc::clone(&wf).run_search_driver());
    let mut updates = wf.subscribe();
    // Long enough for the debounce to fire and the request to come back.
    let wait = wf.settings().debounce + Duration::from_secs(config.request_timeout_secs);

    wf.open_search();
    let mut next_query = query;

    let selection = loop {
        let query = match next_query.take() {
            Some(q) => q,
            None => Text::new("Search city:").prompt().context("Failed to read query")?,
        };

        if query.chars().count() <= wf.settings().min_query_len {
            println!("Type more than {} characters.", wf.settings().min_query_len);
            continue;
        }

        updates.borrow_and_update();
        wf.on_search_input(&query);

        if tokio::time::timeout(wait, updates.changed()).await.is_err() {
            println!("City search for '{query}' got no response; see log output.");
            continue;
        }

        let suggestions = wf.snapshot().visible_suggestions().to_vec();
        if suggestions.is_empty() {
            println!("No city matching '{query}'.");
            continue;
        }

        let labels: Vec<String> = suggestions.iter().map(|s| s.label()).collect();
        let picked = Select::new("Pick a city:", labels)
            .raw_prompt_skippable()
            .context("Failed to read selection")?;
        match picked {
            Some(option) => break suggestions[option.index].clone(),
            None => continue,
        }
    };

    driver.abort();

    let mut outcome = wf.select_city(&selection).await;
    print!("{}", render_state(&wf.snapshot()));

    while outcome == LoadOutcome::Failed {
        let again = Confirm::new("Retry?").with_default(true).prompt().unwrap_or(false);
        if !again {
            return Err(anyhow!("Forecast unavailable."));
        }
        outcome = wf.retry().await.unwrap_or(LoadOutcome::Failed);
        print!("{}", render_state(&wf.snapshot()));
    }

    Ok(())
}

async fn last(config: &Config) -> anyhow::Result<()> {
    match preferences(config)?.last_city().await {
        Lookup::Found(city) => println!("{city}"),
        Lookup::NotFound => {
            println!("No city remembered yet; showing {} by default.", config.default_city)
        }
        Lookup::ReadError(e) => {
            return Err(anyhow!(e).context("Failed to read the remembered city"));
        }
    }
    Ok(())
}
