use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, Text};
use tracing::debug;
use weatherapp_core::{Config, FetchState, WeatherResultStore};

use crate::render::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherapp", version, about = "Current weather for a city")]
pub struct Cli {
    /// WeatherAPI.com key; overrides the config file and WEATHERAPI_KEY.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com key in the config file.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name, e.g. "London".
        city: String,
    },

    /// Keep asking for a city and show its weather until an empty line or Esc.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city } => {
                let store = build_store(self.api_key)?;
                match fetch_and_wait(&store, &city).await? {
                    FetchState::Error(message) => bail!(message),
                    state => println!("{}", render(&state, chrono::Local::now())),
                }
                Ok(())
            }
            Command::Interactive => {
                let store = build_store(self.api_key)?;
                interactive(&store).await
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("WeatherAPI key:")
        .without_confirmation()
        .with_help_message("Get one at https://www.weatherapi.com/my/")
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key);
    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn build_store(api_key: Option<String>) -> Result<WeatherResultStore> {
    let config = Config::load()?;
    let api_key = match api_key {
        Some(key) => key,
        None => config.resolve_api_key()?,
    };
    debug!(base_url = config.base_url(), "using weather provider");
    Ok(WeatherResultStore::new(Arc::new(config.client()), api_key))
}

/// Issue one request and follow the state until it settles.
async fn fetch_and_wait(store: &WeatherResultStore, city: &str) -> Result<FetchState> {
    let mut rx = store.watch();
    store.request_update(city);

    loop {
        rx.changed().await.context("weather store went away")?;
        let state = rx.borrow_and_update().clone();
        match state {
            FetchState::Loading => eprintln!("Loading weather for {city}..."),
            FetchState::Idle => {}
            settled => return Ok(settled),
        }
    }
}

async fn interactive(store: &WeatherResultStore) -> Result<()> {
    loop {
        let answer = tokio::task::spawn_blocking(|| Text::new("Enter your city").prompt())
            .await
            .context("prompt task failed")?;

        let city = match answer {
            Ok(city) if city.trim().is_empty() => return Ok(()),
            Ok(city) => city.trim().to_string(),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                return Ok(());
            }
            Err(err) => return Err(err).context("Failed to read city"),
        };

        let state = fetch_and_wait(store, &city).await?;
        println!("{}\n", render(&state, chrono::Local::now()));
    }
}
