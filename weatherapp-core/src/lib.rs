//! Core library for `weatherapp`.
//!
//! This crate defines:
//! - The WeatherAPI.com client ([`WeatherClient`], [`WeatherApiClient`])
//! - The observable result store ([`WeatherResultStore`]) and its [`FetchState`]
//! - Shared domain models ([`WeatherRecord`])
//! - Configuration & credentials handling
//!
//! It is used by `weatherapp-cli`, but any front end that can run a tokio
//! runtime can drive the store the same way.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod state;
pub mod store;

pub use client::{WeatherApiClient, WeatherClient};
pub use config::Config;
pub use error::FetchError;
pub use model::{Condition, Current, Location, Metric, WeatherRecord};
pub use state::FetchState;
pub use store::{PendingRequest, RequestId, Subscription, WeatherResultStore};
