// src/lib.rs
//! US electricity net generation from the EIA v2 API, reshaped into pivot
//! tables and rendered as stacked bar charts and a state choropleth.

pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod schema;

pub use error::{ConfigError, Error, FetchError, RenderError, ReshapeError, Result};
