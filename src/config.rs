// src/config.rs

use std::{convert::Infallible, fmt, ops::RangeInclusive, path::PathBuf, str::FromStr};

use clap::{Parser, ValueEnum};
use url::Url;

use crate::error::ConfigError;
use crate::fetch::query::{DEFAULT_FUELS, DEFAULT_SECTORS};

pub const DEFAULT_BASE_URL: &str = "https://api.eia.gov/v2/";
pub const DEFAULT_BOUNDARIES_URL: &str =
    "https://raw.githubusercontent.com/PublicaMundi/MappingAPI/master/data/geojson/us-states.json";

/// EIA API key. Never printed: `Debug` and `Display` both show `***`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building request URLs only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl FromStr for ApiKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum PipelineKind {
    /// Net generation by fuel over a year range.
    General,
    /// Net generation by fuel and sector for one year.
    Sector,
    /// Net generation by fuel and state for one year, as a map.
    State,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] = [Self::General, Self::Sector, Self::State];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::General => "general",
            PipelineKind::Sector => "sector",
            PipelineKind::State => "state",
        }
    }
}

/// Fetch US net generation from the EIA API and render charts.
#[derive(Debug, Parser)]
#[command(name = "eiagen", version, about)]
pub struct Cli {
    /// EIA API key.
    #[arg(long, env = "EIA_API_KEY", hide_env_values = true)]
    pub api_key: ApiKey,

    /// Root of the EIA v2 API.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// GeoJSON FeatureCollection of US state polygons.
    #[arg(long, default_value = DEFAULT_BOUNDARIES_URL)]
    pub boundaries_url: String,

    /// Feature property holding the state name.
    #[arg(long, default_value = "name")]
    pub name_property: String,

    /// First year of the general net generation chart.
    #[arg(long, default_value_t = 2010)]
    pub start_year: i32,

    /// Last year (inclusive) of the general net generation chart.
    #[arg(long, default_value_t = 2021)]
    pub end_year: i32,

    /// Year used by the sector and state pipelines.
    #[arg(long, default_value_t = 2021)]
    pub target_year: i32,

    /// Fuel type codes to request (repeatable).
    #[arg(long = "fuel", value_name = "CODE")]
    pub fuels: Vec<String>,

    /// Sector ids to request for the sector pipeline (repeatable).
    #[arg(long = "sector", value_name = "ID")]
    pub sectors: Vec<String>,

    /// Directory the charts are written to.
    #[arg(long, default_value = "charts")]
    pub out_dir: PathBuf,

    /// Pipelines to run, in order (repeatable). Defaults to all three.
    #[arg(long = "pipeline", value_enum)]
    pub pipelines: Vec<PipelineKind>,

    /// Also write each pivot table as Parquet next to its chart.
    #[arg(long)]
    pub parquet: bool,
}

/// Validated settings handed to every pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: ApiKey,
    pub base_url: Url,
    pub boundaries_url: Url,
    pub name_property: String,
    pub years: RangeInclusive<i32>,
    pub target_year: i32,
    pub fuels: Vec<String>,
    pub sectors: Vec<String>,
    pub out_dir: PathBuf,
    pub pipelines: Vec<PipelineKind>,
    pub parquet: bool,
}

impl Config {
    /// Defaults for everything but the key; handy for tests and library use.
    pub fn with_key(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            boundaries_url: Url::parse(DEFAULT_BOUNDARIES_URL)
                .expect("default boundaries url is valid"),
            name_property: "name".to_string(),
            years: 2010..=2021,
            target_year: 2021,
            fuels: to_owned(DEFAULT_FUELS),
            sectors: to_owned(DEFAULT_SECTORS),
            out_dir: PathBuf::from("charts"),
            pipelines: PipelineKind::ALL.to_vec(),
            parquet: false,
        }
    }
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.start_year > cli.end_year {
            return Err(ConfigError::InvalidYears {
                start: cli.start_year,
                end: cli.end_year,
            });
        }

        Ok(Self {
            api_key: cli.api_key,
            base_url: parse_base(&cli.base_url)?,
            boundaries_url: parse_url(&cli.boundaries_url)?,
            name_property: cli.name_property,
            years: cli.start_year..=cli.end_year,
            target_year: cli.target_year,
            fuels: or_default(cli.fuels, DEFAULT_FUELS),
            sectors: or_default(cli.sectors, DEFAULT_SECTORS),
            out_dir: cli.out_dir,
            pipelines: if cli.pipelines.is_empty() {
                PipelineKind::ALL.to_vec()
            } else {
                cli.pipelines
            },
            parquet: cli.parquet,
        })
    }
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::Url {
        value: value.to_string(),
        source,
    })
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn parse_base(value: &str) -> Result<Url, ConfigError> {
    if value.ends_with('/') {
        parse_url(value)
    } else {
        parse_url(&format!("{}/", value))
    }
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn or_default(values: Vec<String>, default: &[&str]) -> Vec<String> {
    if values.is_empty() {
        to_owned(default)
    } else {
        values
    }
}
