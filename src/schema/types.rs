// src/schema/types.rs

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// One observation from the electric-power-operational-data endpoint.
///
/// Field names follow the EIA v2 JSON keys. Sector and state fields are only
/// present when the query faceted on them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct FlatRecord {
    #[serde(deserialize_with = "de::year")]
    pub period: i32,
    #[serde(rename = "fueltypeid")]
    pub fuel_type_id: String,
    #[serde(rename = "fuelTypeDescription")]
    pub fuel_description: String,
    /// Net generation in GWh (EIA reports "thousand megawatthours").
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub generation: Option<f64>,
    #[serde(rename = "sectorid", default, deserialize_with = "de::lenient_string")]
    pub sector_id: Option<String>,
    #[serde(rename = "sectorDescription", default)]
    pub sector_description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "stateDescription", default)]
    pub state_description: Option<String>,
    #[serde(rename = "generation-units", default)]
    pub units: Option<String>,
}

impl FlatRecord {
    pub fn new(
        period: i32,
        fuel_type_id: impl Into<String>,
        fuel_description: impl Into<String>,
        generation: Option<f64>,
    ) -> Self {
        Self {
            period,
            fuel_type_id: fuel_type_id.into(),
            fuel_description: fuel_description.into(),
            generation,
            sector_id: None,
            sector_description: None,
            location: None,
            state_description: None,
            units: None,
        }
    }

    pub fn with_sector(mut self, id: impl Into<String>, description: impl Into<String>) -> Self {
        self.sector_id = Some(id.into());
        self.sector_description = Some(description.into());
        self
    }

    pub fn with_state(mut self, location: impl Into<String>, description: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self.state_description = Some(description.into());
        self
    }
}

/// A named polygon from the boundary source.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Boundary regions in source order, one entry per distinct name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryTable {
    regions: Vec<Region>,
}

impl BoundaryTable {
    /// Build the table, merging the polygons of regions that share a name
    /// (some sources split a state into several features).
    pub fn from_regions(regions: impl IntoIterator<Item = Region>) -> Self {
        let mut merged: Vec<Region> = Vec::new();
        for region in regions {
            match merged.iter_mut().find(|r| r.name == region.name) {
                Some(existing) => existing.geometry.0.extend(region.geometry.0),
                None => merged.push(region),
            }
        }
        Self { regions: merged }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }
}

/// EIA mixes JSON numbers and numeric strings for the same field.
mod de {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Num(f64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Int(i64),
        Text(String),
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        match Code::deserialize(d)? {
            Code::Int(v) => i32::try_from(v).map_err(D::Error::custom),
            Code::Text(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| D::Error::custom(format!("period `{}` is not a year", s))),
        }
    }

    pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Number>::deserialize(d)? {
            None => Ok(None),
            Some(Number::Num(v)) => Ok(Some(v)),
            Some(Number::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(Number::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("`{}` is not a number", s))),
        }
    }

    pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Code>::deserialize(d)?.map(|c| match c {
            Code::Int(v) => v.to_string(),
            Code::Text(s) => s,
        }))
    }
}
