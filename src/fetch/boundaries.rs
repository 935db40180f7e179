// src/fetch/boundaries.rs

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::schema::{BoundaryTable, Region};

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// Decode a GeoJSON FeatureCollection into named regions.
///
/// Features without a name or without geometry are skipped; polygons that
/// are not (multi)polygons, or positions with fewer than two numbers, are a
/// [`FetchError::Geometry`].
pub fn parse_boundaries(
    body: &str,
    name_property: &str,
    endpoint: &str,
) -> Result<BoundaryTable, FetchError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|source| FetchError::Payload {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let mut regions = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get(name_property))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let Some(name) = name else {
            warn!(feature = idx, property = name_property, "feature has no name; skipping");
            continue;
        };
        let Some(geometry) = feature.geometry else {
            debug!(region = name, "feature has no geometry; skipping");
            continue;
        };

        regions.push(Region {
            name: name.to_string(),
            geometry: to_multi_polygon(name, geometry)?,
        });
    }

    Ok(BoundaryTable::from_regions(regions))
}

fn to_multi_polygon(name: &str, geometry: RawGeometry) -> Result<MultiPolygon<f64>, FetchError> {
    match geometry {
        RawGeometry::Polygon { coordinates } => {
            Ok(MultiPolygon(vec![to_polygon(name, coordinates)?]))
        }
        RawGeometry::MultiPolygon { coordinates } => coordinates
            .into_iter()
            .map(|rings| to_polygon(name, rings))
            .collect::<Result<Vec<_>, _>>()
            .map(MultiPolygon),
        RawGeometry::Unsupported => Err(FetchError::Geometry {
            region: name.to_string(),
            reason: "only Polygon and MultiPolygon are supported".to_string(),
        }),
    }
}

fn to_polygon(name: &str, rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>, FetchError> {
    let mut rings = rings.into_iter().map(|ring| to_ring(name, ring));
    let exterior = rings.next().transpose()?.ok_or_else(|| FetchError::Geometry {
        region: name.to_string(),
        reason: "polygon without an exterior ring".to_string(),
    })?;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(name: &str, positions: Vec<Vec<f64>>) -> Result<LineString<f64>, FetchError> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(FetchError::Geometry {
                region: name.to_string(),
                reason: format!("position {:?} has fewer than two coordinates", p),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}
