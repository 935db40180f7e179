// src/fetch/query.rs

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use url::Url;

use crate::config::ApiKey;

/// Dataset route under the v2 API root.
pub const DATASET: &str = "electricity/electric-power-operational-data/data/";

/// Fuel type codes requested by default: coal, natural gas, nuclear,
/// conventional hydro, wind, solar, petroleum liquids, geothermal, wood.
pub static DEFAULT_FUELS: &[&str] = &["COW", "NG", "NUC", "HYC", "WND", "SUN", "PEL", "GEO", "WWW"];

/// Sector ids requested by the sector pipeline: electric utility,
/// independent power producers, commercial, industrial.
pub static DEFAULT_SECTORS: &[&str] = &["1", "94", "96", "97"];

/// The "all sectors" aggregate.
pub const ALL_SECTORS: &str = "99";

/// EIA caps a single response at 5000 rows.
pub const MAX_LENGTH: usize = 5000;

/// One request against [`DATASET`].
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    frequency: String,
    data: Vec<String>,
    facets: BTreeMap<String, Vec<String>>,
    start: Option<String>,
    end: Option<String>,
    /// Sort columns, each descending.
    sort_desc: Vec<String>,
    offset: usize,
    length: usize,
}

impl Query {
    /// Annual generation, newest period first.
    pub fn annual_generation() -> Self {
        Self {
            frequency: "annual".to_string(),
            data: vec!["generation".to_string()],
            facets: BTreeMap::new(),
            start: None,
            end: None,
            sort_desc: vec!["period".to_string()],
            offset: 0,
            length: MAX_LENGTH,
        }
    }

    pub fn facet<S: AsRef<str>>(mut self, name: &str, values: &[S]) -> Self {
        self.facets.insert(
            name.to_string(),
            values.iter().map(|v| v.as_ref().to_string()).collect(),
        );
        self
    }

    pub fn years(mut self, years: RangeInclusive<i32>) -> Self {
        self.start = Some(years.start().to_string());
        self.end = Some(years.end().to_string());
        self
    }

    /// National totals across all sectors for a year range.
    pub fn general<S: AsRef<str>>(fuels: &[S], years: RangeInclusive<i32>) -> Self {
        Self::annual_generation()
            .facet("fueltypeid", fuels)
            .facet("location", &["US"])
            .facet("sectorid", &[ALL_SECTORS])
            .years(years)
    }

    /// National totals split by sector for one year.
    pub fn by_sector<S: AsRef<str>, T: AsRef<str>>(fuels: &[S], sectors: &[T], year: i32) -> Self {
        Self::annual_generation()
            .facet("fueltypeid", fuels)
            .facet("location", &["US"])
            .facet("sectorid", sectors)
            .years(year..=year)
    }

    /// All-sector totals per state for one year.
    pub fn by_state<S: AsRef<str>, T: AsRef<str>>(fuels: &[S], locations: &[T], year: i32) -> Self {
        Self::annual_generation()
            .facet("fueltypeid", fuels)
            .facet("location", locations)
            .facet("sectorid", &[ALL_SECTORS])
            .years(year..=year)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Query string pairs, without the key, in a stable order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut out = vec![("frequency".to_string(), self.frequency.clone())];
        for (i, d) in self.data.iter().enumerate() {
            out.push((format!("data[{}]", i), d.clone()));
        }
        for (name, values) in &self.facets {
            for v in values {
                out.push((format!("facets[{}][]", name), v.clone()));
            }
        }
        if let Some(start) = &self.start {
            out.push(("start".to_string(), start.clone()));
        }
        if let Some(end) = &self.end {
            out.push(("end".to_string(), end.clone()));
        }
        for (i, column) in self.sort_desc.iter().enumerate() {
            out.push((format!("sort[{}][column]", i), column.clone()));
            out.push((format!("sort[{}][direction]", i), "desc".to_string()));
        }
        out.push(("offset".to_string(), self.offset.to_string()));
        out.push(("length".to_string(), self.length.to_string()));
        out
    }

    /// Full request URL, key included. Never log this.
    pub fn to_url(&self, base: &Url, key: &ApiKey) -> Result<Url, url::ParseError> {
        self.build(base, key.expose())
    }

    /// Request URL with the key replaced by `***`, safe for logs.
    pub fn redacted_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        self.build(base, "***")
    }

    fn build(&self, base: &Url, key: &str) -> Result<Url, url::ParseError> {
        let mut url = base.join(DATASET)?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("api_key", key);
            for (k, v) in self.pairs() {
                q.append_pair(&k, &v);
            }
            q.append_pair("out", "json");
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.eia.gov/v2/").unwrap()
    }

    #[test]
    fn general_query_carries_every_facet() {
        let q = Query::general(&["SUN", "WND"], 2010..=2021);
        let pairs = q.pairs();
        let has = |k: &str, v: &str| pairs.iter().any(|(a, b)| a == k && b == v);

        assert!(has("frequency", "annual"));
        assert!(has("data[0]", "generation"));
        assert!(has("facets[fueltypeid][]", "SUN"));
        assert!(has("facets[fueltypeid][]", "WND"));
        assert!(has("facets[location][]", "US"));
        assert!(has("facets[sectorid][]", "99"));
        assert!(has("start", "2010"));
        assert!(has("end", "2021"));
        assert!(has("sort[0][direction]", "desc"));
        assert!(has("length", "5000"));
    }

    #[test]
    fn sector_and_state_queries_pin_one_year() {
        let q = Query::by_sector(&["COW"], &["1", "94"], 2021);
        assert!(q.pairs().contains(&("start".into(), "2021".into())));
        assert!(q.pairs().contains(&("end".into(), "2021".into())));
        assert!(q.pairs().contains(&("facets[sectorid][]".into(), "94".into())));

        let q = Query::by_state(&["COW"], &["TX", "DC"], 2020);
        assert!(q.pairs().contains(&("facets[location][]".into(), "DC".into())));
        assert!(q.pairs().contains(&("facets[sectorid][]".into(), "99".into())));
    }

    #[test]
    fn url_targets_dataset_and_redacts_key() -> anyhow::Result<()> {
        let q = Query::general(&["SUN"], 2020..=2021);
        let key = ApiKey::new("abc123");

        let url = q.to_url(&base(), &key)?;
        assert_eq!(
            url.path(),
            "/v2/electricity/electric-power-operational-data/data/"
        );
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "api_key" && v == "abc123"));
        assert!(url.query_pairs().any(|(k, v)| k == "out" && v == "json"));

        let redacted = q.redacted_url(&base())?;
        assert!(!redacted.as_str().contains("abc123"));
        assert!(redacted.query_pairs().any(|(k, v)| k == "api_key" && v == "***"));
        Ok(())
    }
}
