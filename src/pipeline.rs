// src/pipeline.rs
//! The three fetch → reshape → render pipelines. Each returns its pivot and
//! the rendered document; nothing here touches the filesystem.

use chrono::Utc;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{EiaClient, Query};
use crate::process::{
    general_netgen_table, netgen_by_state_table, regions, sector_netgen_table,
    wrap_longest_label, PivotTable, StateTable,
};
use crate::render::{render_interactive_html, render_svg, BarChart, MapStyle};
use crate::schema::FlatRecord;

pub const BAR_SIZE: (u32, u32) = (1100, 680);
const Y_LABEL: &str = "Net generation (GWh)";

/// A rendered chart plus the table it was drawn from.
#[derive(Debug)]
pub struct Artifact<T> {
    /// File stem used for every output of this pipeline.
    pub name: &'static str,
    pub extension: &'static str,
    pub table: T,
    pub document: String,
}

impl<T> Artifact<T> {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension)
    }
}

/// National generation by fuel over `config.years`.
#[instrument(level = "info", skip_all, fields(years = ?config.years))]
pub fn general_netgen(client: &EiaClient, config: &Config) -> Result<Artifact<PivotTable<i32>>> {
    let query = Query::general(&config.fuels, config.years.clone());
    let records = client.fetch(&query)?;
    let table = general_netgen_table(&records, config.years.clone())?;

    let title = format!(
        "US net generation by source, {}-{}",
        config.years.start(),
        config.years.end()
    );
    let chart = BarChart::from_pivot(&table, title, "Year", Y_LABEL);
    let document = render_svg(&chart, BAR_SIZE)?;
    info!(bytes = document.len(), "general chart rendered");

    Ok(Artifact {
        name: "general_netgen",
        extension: "svg",
        table,
        document,
    })
}

/// National generation by fuel and sector for `config.target_year`.
#[instrument(level = "info", skip_all, fields(year = config.target_year))]
pub fn netgen_by_sector(
    client: &EiaClient,
    config: &Config,
) -> Result<Artifact<PivotTable<String>>> {
    let query = Query::by_sector(&config.fuels, &config.sectors, config.target_year);
    let records = client.fetch(&query)?;
    let table = sector_netgen_table(&records, config.target_year)?;

    let title = format!("US net generation by sector, {}", config.target_year);
    let chart = BarChart::from_pivot(&table, title, "Sector", Y_LABEL)
        .with_categories(wrap_longest_label(table.rows()));
    let document = render_svg(&chart, BAR_SIZE)?;
    info!(bytes = document.len(), "sector chart rendered");

    Ok(Artifact {
        name: "netgen_by_sector",
        extension: "svg",
        table,
        document,
    })
}

/// Per-state generation for `config.target_year`, as an interactive map.
#[instrument(level = "info", skip_all, fields(year = config.target_year))]
pub fn netgen_by_state(client: &EiaClient, config: &Config) -> Result<Artifact<StateTable>> {
    let query = Query::by_state(&config.fuels, &regions::location_codes(), config.target_year);
    let records: Vec<FlatRecord> = client.fetch(&query)?;
    let boundaries = client.fetch_boundaries(&config.boundaries_url, &config.name_property)?;
    let table = netgen_by_state_table(&records, boundaries, config.target_year)?;

    let document = render_interactive_html(&table, &MapStyle::default(), Utc::now())?;
    info!(bytes = document.len(), "state map rendered");

    Ok(Artifact {
        name: "netgen_by_state",
        extension: "html",
        table,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use crate::error::{Error, FetchError};
    use crate::fetch::tests::serve_json_routes;
    use crate::process::regions::is_continental;
    use std::net::TcpListener;
    use url::Url;

    const STATE_PAYLOAD: &str = r#"{"response":{"total":"4","data":[
        {"period":"2021","location":"TX","stateDescription":"Texas","sectorid":"99",
         "fueltypeid":"WND","fuelTypeDescription":"wind","generation":"92000"},
        {"period":"2021","location":"OR","stateDescription":"Oregon","sectorid":"99",
         "fueltypeid":"WND","fuelTypeDescription":"wind","generation":"7000"},
        {"period":"2021","location":"TX","stateDescription":"Texas","sectorid":"99",
         "fueltypeid":"SUN","fuelTypeDescription":"solar","generation":15000},
        {"period":"2021","location":"HI","stateDescription":"Hawaii","sectorid":"99",
         "fueltypeid":"SUN","fuelTypeDescription":"solar","generation":"900"}
    ]}}"#;

    fn feature(name: &str, x: f64, y: f64) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{"name":"{name}"}},"geometry":{{"type":"Polygon","coordinates":[[[{x},{y}],[{x2},{y}],[{x2},{y2}],[{x},{y2}],[{x},{y}]]]}}}}"#,
            x2 = x + 4.0,
            y2 = y + 3.0
        )
    }

    #[test]
    fn artifact_file_names() {
        let a = Artifact {
            name: "netgen_by_state",
            extension: "html",
            table: (),
            document: String::new(),
        };
        assert_eq!(a.file_name(), "netgen_by_state.html");
    }

    #[test]
    fn fetch_failure_stops_the_pipeline() -> anyhow::Result<()> {
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let mut config = Config::with_key(ApiKey::new("k"));
        config.base_url = Url::parse(&format!("http://127.0.0.1:{}/v2/", port))?;
        let client = EiaClient::new(config.base_url.clone(), config.api_key.clone())?;

        for result in [
            general_netgen(&client, &config).map(|_| ()),
            netgen_by_sector(&client, &config).map(|_| ()),
            netgen_by_state(&client, &config).map(|_| ()),
        ] {
            assert!(matches!(
                result,
                Err(Error::Fetch(FetchError::Transport { .. }))
            ));
        }
        Ok(())
    }

    #[test]
    fn state_pipeline_renders_a_continental_map() -> anyhow::Result<()> {
        let geojson = format!(
            r#"{{"type":"FeatureCollection","features":[{},{},{}]}}"#,
            feature("Texas", -104.0, 28.0),
            feature("Hawaii", -160.0, 19.0),
            feature("Oregon", -124.0, 42.0)
        );
        let root = serve_json_routes(
            vec![
                ("/v2/", STATE_PAYLOAD.to_string()),
                ("/boundaries/", geojson),
            ],
            2,
        )?;

        let mut config = Config::with_key(ApiKey::new("k"));
        config.base_url = root.join("v2/")?;
        config.boundaries_url = root.join("boundaries/us-states.json")?;
        let client = EiaClient::new(config.base_url.clone(), config.api_key.clone())?;

        let artifact = netgen_by_state(&client, &config)?;
        let table = &artifact.table;

        assert_eq!(artifact.file_name(), "netgen_by_state.html");
        assert_eq!(table.table().rows(), ["Texas", "Oregon"]);
        assert!(table.regions().iter().all(|r| is_continental(&r.name)));

        // solar (15000) before wind (49500)
        assert_eq!(table.fuels(), ["solar", "wind"]);
        let means: Vec<f64> = (0..table.fuels().len())
            .filter_map(|c| table.table().column_mean(c))
            .collect();
        assert!(means.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(
            artifact.document.matches("<option ").count(),
            table.fuels().len()
        );
        assert!(artifact.document.contains(r#"<option value="wind" selected>"#));
        assert!(!artifact.document.contains("Hawaii"));
        Ok(())
    }
}
