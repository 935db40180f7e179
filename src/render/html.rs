// src/render/html.rs
//! Self-contained HTML page: a fuel `<select>` swapping pre-rendered maps.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::choropleth::{esc, MapStyle};
use super::selector::MapSelector;
use crate::error::RenderError;
use crate::process::StateTable;

const SCRIPT: &str = r#"
(function () {
  var select = document.getElementById("fuel");
  var map = document.getElementById("map");
  var title = document.getElementById("title");
  select.addEventListener("change", function () {
    var tpl = document.getElementById("map-" + select.selectedIndex);
    if (!tpl) { return; }
    map.replaceChildren(tpl.content.cloneNode(true));
    title.textContent = tpl.dataset.title;
    document.title = tpl.dataset.title;
  });
})();
"#;

/// Render every fuel of `table` and wrap them in one page. The default view is
/// the selector's initial fuel; the others live in `<template>` elements.
pub fn render_interactive_html(
    table: &StateTable,
    style: &MapStyle,
    generated_at: DateTime<Utc>,
) -> Result<String, RenderError> {
    let mut selector = MapSelector::new(table, style.clone())?;
    let initial = selector.selected().to_string();
    let initial_title = selector.title();
    let initial_map = selector.rendering().to_string();

    let mut options = String::new();
    let mut templates = String::new();
    let fuels: Vec<String> = selector.options().to_vec();
    for (i, fuel) in fuels.iter().enumerate() {
        let selected = if *fuel == initial { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            esc(fuel),
            selected,
            esc(fuel)
        );
        let svg = selector.select(fuel)?.to_string();
        let _ = write!(
            templates,
            r#"<template id="map-{}" data-title="{}">{}</template>"#,
            i,
            esc(&selector.title()),
            svg
        );
    }

    let mut page = String::with_capacity(templates.len() + initial_map.len() + 4096);
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{}</title>", esc(&initial_title));
    page.push_str(
        "<style>body{font-family:sans-serif;margin:24px}#map svg{max-width:100%;height:auto}footer{color:#666;font-size:12px;margin-top:12px}</style>\n",
    );
    page.push_str("</head>\n<body>\n");
    let _ = writeln!(page, r#"<h1 id="title">{}</h1>"#, esc(&initial_title));
    let _ = writeln!(
        page,
        r#"<label for="fuel">Fuel </label><select id="fuel">{}</select>"#,
        options
    );
    let _ = writeln!(page, r#"<div id="map">{}</div>"#, initial_map);
    page.push_str(&templates);
    page.push('\n');
    let _ = writeln!(
        page,
        "<footer>Source: U.S. Energy Information Administration. Generated {}.</footer>",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(page, "<script>{}</script>", SCRIPT);
    page.push_str("</body>\n</html>\n");
    Ok(page)
}
