// src/render/selector.rs

use tracing::debug;

use super::choropleth::{map_title, render_map_svg, MapStyle};
use crate::error::RenderError;
use crate::process::StateTable;

/// Receives the label picked in a selection widget.
pub trait SelectionHandler {
    fn on_select(&mut self, label: &str) -> Result<(), RenderError>;
}

/// Redraws the choropleth for whichever fuel is selected.
///
/// Each redraw depends only on the label, so selecting the same label twice
/// leaves an identical map. A failed selection keeps the previous one.
pub struct MapSelector<'a> {
    table: &'a StateTable,
    style: MapStyle,
    selected: String,
    rendering: String,
}

impl<'a> MapSelector<'a> {
    /// Starts on the last column, which after the mean sort is the largest
    /// generator.
    pub fn new(table: &'a StateTable, style: MapStyle) -> Result<Self, RenderError> {
        let first = table
            .fuels()
            .last()
            .cloned()
            .ok_or_else(|| RenderError::Empty(format!("state table {}", table.year())))?;
        let rendering = render_map_svg(table, &first, &style)?;
        Ok(Self {
            table,
            style,
            selected: first,
            rendering,
        })
    }

    pub fn options(&self) -> &[String] {
        self.table.fuels()
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn rendering(&self) -> &str {
        &self.rendering
    }

    pub fn title(&self) -> String {
        map_title(&self.selected, self.table.year())
    }

    pub fn select(&mut self, label: &str) -> Result<&str, RenderError> {
        let rendering = render_map_svg(self.table, label, &self.style)?;
        debug!(fuel = label, bytes = rendering.len(), "map redrawn");
        self.selected = label.to_string();
        self.rendering = rendering;
        Ok(&self.rendering)
    }
}

impl SelectionHandler for MapSelector<'_> {
    fn on_select(&mut self, label: &str) -> Result<(), RenderError> {
        self.select(label).map(|_| ())
    }
}
