// src/render/bar.rs

use std::fmt::Display;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::error::RenderError;
use crate::process::PivotTable;

const BAR_WIDTH: f64 = 0.8;
const LEGEND_FONT_PX: u32 = 14;
const LEGEND_SWATCH_PX: u32 = 14;
const LEGEND_ROW_PX: i32 = 22;
/// Narrowest plot area left of the legend.
const MIN_PLOT_PX: u32 = 320;

/// One stacked piece of one bar, in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub category: usize,
    pub bottom: f64,
    pub top: f64,
}

/// Everything drawn for one pivot column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub segments: Vec<Segment>,
}

/// Stacking geometry for a pivot table.
#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub series: Vec<Series>,
    pub y_min: f64,
    pub y_max: f64,
}

impl BarLayout {
    /// Stack the columns in table order: the first column sits on the axis.
    /// Positive values grow upward from 0, negative values downward; unset
    /// cells produce no segment.
    pub fn from_pivot<K>(table: &PivotTable<K>) -> Self {
        let n_rows = table.rows().len();
        let mut pos = vec![0.0_f64; n_rows];
        let mut neg = vec![0.0_f64; n_rows];

        let series = table
            .columns()
            .iter()
            .enumerate()
            .map(|(col, label)| {
                let segments = (0..n_rows)
                    .filter_map(|row| {
                        let v = table.get(row, col)?;
                        let base = if v >= 0.0 { &mut pos[row] } else { &mut neg[row] };
                        let bottom = *base;
                        *base += v;
                        Some(Segment {
                            category: row,
                            bottom: bottom.min(*base),
                            top: bottom.max(*base),
                        })
                    })
                    .collect();
                Series {
                    label: label.clone(),
                    segments,
                }
            })
            .collect();

        let y_max = pos.iter().copied().fold(0.0, f64::max);
        let y_min = neg.iter().copied().fold(0.0, f64::min);
        Self {
            series,
            y_min,
            y_max,
        }
    }
}

/// A fully described stacked bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// One label per bar; may contain `\n`.
    pub categories: Vec<String>,
    pub layout: BarLayout,
}

impl BarChart {
    pub fn from_pivot<K: Display>(
        table: &PivotTable<K>,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            categories: table.rows().iter().map(|k| k.to_string()).collect(),
            layout: BarLayout::from_pivot(table),
        }
    }

    /// Replace the bar labels (e.g. with wrapped ones). Extra or missing
    /// labels are ignored/left as they were.
    pub fn with_categories(mut self, labels: Vec<String>) -> Self {
        for (slot, label) in self.categories.iter_mut().zip(labels) {
            *slot = label;
        }
        self
    }

    /// Top of the value axis, padded so the tallest bar does not touch the
    /// frame.
    fn y_range(&self) -> (f64, f64) {
        let (lo, hi) = (self.layout.y_min, self.layout.y_max);
        if hi - lo <= f64::EPSILON {
            return (lo, lo + 1.0);
        }
        let pad = (hi - lo) * 0.05;
        (if lo < 0.0 { lo - pad } else { 0.0 }, hi + pad)
    }
}

/// Width in pixels the legend needs so that no label is clipped.
pub fn legend_width(labels: &[String], font_px: u32) -> u32 {
    let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    // sans-serif averages a little over half an em per glyph
    let text = longest * font_px * 3 / 5 + font_px;
    LEGEND_SWATCH_PX + 16 + text + 12
}

/// Canvas size that fits `chart`'s full legend next to a plot at least
/// `MIN_PLOT_PX` wide. Only ever widens `size`.
pub fn fitted_size(chart: &BarChart, size: (u32, u32)) -> (u32, u32) {
    let need = chart_legend_width(chart) + MIN_PLOT_PX;
    (size.0.max(need), size.1)
}

fn chart_legend_width(chart: &BarChart) -> u32 {
    let labels: Vec<String> = chart.layout.series.iter().map(|s| s.label.clone()).collect();
    legend_width(&labels, LEGEND_FONT_PX)
}

/// Draw `chart` onto `root`: the stacked plot on the left, the legend in a
/// strip on the right sized by [`legend_width`]. `root` must span the whole
/// backend and be at least as wide as [`fitted_size`]; category labels are
/// placed in backend pixels.
pub fn render_stacked_bar<DB>(
    root: &DrawingArea<DB, Shift>,
    chart: &BarChart,
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
{
    if chart.categories.is_empty() || chart.layout.series.is_empty() {
        return Err(RenderError::Empty(chart.title.clone()));
    }

    root.fill(&WHITE)?;
    let (width, _) = root.dim_in_pixel();
    let legend_w = chart_legend_width(chart);
    if width < legend_w + MIN_PLOT_PX {
        return Err(RenderError::Backend(format!(
            "canvas {}px wide cannot fit a {}px legend; use fitted_size",
            width, legend_w
        )));
    }
    let (plot_area, legend_area) = root.split_horizontally((width - legend_w) as i32);

    let n = chart.categories.len() as f64;
    let (y_lo, y_hi) = chart.y_range();
    let mut ctx = ChartBuilder::on(&plot_area)
        .caption(&chart.title, ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(n - 0.5), y_lo..y_hi)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(chart.categories.len())
        .x_label_formatter(&|_| String::new())
        .y_label_formatter(&|v| format!("{:.0}", v))
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .label_style(("sans-serif", 14))
        .draw()?;

    let half = BAR_WIDTH / 2.0;
    for (idx, series) in chart.layout.series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        ctx.draw_series(series.segments.iter().map(|s| {
            let x = s.category as f64;
            Rectangle::new([(x - half, s.bottom), (x + half, s.top)], color.filled())
        }))?;
    }

    // category labels, drawn by hand so wrapped names keep their line break
    let label_style = TextStyle::from(("sans-serif", 14).into_font())
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (i, label) in chart.categories.iter().enumerate() {
        let (px, py) = ctx.backend_coord(&(i as f64, y_lo));
        let mut text = MultiLineText::<_, String>::new((px, py + 6), label_style.clone());
        for line in label.lines() {
            text.push_line(line);
        }
        root.draw(&text)?;
    }

    // legend reads top-down in the same order the segments stack
    let font = ("sans-serif", LEGEND_FONT_PX).into_font();
    for (row, (idx, series)) in chart.layout.series.iter().enumerate().rev().enumerate() {
        let y = 40 + row as i32 * LEGEND_ROW_PX;
        let swatch = LEGEND_SWATCH_PX as i32;
        legend_area.draw(&Rectangle::new(
            [(8, y), (8 + swatch, y + swatch)],
            Palette99::pick(idx).to_rgba().filled(),
        ))?;
        legend_area.draw(&Text::new(
            series.label.clone(),
            (8 + swatch + 8, y),
            font.clone(),
        ))?;
    }

    Ok(())
}

/// Render to an in-memory SVG document, widened by [`fitted_size`] when the
/// legend needs it.
pub fn render_svg(chart: &BarChart, size: (u32, u32)) -> Result<String, RenderError> {
    let size = fitted_size(chart, size);
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
        render_stacked_bar(&root, chart)?;
        root.present()?;
    }
    Ok(buf)
}
