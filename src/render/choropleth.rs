// src/render/choropleth.rs
//! Deterministic SVG choropleth. No I/O, no fonts: same table and fuel in,
//! identical bytes out.

use std::fmt::Write as _;

use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use plotters::style::RGBColor;

use crate::error::RenderError;
use crate::process::StateTable;

const TITLE_BAND: f64 = 48.0;
const LEGEND_BAND: f64 = 64.0;
const MARGIN: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle {
    pub width: u32,
    pub height: u32,
    /// Colour of the smallest value in the active column.
    pub low: RGBColor,
    /// Colour of the largest value in the active column.
    pub high: RGBColor,
    /// Fill for regions without data.
    pub missing: RGBColor,
    pub stroke: RGBColor,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            width: 960,
            height: 620,
            low: RGBColor(255, 247, 188),
            high: RGBColor(153, 52, 4),
            missing: RGBColor(217, 217, 217),
            stroke: RGBColor(255, 255, 255),
        }
    }
}

/// Title shown above the map for `fuel`.
pub fn map_title(fuel: &str, year: i32) -> String {
    format!("Net generation from {} by state, {} (GWh)", fuel, year)
}

/// Draw every region of `table` coloured by the `fuel` column.
pub fn render_map_svg(
    table: &StateTable,
    fuel: &str,
    style: &MapStyle,
) -> Result<String, RenderError> {
    let column = table
        .column(fuel)
        .ok_or_else(|| RenderError::UnknownColumn(fuel.to_string()))?;
    if column.is_empty() {
        return Err(RenderError::Empty(fuel.to_string()));
    }

    let bounds = column
        .iter()
        .filter_map(|(r, _)| r.geometry.bounding_rect())
        .reduce(union)
        .ok_or_else(|| RenderError::Empty(fuel.to_string()))?;
    let projection = Projection::fit(bounds, style);

    let (lo, hi) = column
        .iter()
        .filter_map(|(_, v)| *v)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let scale = ColorScale {
        lo,
        hi,
        low: style.low,
        high: style.high,
    };

    let (w, h) = (style.width as f64, style.height as f64);
    let title = map_title(fuel, table.year());
    let mut svg = String::with_capacity(64 * 1024);

    // fmt::Write into a String cannot fail
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
    );
    let _ = write!(svg, "<title>{}</title>", esc(&title));
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="30" text-anchor="middle" font-size="20">{}</text>"#,
        w / 2.0,
        esc(&title)
    );

    let _ = write!(
        svg,
        r#"<g stroke="{}" stroke-width="0.75" stroke-linejoin="round">"#,
        hex(style.stroke)
    );
    for (region, value) in &column {
        let fill = value.map(|v| scale.color(v)).unwrap_or(style.missing);
        let tooltip = match value {
            Some(v) => format!("{}: {:.1} GWh", region.name, v),
            None => format!("{}: no data", region.name),
        };
        let _ = write!(
            svg,
            r#"<path d="{}" fill="{}" fill-rule="evenodd"><title>{}</title></path>"#,
            projection.path(&region.geometry),
            hex(fill),
            esc(&tooltip)
        );
    }
    svg.push_str("</g>");

    write_legend(&mut svg, &scale, style);
    svg.push_str("</svg>");
    Ok(svg)
}

/// Colour bar with min/max labels along the bottom edge.
fn write_legend(svg: &mut String, scale: &ColorScale, style: &MapStyle) {
    let (w, h) = (style.width as f64, style.height as f64);
    let bar_w = (w * 0.4).min(360.0);
    let x = (w - bar_w) / 2.0;
    let y = h - LEGEND_BAND + 16.0;

    let _ = write!(
        svg,
        r#"<defs><linearGradient id="scale" x1="0" x2="1" y1="0" y2="0"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient></defs>"#,
        hex(scale.low),
        hex(scale.high)
    );
    let _ = write!(
        svg,
        r##"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="12" fill="url(#scale)" stroke="#999" stroke-width="0.5"/>"##
    );
    let (lo, hi) = if scale.has_range() {
        (format!("{:.0}", scale.lo), format!("{:.0}", scale.hi))
    } else {
        ("no data".to_string(), String::new())
    };
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="start">{}</text>"#,
        x,
        y + 28.0,
        esc(&lo)
    );
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end">{}</text>"#,
        x + bar_w,
        y + 28.0,
        esc(&hi)
    );
    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">GWh</text>"#,
        x + bar_w / 2.0,
        y + 28.0
    );
}

fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Equirectangular lon/lat → pixel mapping, corrected for the mean latitude
/// and fitted (aspect preserved) into the map band of the canvas.
struct Projection {
    origin: Coord<f64>,
    x_scale: f64,
    scale: f64,
    offset: Coord<f64>,
}

impl Projection {
    fn fit(bounds: Rect<f64>, style: &MapStyle) -> Self {
        let mid_lat = (bounds.min().y + bounds.max().y) / 2.0;
        let x_scale = mid_lat.to_radians().cos().abs().max(0.1);
        let span_x = (bounds.width() * x_scale).max(f64::EPSILON);
        let span_y = bounds.height().max(f64::EPSILON);

        let avail_w = style.width as f64 - 2.0 * MARGIN;
        let avail_h = style.height as f64 - TITLE_BAND - LEGEND_BAND;
        let scale = (avail_w / span_x).min(avail_h / span_y);
        let offset = Coord {
            x: MARGIN + (avail_w - span_x * scale) / 2.0,
            y: TITLE_BAND + (avail_h - span_y * scale) / 2.0,
        };
        Self {
            origin: Coord {
                x: bounds.min().x,
                y: bounds.max().y,
            },
            x_scale,
            scale,
            offset,
        }
    }

    fn project(&self, c: Coord<f64>) -> (f64, f64) {
        (
            self.offset.x + (c.x - self.origin.x) * self.x_scale * self.scale,
            self.offset.y + (self.origin.y - c.y) * self.scale,
        )
    }

    fn path(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in &geometry.0 {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for (i, c) in ring.coords().enumerate() {
                    let (x, y) = self.project(*c);
                    let _ = write!(d, "{}{:.1} {:.1}", if i == 0 { "M" } else { "L" }, x, y);
                }
                d.push('Z');
            }
        }
        d
    }
}

struct ColorScale {
    lo: f64,
    hi: f64,
    low: RGBColor,
    high: RGBColor,
}

impl ColorScale {
    fn has_range(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    fn color(&self, v: f64) -> RGBColor {
        let t = if self.hi > self.lo {
            ((v - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        RGBColor(
            mix(self.low.0, self.high.0),
            mix(self.low.1, self.high.1),
            mix(self.low.2, self.high.2),
        )
    }
}

fn hex(c: RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
}

pub(crate) fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::process::netgen_by_state_table;
    use crate::schema::{BoundaryTable, FlatRecord, Region};
    use geo::polygon;

    pub(crate) fn sample_state_table() -> StateTable {
        let square = |name: &str, x: f64, y: f64| Region {
            name: name.to_string(),
            geometry: MultiPolygon(vec![polygon![
                (x: x, y: y),
                (x: x + 4.0, y: y),
                (x: x + 4.0, y: y + 3.0),
                (x: x, y: y + 3.0),
            ]]),
        };
        let boundaries = BoundaryTable::from_regions(vec![
            square("Texas", -104.0, 28.0),
            square("Oregon", -124.0, 42.0),
            square("Maine", -71.0, 44.0),
            square("Hawaii", -160.0, 19.0),
        ]);
        let rec = |state: &str, fuel: &str, v: f64| {
            FlatRecord::new(2021, fuel.to_uppercase(), fuel, Some(v)).with_state("XX", state)
        };
        let records = vec![
            rec("Texas", "wind", 92_000.0),
            rec("Oregon", "wind", 7_000.0),
            rec("Texas", "solar", 15_000.0),
            rec("Oregon", "hydro", 33_000.0),
            rec("Maine", "hydro", 3_000.0),
            rec("Hawaii", "solar", 1_000.0),
        ];
        netgen_by_state_table(&records, boundaries, 2021).expect("sample table")
    }

    #[test]
    fn colours_follow_the_column() -> anyhow::Result<()> {
        let table = sample_state_table();
        let style = MapStyle::default();
        let svg = render_map_svg(&table, "wind", &style)?;

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(&map_title("wind", 2021)));
        // one path per continental region
        assert_eq!(svg.matches("<path ").count(), 3);
        // max value gets the high colour, min the low one, no data is grey
        assert!(svg.contains(&format!(r#"fill="{}" fill-rule"#, hex(style.high))));
        assert!(svg.contains(&format!(r#"fill="{}" fill-rule"#, hex(style.low))));
        assert!(svg.contains(&format!(r#"fill="{}" fill-rule"#, hex(style.missing))));
        assert!(svg.contains("Maine: no data"));
        assert!(!svg.contains("Hawaii"));
        Ok(())
    }

    #[test]
    fn same_input_same_bytes() -> anyhow::Result<()> {
        let table = sample_state_table();
        let style = MapStyle::default();
        assert_eq!(
            render_map_svg(&table, "hydro", &style)?,
            render_map_svg(&table, "hydro", &style)?
        );
        Ok(())
    }

    #[test]
    fn unknown_fuel_is_an_error() {
        let table = sample_state_table();
        assert_eq!(
            render_map_svg(&table, "fusion", &MapStyle::default()),
            Err(RenderError::UnknownColumn("fusion".to_string()))
        );
    }

    #[test]
    fn projection_stays_inside_the_map_band() {
        let style = MapStyle::default();
        let bounds = Rect::new(Coord { x: -125.0, y: 24.0 }, Coord { x: -66.0, y: 49.0 });
        let p = Projection::fit(bounds, &style);
        for c in [bounds.min(), bounds.max(), Coord { x: -100.0, y: 37.0 }] {
            let (x, y) = p.project(c);
            assert!(x >= MARGIN - 1e-6 && x <= style.width as f64 - MARGIN + 1e-6);
            assert!(y >= TITLE_BAND - 1e-6 && y <= style.height as f64 - LEGEND_BAND + 1e-6);
        }
        // north is up
        assert!(p.project(Coord { x: -100.0, y: 49.0 }).1 < p.project(Coord { x: -100.0, y: 24.0 }).1);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(esc(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
