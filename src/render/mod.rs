// src/render/mod.rs
//! Chart rendering. Everything here returns documents as strings; writing
//! them out is the caller's job.

pub mod bar;
pub mod choropleth;
pub mod html;
pub mod selector;

pub use bar::{fitted_size, render_stacked_bar, render_svg, BarChart, BarLayout};
pub use choropleth::{map_title, render_map_svg, MapStyle};
pub use html::render_interactive_html;
pub use selector::{MapSelector, SelectionHandler};
