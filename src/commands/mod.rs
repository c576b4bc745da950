//! Command implementations behind the CLI.

mod forecast;
mod lint;
mod model;
mod output;
mod weather;

pub use forecast::{SiteArgs, forecast, resolve_site};
pub use lint::lint;
pub use model::fetch_model;
pub use output::{OutputFormat, render_power, render_weather};
pub use weather::{WeatherKind, weather};
