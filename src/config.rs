use clap::Parser;
use std::path::PathBuf;

const DEFAULT_API_BASE: &str = "https://app.plant-for-the-planet.org/app/projects";
const DEFAULT_PROJECT: &str = "making-madagascar-green-again";

/// Terminal map viewer for conservation project site boundaries
#[derive(Debug, Parser)]
#[command(name = "siteview", version)]
pub struct Args {
    /// Project slug whose sites are fetched
    #[arg(long, default_value = DEFAULT_PROJECT)]
    pub project: String,

    /// API base URL (the project slug is appended)
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Locale passed through to the API, not interpreted locally
    #[arg(long, default_value = "en")]
    pub locale: String,

    /// Currency passed through to the API, not interpreted locally
    #[arg(long, default_value = "EUR")]
    pub currency: String,

    /// Fill color for site polygons, as R,G,B
    #[arg(long, default_value = "255,0,0", value_parser = parse_rgb)]
    pub fill_color: (u8, u8, u8),

    /// Fill opacity for site polygons (0.0 - 1.0)
    #[arg(long, default_value_t = 0.5)]
    pub fill_opacity: f64,

    /// Diagnostic log file (the terminal itself is busy drawing the map)
    #[arg(long, default_value = "siteview.log")]
    pub log_file: PathBuf,
}

/// Explicit configuration handed to construction; nothing here lives in
/// module-global state.
#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint_url: String,
    pub fill_color: (u8, u8, u8),
    pub fill_opacity: f64,
    pub initial_center: (f64, f64),
    pub initial_zoom: f64,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_args(args: Args) -> Self {
        let endpoint_url = format!(
            "{}/{}?_scope=extended&currency={}&locale={}",
            args.api_base.trim_end_matches('/'),
            args.project,
            args.currency,
            args.locale
        );
        Self {
            endpoint_url,
            fill_color: args.fill_color,
            fill_opacity: args.fill_opacity.clamp(0.0, 1.0),
            // World view until the fetched sites pull the camera in
            initial_center: (20.0, 0.0),
            initial_zoom: 1.0,
            log_file: args.log_file,
        }
    }
}

fn parse_rgb(value: &str) -> Result<(u8, u8, u8), String> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 3 {
        return Err("expected R,G,B".to_string());
    }
    let channel = |s: &str| {
        s.trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid channel `{s}`"))
    };
    Ok((channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_passes_scope_and_locale_through() {
        let args = Args::parse_from(["siteview", "--locale", "de", "--currency", "INR"]);
        let config = Config::from_args(args);
        assert_eq!(
            config.endpoint_url,
            "https://app.plant-for-the-planet.org/app/projects/making-madagascar-green-again\
             ?_scope=extended&currency=INR&locale=de"
        );
    }

    #[test]
    fn api_base_trailing_slash_is_normalized() {
        let args = Args::parse_from([
            "siteview",
            "--api-base",
            "http://localhost:9000/projects/",
            "--project",
            "demo",
        ]);
        let config = Config::from_args(args);
        assert!(config
            .endpoint_url
            .starts_with("http://localhost:9000/projects/demo?"));
    }

    #[test]
    fn fill_color_parses_rgb() {
        let args = Args::parse_from(["siteview", "--fill-color", "10, 20,30"]);
        assert_eq!(args.fill_color, (10, 20, 30));
        assert!(parse_rgb("1,2").is_err());
        assert!(parse_rgb("1,2,300").is_err());
    }
}
