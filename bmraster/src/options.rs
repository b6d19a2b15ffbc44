use clap::{Parser, Subcommand};
use nightlights::Product;
use std::path::PathBuf;

/// Assemble Black Marble nighttime-lights rasters for a region.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// GeoJSON file holding a single polygon.
    #[arg(short, long)]
    pub region: PathBuf,

    /// One of VNP46A1, VNP46A2, VNP46A3 or VNP46A4.
    #[arg(short, long, default_value = "VNP46A3")]
    pub product: Product,

    /// Field to extract. Defaults to the product's primary variable.
    #[arg(long)]
    pub variable: Option<String>,

    /// Earthdata bearer token. Required by `json` and `csv`.
    #[arg(long, env = "BLACKMARBLE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Comma separated quality flag values to mask out.
    #[arg(short, long, value_delimiter = ',')]
    pub quality_flags: Vec<u8>,

    /// Maximum number of concurrent downloads.
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,

    /// Directory to download tiles into, instead of a temporary one.
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Draw download progress bars.
    #[arg(long, default_value_t = false)]
    pub progress: bool,

    /// Comma separated dates, as `YYYY-MM-DD`, `YYYY-MM` or `YYYY`
    /// depending on the product. Required by `json` and `csv`.
    #[arg(short, long, value_delimiter = ',')]
    pub dates: Vec<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the tiles intersecting the region.
    Tiles,

    /// Print a JSON summary of each band.
    Json,

    /// Print every valid pixel as "band,longitude,latitude,value".
    Csv,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_tiles_needs_only_region() {
        let cli = Cli::try_parse_from(["bmraster", "--region", "roi.geojson", "tiles"]).unwrap();
        assert!(matches!(cli.cmd, Command::Tiles));
        assert!(cli.dates.is_empty());
    }

    #[test]
    fn test_dates_and_flags() {
        let cli = Cli::try_parse_from([
            "bmraster",
            "--region",
            "roi.geojson",
            "--product",
            "vnp46a2",
            "--token",
            "secret",
            "--quality-flags",
            "2,255",
            "--dates",
            "2021-01-01,2021-01-02",
            "-d",
            "2021-01-03",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.token.as_deref(), Some("secret"));
        assert_eq!(cli.quality_flags, [2, 255]);
        assert_eq!(cli.dates, ["2021-01-01", "2021-01-02", "2021-01-03"]);
        assert!(matches!(cli.cmd, Command::Json));
    }
}
