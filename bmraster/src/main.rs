mod options;

use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use log::info;
use nightlights::{
    blackmarble::{geo::Polygon, parse_region},
    BearerToken, BlackMarble, Config, Output, Product, Request,
};
use options::{Cli, Command as CliCmd};
use serde::Serialize;
use std::{fs, io::Write};

fn main() -> Result<(), AnyError> {
    let Cli {
        region,
        product,
        variable,
        token,
        quality_flags,
        workers,
        scratch_dir,
        progress,
        dates,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let region = parse_region(&fs::read_to_string(&region)?)?;
    let client = BlackMarble::builder()
        .config(Config {
            scratch_dir,
            workers,
            progress,
            ..Config::default()
        })
        .build()?;

    match cmd {
        CliCmd::Tiles => {
            let grid = client.tile_grid()?;
            for tile_id in grid.intersecting(&region) {
                println!("{tile_id}");
            }
        }
        CliCmd::Json => {
            let request = request(region, product, variable, token, quality_flags, dates)?;
            info!("extracting {} from {product}", request.variable());
            print_json(&client.raster(&request)?)?;
        }
        CliCmd::Csv => {
            let request = request(region, product, variable, token, quality_flags, dates)?;
            info!("extracting {} from {product}", request.variable());
            print_csv(&client.raster(&request)?)?;
        }
    }
    Ok(())
}

fn request(
    region: Polygon<f64>,
    product: Product,
    variable: Option<String>,
    token: Option<String>,
    quality_flags: Vec<u8>,
    dates: Vec<String>,
) -> Result<Request, AnyError> {
    let token = token.ok_or_else(|| anyhow!("--token or BLACKMARBLE_TOKEN is required"))?;
    if dates.is_empty() {
        return Err(anyhow!("at least one --dates value is required"));
    }
    let mut request = Request::builder()
        .region(region)
        .product(product)
        .dates(dates)
        .credential(BearerToken::new(token))
        .quality_flags(quality_flags);
    if let Some(variable) = variable {
        request = request.variable(variable);
    }
    Ok(request.build()?)
}

fn print_json(output: &Output) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonBand<'a> {
        name: &'a str,
        /// `[west, south, east, north]`
        extent: [f64; 4],
        /// `[rows, columns]`
        dimensions: [usize; 2],
        valid: usize,
        min: Option<f32>,
        mean: Option<f64>,
        max: Option<f32>,
    }

    let bands: Vec<JsonBand> = output
        .bands()
        .iter()
        .map(|band| {
            let extent = band.raster.extent();
            let (rows, cols) = band.raster.dimensions();
            let stats = band.raster.stats();
            JsonBand {
                name: &band.name,
                extent: [extent.min().x, extent.min().y, extent.max().x, extent.max().y],
                dimensions: [rows, cols],
                valid: stats.map_or(0, |s| s.valid),
                min: stats.map(|s| s.min),
                mean: stats.map(|s| s.mean),
                max: stats.map(|s| s.max),
            }
        })
        .collect();
    let json = serde_json::to_string(&bands)?;
    println!("{json}");
    Ok(())
}

fn print_csv(output: &Output) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Band,Longitude,Latitude,Value")?;
    for band in output.bands() {
        let (rows, cols) = band.raster.dimensions();
        for row in 0..rows {
            for col in 0..cols {
                if let Some(value) = band.raster.get((row, col)) {
                    let center = band.raster.pixel_center((row, col));
                    writeln!(stdout, "{},{},{},{value}", band.name, center.x, center.y)?;
                }
            }
        }
    }
    Ok(())
}
