#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the hotspot map tools.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hotspot_map_geohash::GeohashCell;
use hotspot_map_hotspot::window::DEFAULT_EXPOSURE_PERIOD_MS;
use hotspot_map_hotspot::{MarkerStyle, build_markers};
use hotspot_map_query::{
    AggregatedSource, HotSpotQuery, HotSpotSource, QueryError, SourceConfig,
};
use hotspot_map_server::{ServerConfig, markers_response, run_server};

#[derive(Parser)]
#[command(name = "hotspot_map", about = "Hot-spot map tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode geohashes to the latitude/longitude of their cell centers
    Decode {
        /// One or more geohashes
        #[arg(required = true)]
        geohashes: Vec<String>,
    },
    /// Query the configured source and print colored markers as JSON
    Markers {
        /// TOML file with a `[source]` table. Falls back to the
        /// `HOTSPOT_MAP_*` environment variables.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Geohash prefix length to group by
        #[arg(long, default_value = "7", value_parser = accuracy_parser())]
        accuracy: u32,
        /// Maximum number of cells
        #[arg(long, value_parser = zones_parser())]
        zones: Option<u32>,
    },
    /// Rank a location history export and print the top hot-spots as JSON
    Aggregate {
        /// JSON array of location records, or `{"locations": [...]}`
        #[arg(long)]
        input: PathBuf,
        /// Geohash prefix length to group by
        #[arg(long, default_value = "7", value_parser = accuracy_parser())]
        accuracy: u32,
        /// Maximum number of cells (default: 10)
        #[arg(long, value_parser = zones_parser())]
        zones: Option<u32>,
    },
    /// Check whether a location history export saw anything in or next to
    /// a geohash shortly before a given time
    Exposure {
        /// JSON array of location records, or `{"locations": [...]}`
        #[arg(long)]
        input: PathBuf,
        /// Geohash of the visit
        #[arg(long)]
        geohash: String,
        /// Time of the visit, in milliseconds since the Unix epoch
        #[arg(long)]
        time: u64,
        /// How long after an observation a visit still matches, in
        /// milliseconds
        #[arg(long, default_value_t = DEFAULT_EXPOSURE_PERIOD_MS)]
        period: u64,
    },
    /// Start the API server
    Serve {
        /// TOML file with a `[source]` table. Falls back to the
        /// `HOTSPOT_MAP_*` environment variables.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn accuracy_parser() -> clap::builder::RangedI64ValueParser<u32> {
    #[allow(clippy::cast_possible_wrap)]
    let max = hotspot_map_geohash::MAX_PRECISION as i64;
    clap::value_parser!(u32).range(1..=max)
}

fn zones_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..)
}

fn load_source_config(path: Option<&Path>) -> Result<SourceConfig, QueryError> {
    match path {
        Some(path) => {
            log::info!("Loading source config from {}", path.display());
            SourceConfig::load(path)
        }
        None => SourceConfig::from_env(),
    }
}

/// One tab-separated output line: hash, latitude, longitude, and the
/// half-height and half-width of the cell.
fn format_cell(hash: &str, cell: &GeohashCell) -> String {
    format!(
        "{hash}\t{:.6}\t{:.6}\t±{:.6}\t±{:.6}",
        cell.center.latitude, cell.center.longitude, cell.latitude_error, cell.longitude_error
    )
}

fn decode(geohashes: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0usize;
    for hash in geohashes {
        match hotspot_map_geohash::decode_cell(hash) {
            Ok(cell) => println!("{}", format_cell(hash, &cell)),
            Err(e) => {
                log::error!("{hash}: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        let total = geohashes.len();
        return Err(format!("{failed} of {total} geohashes could not be decoded").into());
    }
    Ok(())
}

async fn markers(
    config: Option<&Path>,
    query: HotSpotQuery,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = load_source_config(config)?.build().await?;
    let hot_spots = source.hot_spots(&query).await?;
    let batch = build_markers(&hot_spots, &MarkerStyle::default())?;

    log::info!(
        "{} markers from {} hot-spots ({} rejected)",
        batch.markers.len(),
        hot_spots.len(),
        batch.rejected.len()
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&markers_response(hot_spots.len(), batch))?
    );
    Ok(())
}

async fn aggregate(input: &Path, query: HotSpotQuery) -> Result<(), Box<dyn std::error::Error>> {
    let source = AggregatedSource::load(input).await?;
    log::info!(
        "Loaded {} cells from {}",
        source.map().len(),
        input.display()
    );
    let hot_spots = source.hot_spots(&query).await?;
    println!("{}", serde_json::to_string_pretty(&hot_spots)?);
    Ok(())
}

async fn exposure(
    input: &Path,
    geohash: &str,
    time_ms: u64,
    period_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = AggregatedSource::load(input).await?;
    let range = source.window().time_range();
    if !(range.from_ms..range.to_ms).contains(&time_ms) {
        log::warn!(
            "Time {time_ms} is outside the recorded window {}..{}",
            range.from_ms,
            range.to_ms
        );
    }
    let matched = source.window().match_position(geohash, time_ms, period_ms)?;
    println!("{matched}");
    Ok(())
}

async fn serve(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let source_config = load_source_config(config.as_deref())?;
    let server_config = ServerConfig::from_env();

    // The server uses actix-web's runtime, so we need to run it
    // in a blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(async move {
            let source = source_config.build().await?;
            run_server(source, server_config).await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
        })
    })
    .await?
    .map_err(|e| e as Box<dyn std::error::Error>)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { geohashes } => decode(&geohashes)?,
        Commands::Markers {
            config,
            accuracy,
            zones,
        } => markers(config.as_deref(), HotSpotQuery { accuracy, zones }).await?,
        Commands::Aggregate {
            input,
            accuracy,
            zones,
        } => aggregate(&input, HotSpotQuery { accuracy, zones }).await?,
        Commands::Exposure {
            input,
            geohash,
            time,
            period,
        } => exposure(&input, &geohash, time, period).await?,
        Commands::Serve { config } => serve(config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_markers_args() {
        let cli = Cli::try_parse_from([
            "hotspot_map",
            "markers",
            "--accuracy",
            "6",
            "--zones",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Markers {
                config,
                accuracy,
                zones,
            } => {
                assert_eq!(config, None);
                assert_eq!(accuracy, 6);
                assert_eq!(zones, Some(3));
            }
            _ => panic!("expected markers"),
        }
    }

    #[test]
    fn accuracy_defaults_to_seven() {
        let cli = Cli::try_parse_from(["hotspot_map", "aggregate", "--input", "loc.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Aggregate {
                accuracy: 7,
                zones: None,
                ..
            }
        ));
    }

    #[test]
    fn exposure_period_defaults_to_five_minutes() {
        let cli = Cli::try_parse_from([
            "hotspot_map",
            "exposure",
            "--input",
            "loc.json",
            "--geohash",
            "sv8wrxf",
            "--time",
            "1600000000000",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Exposure {
                time: 1_600_000_000_000,
                period: 300_000,
                ..
            }
        ));
    }

    #[test]
    fn rejects_out_of_range_args() {
        assert!(Cli::try_parse_from(["hotspot_map", "markers", "--accuracy", "0"]).is_err());
        assert!(Cli::try_parse_from(["hotspot_map", "markers", "--accuracy", "13"]).is_err());
        assert!(Cli::try_parse_from(["hotspot_map", "markers", "--zones", "0"]).is_err());
        assert!(Cli::try_parse_from(["hotspot_map", "decode"]).is_err());
    }

    #[test]
    fn formats_decoded_cell() {
        let cell = hotspot_map_geohash::decode_cell("ezs42").unwrap();
        let line = format_cell("ezs42", &cell);
        assert!(line.starts_with("ezs42\t42.6"), "{line}");
        assert_eq!(line.split('\t').count(), 5);
    }
}
