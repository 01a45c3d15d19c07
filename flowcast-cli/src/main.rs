//! Flowcast CLI
//!
//! Runs the navigation core from a terminal: route requests with guidance
//! replay, one-off traffic generation, the congestion forecast, and
//! configuration management.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use flowcast::coord::Coordinate;

use commands::config::ConfigCommands;
use commands::forecast::ForecastArgs;
use commands::route::RouteArgs;
use commands::traffic::TrafficArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "flowcast", version, about = "Turn-by-turn routing with synthetic traffic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Request routes between two points
    Route {
        /// Start as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        from: Coordinate,

        /// Destination as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        to: Coordinate,

        /// Destination name shown in the header
        #[arg(long)]
        name: Option<String>,

        /// Replay guidance along the selected route
        #[arg(long)]
        navigate: bool,

        /// Route to navigate, 1 for the first candidate
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        select: u16,

        /// Also compare travel modes
        #[arg(long)]
        compare: bool,
    },

    /// Generate synthetic traffic around a point
    Traffic {
        /// Focal point as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        at: Coordinate,

        /// Seed for reproducible congestion sampling
        #[arg(long)]
        seed: Option<u64>,

        /// List every segment
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the congestion forecast
    Forecast {
        /// Number of days, today included
        #[arg(long)]
        days: Option<usize>,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Route {
            from,
            to,
            name,
            navigate,
            select,
            compare,
        } => commands::route::run(RouteArgs {
            from,
            to,
            name,
            select: usize::from(select) - 1,
            navigate,
            compare,
        }),
        Commands::Traffic { at, seed, verbose } => {
            commands::traffic::run(TrafficArgs { at, seed, verbose })
        }
        Commands::Forecast { days, seed } => commands::forecast::run(ForecastArgs { days, seed }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_route_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "flowcast",
            "route",
            "--from",
            "-33.8688,151.2093",
            "--to",
            "-33.8568,151.2153",
            "--navigate",
        ])
        .unwrap();
        match cli.command {
            Commands::Route {
                from,
                to,
                navigate,
                select,
                ..
            } => {
                assert_eq!(from, Coordinate::new(-33.8688, 151.2093));
                assert_eq!(to.latitude, -33.8568);
                assert!(navigate);
                assert_eq!(select, 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_coordinate() {
        let result = Cli::try_parse_from(["flowcast", "traffic", "--at", "91,0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli =
            Cli::try_parse_from(["flowcast", "config", "set", "routing.max_retries", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Set { .. }
            }
        ));
    }
}
