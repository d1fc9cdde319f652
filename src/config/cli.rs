use crate::core::retention::GroupingStrategy;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "baltic-ais")]
#[command(about = "Baltic vessel position collector and territorial retention tool")]
pub struct CliConfig {
    /// Path to the TOML configuration file (optional)
    #[arg(short, long, default_value = "ais.toml", global = true)]
    pub config: String,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch the live position feed, attribute and store it
    Collect {
        /// Skip inserting positions into the store
        #[arg(long)]
        no_store: bool,

        /// Skip writing snapshot files
        #[arg(long)]
        no_export: bool,
    },

    /// Delete the full history of vessels that never crossed between jurisdictions
    Cleanup {
        /// Confirm deletion without prompting
        #[arg(long)]
        yes: bool,

        /// Analyze and report only
        #[arg(long)]
        dry_run: bool,

        #[arg(long, value_enum, default_value_t = Grouping::Streaming)]
        grouping: Grouping,
    },

    /// Row count, vessel count and time range of the store
    Stats,

    /// Print the jurisdiction of a single point
    Classify {
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Grouping {
    Buffered,
    Streaming,
}

impl From<Grouping> for GroupingStrategy {
    fn from(grouping: Grouping) -> Self {
        match grouping {
            Grouping::Buffered => GroupingStrategy::Buffered,
            Grouping::Streaming => GroupingStrategy::Streaming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cleanup_flags() {
        let cli = CliConfig::try_parse_from([
            "baltic-ais",
            "cleanup",
            "--yes",
            "--grouping",
            "buffered",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, "ais.toml");
        match cli.command {
            Command::Cleanup {
                yes,
                dry_run,
                grouping,
            } => {
                assert!(yes);
                assert!(!dry_run);
                assert_eq!(GroupingStrategy::from(grouping), GroupingStrategy::Buffered);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_classify_with_negative_longitude() {
        let cli = CliConfig::try_parse_from(["baltic-ais", "classify", "-12.5", "60.1"]).unwrap();
        match cli.command {
            Command::Classify { lon, lat } => {
                assert_eq!(lon, -12.5);
                assert_eq!(lat, 60.1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(CliConfig::try_parse_from(["baltic-ais"]).is_err());
    }
}
