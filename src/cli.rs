//! CLI argument parsing for the route-consolidation binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::ScenarioKind;

#[derive(Parser)]
#[command(
    name = "route-consolidation",
    about = "Compare AS-IS and TO-BE livestock collection routes"
)]
pub struct Cli {
    /// AS-IS stop point CSV (overrides AS_IS_PATH)
    #[arg(long, global = true)]
    pub as_is: Option<PathBuf>,

    /// TO-BE stop point CSV (overrides TO_BE_PATH)
    #[arg(long, global = true)]
    pub to_be: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List group keys present in both datasets
    Groups,
    /// Build both scenarios for a group and print the comparison
    Compare {
        /// Group (sorting) key
        #[arg(long)]
        group: String,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one scenario of a group as a GeoJSON FeatureCollection
    Geojson {
        #[arg(long)]
        group: String,
        #[arg(long, value_enum)]
        scenario: ScenarioArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioArg {
    AsIs,
    ToBe,
}

impl From<ScenarioArg> for ScenarioKind {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::AsIs => ScenarioKind::AsIs,
            ScenarioArg::ToBe => ScenarioKind::ToBe,
        }
    }
}
