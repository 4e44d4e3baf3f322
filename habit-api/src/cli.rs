//! Command-line arguments
//!
//! Each option falls back to an environment variable, then to the TOML file,
//! then to compiled defaults.

use clap::Parser;
use habit_common::config::ConfigOverrides;
use std::path::PathBuf;

/// Command-line arguments for habit-api
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "habit-api")]
#[command(about = "Habit event aggregation service")]
#[command(version)]
pub struct Args {
    /// Config file path (defaults to <config dir>/habit-tracker/config.toml)
    #[arg(short, long, env = "HABIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "HABIT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HABIT_PORT")]
    pub port: Option<u16>,

    /// Public spreadsheet id for the CSV export source
    #[arg(long, env = "GOOGLE_SHEETS_ID")]
    pub sheet_id: Option<String>,

    /// PostgreSQL connection URL for the database source
    #[arg(long, env = "HABIT_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Table holding habit events
    #[arg(long, env = "HABIT_DATABASE_TABLE")]
    pub database_table: Option<String>,

    /// Source to make primary at startup
    #[arg(long, env = "HABIT_DEFAULT_SOURCE")]
    pub default_source: Option<String>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Settings that override the TOML file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            sheet_id: self.sheet_id.clone(),
            database_url: self.database_url.clone(),
            database_table: self.database_table.clone(),
            default_source: self.default_source.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }
}
