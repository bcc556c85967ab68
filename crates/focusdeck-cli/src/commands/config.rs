//! Configuration commands for CLI.

use clap::Subcommand;
use focusdeck_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dot-separated key
    Get {
        /// Key such as "timer.focus_minutes" or "tasks.auto_done_on_estimate"
        key: String,
    },
    /// Change one value and persist it
    Set {
        /// Key such as "timer.long_break_every"
        key: String,
        /// New value, parsed as the key's current type
        value: String,
    },
    /// Print the whole configuration as JSON
    List,
    /// Overwrite the configuration file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default();
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_or_default();
            config.set(&key, &value)?;
            println!("Config updated: {key} = {value}");
        }
        ConfigAction::List => {
            let config = Config::load_or_default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Config reset to defaults");
        }
    }
    Ok(())
}
