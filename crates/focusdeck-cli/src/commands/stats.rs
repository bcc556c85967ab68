use clap::Subcommand;
use focusdeck_core::{Config, TaskDb, TaskStore};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Aggregate task counters
    Show,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = TaskDb::open(config.store_policy())?;

    match action {
        StatsAction::Show => {
            let summary = db.summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
