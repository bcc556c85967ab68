use std::io::Write;

use clap::Subcommand;
use focusdeck_core::{Config, CycleSettings, CycleTimer, IntervalKind, Session, TaskDb, TaskStore};

const TIMER_KEY: &str = "cycle_timer";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current interval
    Start,
    /// Pause the current interval
    Stop,
    /// Restore the current interval to its full duration
    Reset,
    /// Switch the interval kind (stops and resets the timer)
    Mode {
        /// focus, short-break or long-break
        kind: String,
    },
    /// Select the task credited by focus completions
    Select {
        /// Task ID (omit to clear the selection)
        id: Option<String>,
    },
    /// Adjust interval durations and the long break rotation
    Set {
        /// Focus minutes
        #[arg(long)]
        focus: Option<u64>,
        /// Short break minutes
        #[arg(long)]
        short: Option<u64>,
        /// Long break minutes
        #[arg(long)]
        long: Option<u64>,
        /// Focus completions per long break
        #[arg(long)]
        every: Option<u32>,
    },
    /// Print current timer state as JSON
    Status,
    /// Count down in the foreground until the interval completes
    Watch,
}

fn parse_kind(raw: &str) -> Result<IntervalKind, String> {
    match raw {
        "focus" => Ok(IntervalKind::Focus),
        "short-break" | "short_break" => Ok(IntervalKind::ShortBreak),
        "long-break" | "long_break" => Ok(IntervalKind::LongBreak),
        _ => Err(format!(
            "unknown interval kind: {raw} (expected focus, short-break or long-break)"
        )),
    }
}

fn load_timer(db: &TaskDb, settings: &CycleSettings) -> CycleTimer {
    let saved = db
        .kv_get(TIMER_KEY)
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str::<CycleTimer>(&json).ok());
    let mut timer = saved.unwrap_or_else(|| CycleTimer::new(settings.clone()));
    // Durations stay with the persisted timer (`timer set` edits them);
    // the require-task policy follows the config on every load.
    timer.set_require_task_for_focus(settings.require_task_for_focus);
    timer
}

fn save_timer(db: &TaskDb, timer: &CycleTimer) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(timer)?;
    db.kv_set(TIMER_KEY, &json)?;
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = TaskDb::open(config.store_policy())?;
    let timer = load_timer(&db, &config.cycle_settings());
    let mut session = Session::from_parts(db, timer);

    match action {
        TimerAction::Start => match session.timer_mut().start()? {
            Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
            None => println!(
                "{}",
                serde_json::to_string_pretty(&session.timer().snapshot())?
            ),
        },
        TimerAction::Stop => match session.timer_mut().stop() {
            Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
            None => println!(
                "{}",
                serde_json::to_string_pretty(&session.timer().snapshot())?
            ),
        },
        TimerAction::Reset => {
            let event = session.timer_mut().reset();
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Mode { kind } => {
            let kind = parse_kind(&kind)?;
            let event = session.timer_mut().set_mode(kind);
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Select { id } => {
            if let Some(ref id) = id {
                if session.store().get(id)?.is_none() {
                    return Err(format!("Task not found: {id}").into());
                }
            }
            let event = session.timer_mut().select_task(id);
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::Set {
            focus,
            short,
            long,
            every,
        } => {
            let timer = session.timer_mut();
            if let Some(minutes) = focus {
                timer.configure(IntervalKind::Focus, minutes.saturating_mul(60))?;
            }
            if let Some(minutes) = short {
                timer.configure(IntervalKind::ShortBreak, minutes.saturating_mul(60))?;
            }
            if let Some(minutes) = long {
                timer.configure(IntervalKind::LongBreak, minutes.saturating_mul(60))?;
            }
            if let Some(every) = every {
                timer.set_long_break_every(every)?;
            }
            println!("{}", serde_json::to_string_pretty(timer.settings())?);
        }
        TimerAction::Status => {
            let completed = session.tick()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&session.timer().snapshot())?
            );
            if let Some(event) = completed {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
        TimerAction::Watch => loop {
            if let Some(event) = session.tick()? {
                println!();
                println!("{}", serde_json::to_string_pretty(&event)?);
                break;
            }
            if !session.timer().running() {
                println!("timer is not running");
                break;
            }
            let remaining = session.timer().poll();
            print!(
                "\r{}: {:02}:{:02} remaining ",
                session.timer().kind().label(),
                remaining / 60,
                remaining % 60
            );
            std::io::stdout().flush()?;
            std::thread::sleep(std::time::Duration::from_secs(1));
        },
    }

    let (db, timer) = session.into_parts();
    save_timer(&db, &timer)?;
    Ok(())
}
