use std::path::PathBuf;

use clap::Subcommand;
use talktally_core::timer::format_clock;
use talktally_core::{write_export, Config, Participant};

use super::{open_session, print_json};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Define the roster and environment notes and mark setup complete
    Setup {
        /// Participant as "Name" or "Name:Role"; repeat in seating order.
        /// IDs are assigned 1, 2, 3, ...
        #[arg(long = "participant", short = 'p', required = true)]
        participants: Vec<String>,
        /// Environment item; repeat for each
        #[arg(long = "env", short = 'e')]
        env: Vec<String>,
    },
    /// Print the interval log, newest first
    Log,
    /// Show or replace the environment notes
    Env {
        /// New notes, one item per line. Omit to show the current notes.
        text: Option<String>,
    },
    /// Persist the dark-mode preference
    DarkMode {
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        on: bool,
    },
    /// Write the session as JSON to `session_data_<epoch-ms>.json`
    Export {
        /// Output directory (defaults to `export.dir`, then the working directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Erase all participants, logs and notes. Discards any live interval.
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn parse_participant(index: usize, arg: &str) -> Participant {
    let (name, role) = match arg.split_once(':') {
        Some((name, role)) => (name.trim(), role.trim()),
        None => (arg.trim(), ""),
    };
    Participant::new(index as u32 + 1, name, role)
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut session = open_session(&config)?;

    match action {
        SessionAction::Setup { participants, env } => {
            let roster = participants
                .iter()
                .enumerate()
                .map(|(i, arg)| parse_participant(i, arg))
                .collect();
            let event = session.complete_setup(roster, &env.join("\n"))?;
            print_json(&event)?;
        }
        SessionAction::Log => {
            let directory = session.directory();
            let rows: Vec<_> = session
                .engine()
                .ledger()
                .entries()
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "id": e.id,
                        "participantId": e.participant_id,
                        "name": directory.name_of(e.participant_id),
                        "startTime": e.start_time,
                        "endTime": e.end_time,
                        "durationSeconds": e.duration_seconds,
                        "duration": format_clock(e.duration_seconds),
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        SessionAction::Env { text } => match text {
            Some(text) => {
                session.set_surroundings(&text)?;
                println!("ok");
            }
            None => print_json(&session.export().env_objs)?,
        },
        SessionAction::DarkMode { on } => {
            session.set_dark_mode(on)?;
            println!("ok");
        }
        SessionAction::Export { dir } => {
            let dir = dir
                .or_else(|| config.export.dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            let doc = session.export();
            let path = write_export(&dir, &doc, session.now())?;
            println!("{}", path.display());
        }
        SessionAction::Reset { yes } => {
            if !yes {
                return Err("reset erases the whole session; re-run with --yes to confirm".into());
            }
            let event = session.reset()?;
            print_json(&event)?;
        }
    }
    Ok(())
}
