use clap::Subcommand;
use talktally_core::{Config, ParticipantId};

use super::{open_session, print_json, watch};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start, stop or hand over the floor to a participant
    Toggle {
        /// Participant ID
        id: ParticipantId,
    },
    /// Toggle the participant bound to a key
    Key {
        /// Single-character key (see `timer keys`)
        key: char,
    },
    /// List key bindings
    Keys,
    /// Print current speaker state and totals as JSON
    Status,
    /// Interactive live view: type a bound key and Enter to toggle, `q` to quit
    Watch,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    if let TimerAction::Watch = action {
        return watch::run(&config);
    }

    let mut session = open_session(&config)?;

    match action {
        TimerAction::Toggle { id } => {
            let event = session.toggle(id)?;
            print_json(&event)?;
        }
        TimerAction::Key { key } => {
            let keymap = config.keymap(session.directory());
            match session.toggle_key(&keymap, key)? {
                Some(event) => print_json(&event)?,
                None => return Err(format!("no participant bound to key '{key}'").into()),
            }
        }
        TimerAction::Keys => {
            let keymap = config.keymap(session.directory());
            let bindings: Vec<_> = keymap
                .iter()
                .map(|(key, id)| {
                    serde_json::json!({
                        "key": key.to_string(),
                        "participantId": id,
                        "name": session.directory().name_of(id),
                    })
                })
                .collect();
            print_json(&bindings)?;
        }
        TimerAction::Status => {
            print_json(&session.snapshot())?;
        }
        TimerAction::Watch => unreachable!("handled above"),
    }

    Ok(())
}
