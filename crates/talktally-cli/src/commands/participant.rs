use clap::Subcommand;
use talktally_core::{Config, ParticipantId};

use super::{open_session, print_json};

#[derive(Subcommand)]
pub enum ParticipantAction {
    /// List participants with their current totals
    List,
    /// Rename a participant
    Rename {
        /// Participant ID
        id: ParticipantId,
        /// New display name
        name: String,
    },
}

pub fn run(action: ParticipantAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut session = open_session(&config)?;

    match action {
        ParticipantAction::List => {
            let totals = session.totals();
            let rows: Vec<_> = session
                .directory()
                .iter()
                .map(|p| {
                    let seconds = totals.get(p.id).map(|t| t.seconds).unwrap_or(0);
                    serde_json::json!({
                        "id": p.id,
                        "name": p.name,
                        "role": p.role,
                        "seconds": seconds,
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        ParticipantAction::Rename { id, name } => {
            let event = session.rename(id, &name)?;
            print_json(&event)?;
        }
    }
    Ok(())
}
