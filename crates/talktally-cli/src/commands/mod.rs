pub mod config;
pub mod participant;
pub mod session;
pub mod timer;
mod watch;

use talktally_core::{Config, Database, PersistedStore, Session, SystemClock};

/// Open the persisted session described by `config`.
pub fn open_session(config: &Config) -> Result<Session<Database>, Box<dyn std::error::Error>> {
    let db = Database::open(&config.session.db_file)?;
    Ok(Session::open(
        PersistedStore::new(db),
        SystemClock,
        config.session_defaults(),
    ))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
