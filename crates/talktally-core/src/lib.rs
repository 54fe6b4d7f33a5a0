//! # Talktally Core Library
//!
//! This library provides the core logic for Talktally, a speaking-time
//! tracker for small fixed groups: exactly one participant holds the floor
//! at a time, every hand-over closes a timed interval into an append-only
//! log, and totals are derived from that log on demand. The CLI binary is a
//! thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine with a single
//!   `toggle` command; the caller supplies `now`
//! - **Log Ledger**: Newest-first record of finished intervals, written
//!   only by the engine
//! - **Totals**: Pure per-participant and combined sums, recomputed on
//!   every read, plus a redraw tick that runs only while someone speaks
//! - **Storage**: SQLite key/value snapshot of the session and TOML-based
//!   configuration
//! - **Export**: Portable JSON document of environment notes and intervals
//!
//! ## Key Components
//!
//! - [`Session`]: Owns the session state and persists every change
//! - [`TimerEngine`]: Core timer state machine
//! - [`PersistedStore`]: Typed snapshot adapter over a [`KeyValueStore`]
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod export;
pub mod keymap;
pub mod participant;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use export::{build_export, export_file_name, write_export, ExportDocument};
pub use keymap::KeyMap;
pub use participant::{Participant, ParticipantDirectory, ParticipantId, UNKNOWN_PARTICIPANT};
pub use session::{Session, SessionMeta, SessionState};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, PersistedStore};
pub use timer::{
    ActiveSpeaker, LogEntry, LogLedger, TickController, TimerEngine, TimerState, Totals,
};
