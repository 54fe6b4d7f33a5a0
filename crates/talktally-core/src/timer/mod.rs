mod accumulator;
mod engine;
mod ledger;
mod ticker;

pub use accumulator::{
    combined_total, format_clock, live_seconds, total_for, ParticipantTotal, Totals,
};
pub use engine::{ActiveSpeaker, TimerEngine, TimerState};
pub use ledger::{LogEntry, LogLedger, MAX_RESTORED_ID};
pub use ticker::{
    Scheduler, TickController, TickHandle, TokioScheduler, DEFAULT_TICK_INTERVAL,
};
