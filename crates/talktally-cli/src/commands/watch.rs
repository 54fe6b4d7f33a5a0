//! Interactive live view.
//!
//! Reads one line per keypress from stdin, toggles the bound participant,
//! and redraws totals. A redraw tick runs only while someone holds the floor.

use std::io::Write;

use talktally_core::timer::{format_clock, TokioScheduler};
use talktally_core::{Config, Database, KeyMap, Session, TickController};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::open_session;

pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(config))
}

async fn watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(config)?;
    let keymap = config.keymap(session.directory());
    print_legend(&session, &keymap);

    let (scheduler, mut ticks) = TokioScheduler::new();
    let mut ticker = TickController::new(scheduler, config.tick_interval());
    ticker.sync(session.is_speaking());
    render(&session)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                if input == "q" {
                    break;
                }
                for key in input.chars() {
                    match session.toggle_key(&keymap, key)? {
                        Some(event) => println!("{}", serde_json::to_string(&event)?),
                        None => eprintln!("no participant bound to '{key}'"),
                    }
                }
                ticker.sync(session.is_speaking());
                render(&session)?;
            }
            Some(()) = ticks.recv() => render(&session)?,
        }
    }

    ticker.shutdown();
    Ok(())
}

fn print_legend(session: &Session<Database>, keymap: &KeyMap) {
    for (key, id) in keymap.iter() {
        println!("[{key}] {}", session.directory().name_of(id));
    }
    println!("[q] quit");
}

fn render(session: &Session<Database>) -> std::io::Result<()> {
    let totals = session.totals();
    let mut line = String::new();
    for t in &totals.participants {
        let marker = if t.active { "*" } else { " " };
        line.push_str(&format!("{marker}{} {}  ", t.name, format_clock(t.seconds)));
    }
    line.push_str(&format!("| total {}", format_clock(totals.combined_seconds)));

    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}")?;
    out.flush()
}
