use std::path::PathBuf;

use clap::Parser;
use miette::Result;

use lc3vm::output::{file_message, message, MsgColor, Output};
use lc3vm::term::{RawModeGuard, TermConsole};
use lc3vm::RunState;

/// Virtual machine for binary LC3 program images.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// `.obj` images to load, in order, into the same machine
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Only print output of the running program, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
}

fn main() -> Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    lc3vm::env::init();
    Output::set_minimal(args.minimal || lc3vm::env::is_minimal());

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(0)
                .build(),
        )
    }))?;

    let mut state = RunState::new();
    for path in &args.images {
        file_message(Green, "Loading", path);
        let info = match state.load_file(path) {
            Ok(info) => info,
            Err(e) => {
                file_message(Red, "Failed", path);
                return Err(e);
            }
        };
        let detail = match info.end() {
            Some(end) => format!("{} word(s) at 0x{:04x}..=0x{:04x}", info.len, info.orig, end),
            None => format!("no words at 0x{:04x}", info.orig),
        };
        message(Green, "Loaded", &detail);
    }
    state.set_trace(lc3vm::env::is_trace_enabled());

    message(Green, "Running", &format!("from 0x{:04x}", state.pc()));
    run(&mut state)?;

    message(Cyan, "Completed", "machine halted");
    Ok(())
}

/// Run until `HALT`, with the terminal in raw mode for the duration.
fn run(state: &mut RunState) -> Result<()> {
    let guard = RawModeGuard::new()?;
    let mut console = TermConsole::new(guard.is_enabled());
    state.run(&mut console);
    // Restore before any further status output
    drop(guard);
    Ok(())
}
