// Machine
mod runtime;
pub use runtime::{
    sign_extend, Opcode, RunFlag, RunState, MEMORY_MAX, MR_KBDR, MR_KBSR, TICK_INTERVAL,
};
mod trap;
pub use trap::TrapVect;
mod loader;
pub use loader::ImageInfo;

// Devices
mod console;
pub use console::{BufferConsole, Console};
pub mod term;

#[macro_use]
pub mod output;
mod error;

pub mod env;

/// Address execution starts from unless changed by the caller.
pub const DEFAULT_ENTRY: u16 = 0x3000;
