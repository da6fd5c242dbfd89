use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{stdin, stdout, IsTerminal, Read, Stdout, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::console::Console;

/// Exit status used when the user interrupts with `Ctrl+C`.
const INTERRUPTED: i32 = 130;

/// Keeps the terminal in raw mode for as long as it lives.
///
/// Nothing is changed if stdin is not an interactive terminal.
#[derive(Debug)]
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    /// Must only be called if terminal is NOT in raw mode.
    pub fn new() -> Result<Self> {
        if !stdin().is_terminal() {
            return Ok(Self { enabled: false });
        }
        debug_assert!(
            !is_raw_mode(),
            "terminal should not be in raw mode to enable raw mode",
        );
        terminal::enable_raw_mode()
            .into_diagnostic()
            .wrap_err("failed to enable raw terminal")?;
        Ok(Self { enabled: true })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            // Nothing sensible to do if this fails while unwinding
            let _ = terminal::disable_raw_mode();
        }
    }
}

pub fn is_raw_mode() -> bool {
    terminal::is_raw_mode_enabled().is_ok_and(|is| is)
}

/// Raw mode disables output processing, so line feeds must carry their own carriage return.
pub fn crlf(string: &str, raw: bool) -> Cow<'_, str> {
    if raw && string.contains('\n') {
        Cow::Owned(string.replace('\n', "\r\n"))
    } else {
        Cow::Borrowed(string)
    }
}

/// Console backed by the process' stdin and stdout.
///
/// An interactive stdin is read as key events. Anything else (pipes, files) is read
/// on a background thread, so a poll never waits for bytes that are not there yet.
pub struct TermConsole {
    input: Input,
    /// Translate `\n` to `\r\n` on output.
    raw: bool,
    /// Bytes of keys read but not yet handed to the machine.
    pending: VecDeque<u8>,
    stdout: Stdout,
}

enum Input {
    /// Terminal key events.
    Keys,
    /// Bytes relayed from stdin. Disconnects at end of input.
    Stream(Receiver<u8>),
}

/// What a key press means to the console.
#[derive(Debug, PartialEq, Eq)]
enum KeyInput {
    Char(char),
    Interrupt,
}

impl TermConsole {
    pub fn new(raw: bool) -> Self {
        let input = if stdin().is_terminal() {
            Input::Keys
        } else {
            Input::Stream(spawn_stdin_reader())
        };
        Self::with_input(input, raw)
    }

    fn with_input(input: Input, raw: bool) -> Self {
        Self {
            input,
            raw,
            pending: VecDeque::new(),
            stdout: stdout(),
        }
    }

    /// Buffer a terminal event.
    ///
    /// Characters are stored as UTF-8, so multi-byte characters are handed out over
    /// the following reads.
    fn accept(&mut self, event: Event) {
        match event_input(event) {
            Some(KeyInput::Char(ch)) => {
                let mut bytes = [0u8; 4];
                self.pending.extend(ch.encode_utf8(&mut bytes).bytes());
            }
            Some(KeyInput::Interrupt) => interrupt(),
            None => (),
        }
    }

    /// Buffer every event which is already available.
    fn drain_events(&mut self) {
        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(event) = event::read() else {
                return;
            };
            self.accept(event);
        }
    }
}

impl Console for TermConsole {
    fn poll_byte(&mut self) -> Option<u8> {
        if let Some(byte) = self.pending.pop_front() {
            return Some(byte);
        }
        if let Input::Stream(bytes) = &self.input {
            return bytes.try_recv().ok();
        }
        self.drain_events();
        self.pending.pop_front()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if let Input::Stream(bytes) = &self.input {
            return self.pending.pop_front().or_else(|| bytes.recv().ok());
        }
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Some(byte);
            }
            let Ok(event) = event::read() else {
                return None;
            };
            self.accept(event);
        }
    }

    fn write_byte(&mut self, byte: u8) {
        // Output errors are not observable by the program
        if byte == b'\n' && self.raw {
            let _ = self.stdout.write_all(b"\r");
        }
        let _ = self.stdout.write_all(&[byte]);
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Raw mode swallows `SIGINT`, so keys are checked even if the program never reads them.
    fn tick(&mut self) {
        if matches!(self.input, Input::Keys) {
            self.drain_events();
        }
    }
}

/// Relay stdin byte by byte until end of input.
fn spawn_stdin_reader() -> Receiver<u8> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for byte in stdin().lock().bytes() {
            let Ok(byte) = byte else {
                break;
            };
            if sender.send(byte).is_err() {
                break;
            }
        }
    });
    receiver
}

/// Return the terminal to normal state and exit.
fn interrupt() -> ! {
    let _ = terminal::disable_raw_mode(); // Generic cleanup
    println!();
    std::process::exit(INTERRUPTED);
}

fn event_input(event: Event) -> Option<KeyInput> {
    match event {
        Event::Key(event) => key_input(event),
        _ => None,
    }
}

/// What a key press stands for, if anything.
fn key_input(event: KeyEvent) -> Option<KeyInput> {
    use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

    if matches!(event.kind, KeyEventKind::Release) {
        return None;
    }

    let ch = match (event.modifiers, event.code) {
        (Mod::CONTROL, KeyCode::Char('c')) => return Some(KeyInput::Interrupt),
        // Other control characters, eg. Ctrl+D -> EOT
        (Mod::CONTROL, KeyCode::Char(ch)) if ch.is_ascii_alphabetic() => {
            char::from(ch.to_ascii_lowercase() as u8 - b'a' + 1)
        }

        (_, KeyCode::Enter) => '\n',
        (_, KeyCode::Tab) => '\t',
        (_, KeyCode::Backspace) => '\x08',
        (_, KeyCode::Esc) => '\x1b',
        (_, KeyCode::Delete) => '\x7f',

        // Normal character
        (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => ch,

        _ => return None,
    };
    Some(KeyInput::Char(ch))
}
