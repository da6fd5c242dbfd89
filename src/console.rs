use std::collections::VecDeque;

/// Character source and sink seen by the running machine.
///
/// Reads return raw bytes; the machine stores them as the low 8 bits of a word.
pub trait Console {
    /// Return the next pending byte without waiting, if there is one.
    fn poll_byte(&mut self) -> Option<u8>;
    /// Wait for the next byte. `None` once input is exhausted.
    fn read_byte(&mut self) -> Option<u8>;
    fn write_byte(&mut self, byte: u8);
    fn flush(&mut self);

    /// Called periodically while running, whether or not the program reads input.
    fn tick(&mut self) {}

    fn write_str(&mut self, string: &str) {
        for byte in string.bytes() {
            self.write_byte(byte);
        }
    }
}

/// In-memory console with a fixed queue of input bytes.
///
/// Every queued byte counts as "pending" for [`Console::poll_byte`].
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    flushes: usize,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily, for comparisons.
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for BufferConsole {
    fn poll_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_queues_input() {
        let mut console = BufferConsole::with_input("ab");
        console.push_input([b'c']);
        assert_eq!(console.poll_byte(), Some(b'a'));
        assert_eq!(console.read_byte(), Some(b'b'));
        assert_eq!(console.read_byte(), Some(b'c'));
        assert_eq!(console.poll_byte(), None);
        assert_eq!(console.read_byte(), None);
    }

    #[test]
    fn buffer_console_collects_output() {
        let mut console = BufferConsole::new();
        console.write_str("Hi");
        console.write_byte(b'!');
        console.flush();
        assert_eq!(console.output_str(), "Hi!");
        assert_eq!(console.flush_count(), 1);
        assert_eq!(console.take_output(), b"Hi!");
        assert!(console.output().is_empty());
    }
}
