use crate::console::Console;
use crate::runtime::RunState;

/// Prompt printed by the `IN` trap before it waits for a key.
const IN_PROMPT: &str = "Enter a character: ";

/// Service routines reachable through `TRAP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapVect {
    /// Read one character into R0, without echo.
    Getc = 0x20,
    /// Write the low byte of R0.
    Out = 0x21,
    /// Write a string stored one character per word.
    Puts = 0x22,
    /// Prompt, then read and echo one character into R0.
    In = 0x23,
    /// Write a string stored two characters per word, low byte first.
    Putsp = 0x24,
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVect {
    type Error = ();
    fn try_from(vect: u8) -> Result<Self, Self::Error> {
        let vect = match vect {
            0x20 => TrapVect::Getc,
            0x21 => TrapVect::Out,
            0x22 => TrapVect::Puts,
            0x23 => TrapVect::In,
            0x24 => TrapVect::Putsp,
            0x25 => TrapVect::Halt,
            _ => return Err(()),
        };
        Ok(vect)
    }
}

impl RunState {
    pub(crate) fn trap(&mut self, io: &mut dyn Console, instr: u16) {
        self.set_reg(7, self.pc());
        // Unknown vectors fall through without effect
        let Ok(trap_vect) = TrapVect::try_from((instr & 0xFF) as u8) else {
            return;
        };
        match trap_vect {
            TrapVect::Getc => {
                let ch = read_input(io);
                self.set_reg_flags(0, ch);
            }
            TrapVect::Out => {
                io.write_byte(self.reg(0) as u8);
                io.flush();
            }
            TrapVect::Puts => {
                let mut addr = self.reg(0);
                loop {
                    let chr_raw = self.read_mem(io, addr);
                    if chr_raw == 0 {
                        break;
                    }
                    io.write_byte(chr_raw as u8);
                    addr = addr.wrapping_add(1);
                }
                io.flush();
            }
            TrapVect::In => {
                io.write_str(IN_PROMPT);
                io.flush();
                let ch = read_input(io);
                io.write_byte(ch as u8);
                io.flush();
                self.set_reg_flags(0, ch);
            }
            TrapVect::Putsp => {
                let mut addr = self.reg(0);
                loop {
                    let chr_raw = self.read_mem(io, addr);
                    if chr_raw == 0 {
                        break;
                    }
                    io.write_byte(chr_raw as u8);
                    let high = (chr_raw >> 8) as u8;
                    if high != 0 {
                        io.write_byte(high);
                    }
                    addr = addr.wrapping_add(1);
                }
                io.flush();
            }
            TrapVect::Halt => {
                io.write_str("HALT\n");
                io.flush();
                self.halt();
            }
        }
    }
}

/// Blocking read of one character. End of input reads as `0xFFFF`.
fn read_input(io: &mut dyn Console) -> u16 {
    io.read_byte().map_or(u16::MAX, u16::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferConsole, RunFlag};

    fn trap(state: &mut RunState, io: &mut BufferConsole, vect: u16) {
        state.write_mem(state.pc(), 0xF000 | vect);
        state.step(io);
    }

    fn write_words(state: &mut RunState, addr: u16, words: &[u16]) {
        for (i, word) in words.iter().enumerate() {
            state.write_mem(addr + i as u16, *word);
        }
    }

    #[test]
    fn vector_table() {
        assert_eq!(TrapVect::try_from(0x20u8), Ok(TrapVect::Getc));
        assert_eq!(TrapVect::try_from(0x25u8), Ok(TrapVect::Halt));
        assert_eq!(TrapVect::try_from(0x1fu8), Err(()));
        assert_eq!(TrapVect::try_from(0x26u8), Err(()));
        assert_eq!(TrapVect::Putsp as u16, 0x24);
    }

    #[test]
    fn trap_saves_return_address() {
        let mut state = RunState::new();
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x21);
        assert_eq!(state.reg(7), 0x3001);
        assert_eq!(state.pc(), 0x3001);
    }

    #[test]
    fn getc_reads_without_echo() {
        let mut state = RunState::new();
        let mut io = BufferConsole::with_input("a");
        trap(&mut state, &mut io, 0x20);
        assert_eq!(state.reg(0), b'a' as u16);
        assert_eq!(state.flag(), RunFlag::P);
        assert!(io.output().is_empty());
    }

    #[test]
    fn getc_at_end_of_input() {
        let mut state = RunState::new();
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x20);
        assert_eq!(state.reg(0), 0xffff);
        assert_eq!(state.flag(), RunFlag::N);
    }

    #[test]
    fn getc_reads_nul_as_zero() {
        let mut state = RunState::new();
        state.set_reg(0, 7);
        let mut io = BufferConsole::with_input([0u8]);
        trap(&mut state, &mut io, 0x20);
        assert_eq!(state.reg(0), 0);
        assert_eq!(state.flag(), RunFlag::Z);
    }

    #[test]
    fn out_writes_low_byte() {
        let mut state = RunState::new();
        state.set_reg(0, 0x1241);
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x21);
        assert_eq!(io.output(), b"A");
        assert_eq!(io.flush_count(), 1);
        assert_eq!(state.flag(), RunFlag::Z);
    }

    #[test]
    fn puts_stops_at_zero_word() {
        let mut state = RunState::new();
        write_words(&mut state, 0x4000, &[0x48, 0x49, 0x00, 0x4A]);
        state.set_reg(0, 0x4000);
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x22);
        assert_eq!(io.output(), b"HI");
        assert_eq!(state.reg(0), 0x4000);
    }

    #[test]
    fn puts_truncates_to_low_byte() {
        let mut state = RunState::new();
        // Non-zero word with a zero low byte is still printed
        write_words(&mut state, 0x4000, &[0x0141, 0x0100, 0x42, 0]);
        state.set_reg(0, 0x4000);
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x22);
        assert_eq!(io.output(), b"A\0B");
    }

    #[test]
    fn in_prompts_and_echoes() {
        let mut state = RunState::new();
        let mut io = BufferConsole::with_input("zy");
        trap(&mut state, &mut io, 0x23);
        assert_eq!(io.output_str(), "Enter a character: z");
        assert_eq!(state.reg(0), b'z' as u16);
        assert_eq!(state.flag(), RunFlag::P);
        assert_eq!(io.remaining_input(), 1);
    }

    #[test]
    fn putsp_unpacks_low_byte_first() {
        let mut state = RunState::new();
        // "Hello" packed: "eH", "ll", "o\0"
        write_words(&mut state, 0x4000, &[0x6548, 0x6C6C, 0x006F, 0x0000]);
        state.set_reg(0, 0x4000);
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x24);
        assert_eq!(io.output(), b"Hello");
    }

    #[test]
    fn putsp_prints_zero_low_byte() {
        let mut state = RunState::new();
        write_words(&mut state, 0x4000, &[0x4100, 0]);
        state.set_reg(0, 0x4000);
        let mut io = BufferConsole::new();
        trap(&mut state, &mut io, 0x24);
        assert_eq!(io.output(), b"\0A");
    }

    #[test]
    fn halt_stops_machine() {
        let mut state = RunState::new();
        let mut io = BufferConsole::new();
        // LEA R0, #2; PUTS; HALT; "OK"
        write_words(
            &mut state,
            0x3000,
            &[0xE002, 0xF022, 0xF025, b'O' as u16, b'K' as u16, 0],
        );
        state.run(&mut io);
        assert!(!state.is_running());
        assert_eq!(io.output_str(), "OKHALT\n");
        assert_eq!(state.pc(), 0x3003);
    }

    #[test]
    fn unknown_vector_is_ignored() {
        let mut state = RunState::new();
        state.set_reg(0, 0x41);
        let mut io = BufferConsole::with_input("a");
        for vect in [0x00, 0x1f, 0x26, 0x27, 0xff] {
            trap(&mut state, &mut io, vect);
        }
        assert_eq!(state.reg(0), 0x41);
        assert_eq!(state.flag(), RunFlag::Z);
        assert!(io.output().is_empty());
        assert_eq!(io.remaining_input(), 1);
    }
}
