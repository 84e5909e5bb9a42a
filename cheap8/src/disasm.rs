//! Disassembler.
//!
//! A derived view over a program image, recomputed from the bytes on
//! demand rather than cached per address. Lines come straight from the
//! instruction descriptor table, so the listing always agrees with what
//! the executor would actually decode.
use std::fmt::{self, Write as FmtWrite};

use crate::constants::MEM_START;
use crate::opcodes::decode;

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    /// Render the whole image as one listing, addressed as if loaded at
    /// the program region.
    pub fn listing(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for (i, instr) in self.bytecode.chunks(2).enumerate() {
            let addr = MEM_START + i * 2;
            // A trailing odd byte is data, not an instruction.
            let [hi, lo] = match instr {
                [hi, lo] => [*hi, *lo],
                _ => break,
            };
            let word = (hi as u16) << 8 | lo as u16;
            self.disassemble(&mut buf, addr, word)?;
        }

        Ok(buf)
    }

    /// Write a single instruction to the given writer.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W, addr: usize, word: u16) -> fmt::Result {
        match decode(word) {
            Some(opcode) => writeln!(w, "{addr:04X}: {word:04X}  {}", opcode.format(word)),
            None => writeln!(w, "{addr:04X}: {word:04X}  ??"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_listing() {
        let rom = [0x60, 0x05, 0x70, 0x03, 0x00, 0xE0, 0x50, 0x01];
        let listing = Disassembler::new(&rom).listing().unwrap();

        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "0200: 6005  LD V0 5");
        assert_eq!(lines[1], "0202: 7003  ADD V0 3");
        assert_eq!(lines[2], "0204: 00E0  CLS");
        // Undecodable words are shown, not skipped.
        assert_eq!(lines[3], "0206: 5001  ??");
    }

    #[test]
    fn test_odd_trailing_byte() {
        let rom = [0x12, 0x00, 0xFF];
        let listing = Disassembler::new(&rom).listing().unwrap();
        assert_eq!(listing.lines().count(), 1);
    }
}
