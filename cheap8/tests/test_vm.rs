//! Program loading, the end-to-end contract and observer access.
use cheap8::constants::{FONTSET, FONTSET_START, MEM_SIZE, MEM_START};
use cheap8::prelude::*;

/// Loading a program reproduces it byte for byte at the program region.
#[test]
fn test_load_roundtrip() {
    let image: Vec<u8> = (0..1000u16).map(|i| (i * 7 & 0xFF) as u8).collect();

    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&image);

    assert_eq!(&vm.ram()[MEM_START..MEM_START + image.len()], &image[..]);
    assert!(vm.ram()[MEM_START + image.len()..].iter().all(|&b| b == 0));
}

/// A full-capacity image fills memory to the last byte; anything past
/// capacity is silently dropped.
#[test]
fn test_load_truncates_oversized_image() {
    let capacity = MEM_SIZE - MEM_START;
    let image: Vec<u8> = (0..capacity + 100).map(|i| (i & 0xFF) as u8).collect();

    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&image);

    assert_eq!(&vm.ram()[MEM_START..], &image[..capacity]);
    assert!(vm.faults().is_empty());
}

/// The reserved regions stay zero and the fontset sits at its fixed
/// location.
#[test]
fn test_memory_layout_after_load() {
    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&[0x12, 0x00]);

    assert!(vm.ram()[..FONTSET_START].iter().all(|&b| b == 0));
    assert_eq!(
        &vm.ram()[FONTSET_START..FONTSET_START + FONTSET.len()],
        &FONTSET[..]
    );
    assert!(vm.ram()[FONTSET_START + FONTSET.len()..MEM_START]
        .iter()
        .all(|&b| b == 0));
}

/// The two-instruction sanity program from the architecture docs:
/// V0 := 5 then V0 += 3.
#[test]
fn test_end_to_end() {
    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&[
        0x60, 0x05, // LD v0, 5
        0x70, 0x03, // ADD v0, 3
    ]);

    vm.run_steps(2);

    let snap = vm.snapshot();
    assert_eq!(snap.registers[0], 8);
    assert_eq!(snap.pc, 0x204);
    assert!(snap.faults.is_empty());
}

#[test]
fn test_snapshot_reports_current_instruction() {
    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&[0x60, 0x05, 0x70, 0x03]);

    assert_eq!(vm.snapshot().opcode, 0x6005);
    vm.run_steps(1);
    assert_eq!(vm.snapshot().opcode, 0x7003);
}

/// Reloading a program gives a clean machine, nothing leaks from the
/// previous run.
#[test]
fn test_reload_resets_state() {
    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&[
        0x60, 0xAA, // LD v0, 0xAA
        0x03, 0x33, // SYS 0x333 ; raises the unsupported-opcode fault
        0xA2, 0x08, // LD I, 0x208
        0xD0, 0x01, // DRW v0, v0, 1
        0xFF, 0x00,
    ]);
    vm.run_steps(4);
    assert!(!vm.faults().is_empty());

    vm.load_rom(&[0x12, 0x00]);
    let snap = vm.snapshot();
    assert_eq!(snap.registers, [0; 16]);
    assert_eq!(snap.index, 0);
    assert_eq!(snap.pc as usize, MEM_START);
    assert!(snap.faults.is_empty());
    assert!(vm.display_buffer().iter().all(|&row| row == 0));
    assert!(!vm.take_redraw());
}

/// The disassembly view agrees with the decoder on a small program.
#[test]
fn test_disassembler_listing() {
    let rom = [0x60, 0x05, 0x70, 0x03, 0xD0, 0x11];
    let listing = Disassembler::new(&rom).listing().unwrap();

    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(
        lines,
        [
            "0200: 6005  LD V0 5",
            "0202: 7003  ADD V0 3",
            "0204: D011  DRW V0 V1 1",
        ]
    );
}

#[test]
fn test_dump_display() {
    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom(&[
        0xA2, 0x06, // LD I, 0x206
        0xD0, 0x01, // DRW v0, v0, 1
        0x00, 0x00,
        0x80, 0x00, // sprite row: single pixel at the left edge
    ]);
    vm.run_steps(2);

    let dump = vm.dump_display().unwrap();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), 32);
    assert!(lines[0].starts_with("#."));
    assert!(lines.iter().all(|line| line.len() == 64));
    assert!(lines[1..].iter().all(|line| !line.contains('#')));
}
