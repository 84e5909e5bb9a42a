//! Constant values of the Chip-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// The lower memory space was historically used for the interpreter itself,
/// and now holds only the builtin fontset. Programs are loaded above it.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// First address of the builtin fontset.
pub const FONTSET_START: usize = 0x050;

/// Size of one font glyph in bytes, one byte per pixel row.
pub const FONT_GLYPH_SIZE: usize = 5;

pub const FONTSET_SIZE: usize = 80;

/// Levels of nesting allowed in the call stack.
///
/// The original RCA 1802 interpreter allocated room for 12 levels;
/// 16 is the commonly implemented depth. Calls beyond it are refused
/// and reported, not wrapped.
pub const STACK_SIZE: usize = 16;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_HEIGHT_MASK: usize = DISPLAY_HEIGHT - 1;

/// Width of one instruction in bytes.
pub const OPCODE_SIZE: usize = 2;

/// Instructions executed per second, approximating the pace of the
/// original machine. Deliberately decoupled from any frame rate.
pub const CPU_FREQUENCY: u64 = 720;

/// Count-down rate of the delay and sound timers.
pub const TIMER_FREQUENCY: u64 = 60;

/// Number of nanoseconds in a second
#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Number of keys on the keypad (0x0-0xF)
pub const KEY_COUNT: u8 = 16;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;

/// The builtin fontset.
///
/// 16 glyphs of 5 rows each; every byte is one row of 8 pixels,
/// most-significant bit leftmost.
#[rustfmt::skip]
pub const FONTSET: [u8; FONTSET_SIZE] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
