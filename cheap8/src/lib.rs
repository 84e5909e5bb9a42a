mod clock;
pub mod constants;
mod cpu;
mod devices;
mod disasm;
mod error;
mod faults;
mod opcodes;
mod vm;

pub use self::vm::Hz;

/// Framebuffer rows. Bit 63 of a row is the leftmost column; a set bit
/// is a lit pixel.
pub type DisplayBuffer = [u64; constants::DISPLAY_HEIGHT];

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        devices::KeyCode,
        disasm::Disassembler,
        error::{Cheap8Error, Cheap8Result},
        faults::Faults,
        opcodes::{decode, Op, Opcode, Operands, OPCODES},
        vm::{Cheap8Conf, Cheap8Vm, CoreSnapshot, Flow},
    };
}
