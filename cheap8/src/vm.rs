//! Virtual machine.
use std::{
    fmt::{self, Write},
    path::Path,
    time::Duration,
};

use rand::prelude::*;

use crate::{
    clock::Clock,
    constants::*,
    cpu::Cheap8Cpu,
    devices::KeyCode,
    error::Cheap8Result,
    faults::Faults,
    opcodes::{decode, Op, Opcode, Operands},
    DisplayBuffer,
};

pub struct Cheap8Vm {
    cpu: Cheap8Cpu,
    clock: Clock,
    timer: Clock,
    conf: Cheap8Conf,
}

impl Cheap8Vm {
    pub fn new(conf: Cheap8Conf) -> Self {
        Cheap8Vm {
            cpu: Cheap8Cpu::new(),
            clock: Clock::new(conf.cpu_frequency.unwrap_or(Hz(CPU_FREQUENCY)).into()),
            timer: Clock::new(conf.timer_frequency.unwrap_or(Hz(TIMER_FREQUENCY)).into()),
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Cheap8Conf {
        &self.conf
    }

    /// Load a program image and reinitialize the machine state.
    ///
    /// The image is copied verbatim into memory starting at the program
    /// region; bytes past the end of the address space are dropped.
    pub fn load_rom(&mut self, image: &[u8]) {
        self.cpu.load_program(image);
        self.clock.reset();
        self.timer.reset();
    }

    /// Read a program image from a file and load it.
    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Cheap8Result<()> {
        let image = std::fs::read(path)?;
        self.load_rom(&image);
        Ok(())
    }
}

/// Control-flow hint returned by a cycle, so cooperative collaborators
/// can react without inspecting the whole machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    Jump,
    /// The framebuffer changed and a repaint is due.
    Draw,
    /// The sound timer was set; the buzzer condition may have changed.
    Sound,
    /// The machine is stalled on `LD Vx, K` until a key is pressed.
    ///
    /// The instruction rewinds the program counter onto itself, so the
    /// scheduler keeps cycling and timers keep counting while it waits.
    KeyWait,
    /// An external stop request ended the scheduler loop.
    Interrupt,
}

/// VM Configuration Parameters.
#[derive(Default, Clone)]
pub struct Cheap8Conf {
    /// Instruction rate; defaults to the reference 720 per second.
    pub cpu_frequency: Option<Hz>,
    /// Timer count-down rate; defaults to 60 per second.
    pub timer_frequency: Option<Hz>,
}

/// Clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Cheap8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Request the scheduler loop to stop after the current cycle.
    pub fn stop(&mut self) {
        self.cpu.trap = true;
    }

    /// Run the scheduler loop until interrupted.
    ///
    /// Instruction cycles fire at the configured rate against the host
    /// clock; the timers count down on their own 60 Hz schedule, kept in
    /// step with whole cycles rather than drifting freely.
    pub fn run(&mut self) -> Flow {
        self.clock.reset();
        self.timer.reset();

        loop {
            if self.cpu.trap {
                self.cpu.trap = false;
                return Flow::Interrupt;
            }

            self.cycle();
        }
    }

    /// Run one scheduled iteration: idle until the cycle deadline,
    /// execute one instruction, then count the timers down if their own
    /// deadline has elapsed.
    pub fn cycle(&mut self) -> Flow {
        self.clock.wait();

        let flow = self.step();

        if self.timer.tick() {
            self.cpu.tick_delay();
            self.cpu.tick_sound();

            // Buzzer turns on while the sound timer counts down, and off
            // once it reaches zero.
            if self.cpu.sound_timer > 0 && !self.cpu.buzzer_state {
                self.cpu.buzzer_state = true;
            } else if self.cpu.sound_timer == 0 && self.cpu.buzzer_state {
                self.cpu.buzzer_state = false;
            }
        }

        flow
    }

    /// Execute up to `step_count` cycles back to back, without throttling
    /// and without ticking the timers.
    pub fn run_steps(&mut self, step_count: usize) -> Flow {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            if self.cpu.trap {
                self.cpu.trap = false;
                return Flow::Interrupt;
            }

            flow = self.step();
        }

        flow
    }

    /// One fetch-decode-execute cycle.
    pub fn step(&mut self) -> Flow {
        let word = self.cpu.opcode_word();

        let opcode = match decode(word) {
            Some(opcode) => opcode,
            None => {
                // No descriptor claims this word. Flag it and walk over
                // it; stalling here would only refetch the same garbage.
                self.cpu.raise_fault(Faults::BAD_OPCODE);
                self.cpu.pc += OPCODE_SIZE;
                return Flow::Ok;
            }
        };

        op_trace(opcode, word, &self.cpu);

        let operands = opcode.operands(word);

        // Handlers observe an already advanced program counter: a return
        // sets PC to the stack top, not stack top + 2, and the key-wait
        // rewind lands back on its own instruction.
        self.cpu.pc += OPCODE_SIZE;

        self.exec(opcode.op, operands)
    }

    /// Dispatch one decoded instruction against the machine state.
    fn exec(&mut self, op: Op, operands: Operands) -> Flow {
        // Operand presence is fixed per descriptor; fields absent from
        // the descriptor default to zero and are unused by their arm.
        let x = operands.x.unwrap_or(0) as usize;
        let y = operands.y.unwrap_or(0) as usize;
        let n = operands.n.unwrap_or(0);

        let mut flow = Flow::Ok;

        match op {
            // 0NNN has no defined emulation; flag it and move on.
            Op::CallMcr => {
                self.cpu.raise_fault(Faults::MCR_OPCODE);
            }
            Op::ClearScreen => {
                self.cpu.clear_display();
                self.cpu.screen_cleared = true;
                flow = Flow::Draw;
            }
            Op::Return => {
                if self.cpu.sp == 0 {
                    self.cpu.raise_fault(Faults::BAD_SP);
                } else {
                    self.cpu.sp -= 1;
                    self.cpu.pc = self.cpu.stack[self.cpu.sp] as usize;
                    flow = Flow::Jump;
                }
            }
            Op::Jump => {
                if (n as usize) < MEM_START {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    self.cpu.pc = n as usize;
                    flow = Flow::Jump;
                }
            }
            // A call target below the program region is flagged, but the
            // call still happens.
            Op::CallSubr => {
                if (n as usize) < MEM_START {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                }

                if self.cpu.sp >= STACK_SIZE {
                    self.cpu.raise_fault(Faults::BAD_STACK);
                } else {
                    self.cpu.stack[self.cpu.sp] = self.cpu.pc as Address;
                    self.cpu.sp += 1;
                    self.cpu.pc = n as usize;
                    flow = Flow::Jump;
                }
            }
            Op::SkipEq => {
                if self.cpu.registers[x] == n as u8 {
                    self.skip();
                }
            }
            Op::SkipNeq => {
                if self.cpu.registers[x] != n as u8 {
                    self.skip();
                }
            }
            Op::SkipEqReg => {
                if self.cpu.registers[x] == self.cpu.registers[y] {
                    self.skip();
                }
            }
            Op::SetConst => {
                self.cpu.registers[x] = n as u8;
            }
            // Carry flag is not touched.
            Op::AddConst => {
                self.cpu.registers[x] = self.cpu.registers[x].wrapping_add(n as u8);
            }
            Op::SetReg => {
                self.cpu.registers[x] = self.cpu.registers[y];
            }
            Op::OrReg => {
                self.cpu.registers[x] |= self.cpu.registers[y];
            }
            Op::AndReg => {
                self.cpu.registers[x] &= self.cpu.registers[y];
            }
            Op::XorReg => {
                self.cpu.registers[x] ^= self.cpu.registers[y];
            }
            // Sum is computed wider than 8 bits; VF reports the carry and
            // VX receives the low byte.
            Op::AddReg => {
                let sum = self.cpu.registers[x] as u16 + self.cpu.registers[y] as u16;
                self.cpu.registers[0xF] = (sum >= 0x100) as u8;
                self.cpu.registers[x] = (sum & 0xFF) as u8;
            }
            // VF is 1 when no borrow occurs, judged before subtracting.
            Op::SubReg => {
                let (a, b) = (self.cpu.registers[x], self.cpu.registers[y]);
                self.cpu.registers[0xF] = (a > b) as u8;
                self.cpu.registers[x] = a.wrapping_sub(b);
            }
            // Shift by exactly one bit; VF receives the shifted-out bit
            // of the pre-shift value.
            Op::ShrReg => {
                let a = self.cpu.registers[x];
                self.cpu.registers[0xF] = a & 1;
                self.cpu.registers[x] = a >> 1;
            }
            Op::RevSubReg => {
                let (a, b) = (self.cpu.registers[x], self.cpu.registers[y]);
                self.cpu.registers[0xF] = (b > a) as u8;
                self.cpu.registers[x] = b.wrapping_sub(a);
            }
            Op::ShlReg => {
                let a = self.cpu.registers[x];
                self.cpu.registers[0xF] = (a >> 7) & 1;
                self.cpu.registers[x] = a << 1;
            }
            Op::SkipNeqReg => {
                if self.cpu.registers[x] != self.cpu.registers[y] {
                    self.skip();
                }
            }
            Op::SetIndex => {
                self.cpu.index = n;
            }
            Op::JumpV0 => {
                let target = self.cpu.registers[0] as usize + n as usize;
                if target >= MEM_SIZE {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    self.cpu.pc = target;
                    flow = Flow::Jump;
                }
            }
            Op::Random => {
                self.cpu.registers[x] = thread_rng().gen::<u8>() & n as u8;
            }
            Op::Draw => {
                flow = self.exec_draw(x, y, n as usize);
            }
            Op::SkipKeyPressed => {
                let key = self.cpu.registers[x];
                if key >= KEY_COUNT {
                    self.cpu.raise_fault(Faults::BAD_INPUT);
                } else if self.cpu.key_state(key) {
                    self.skip();
                }
            }
            Op::SkipKeyNotPressed => {
                let key = self.cpu.registers[x];
                if key >= KEY_COUNT {
                    self.cpu.raise_fault(Faults::BAD_INPUT);
                } else if !self.cpu.key_state(key) {
                    self.skip();
                }
            }
            Op::SaveDelay => {
                self.cpu.registers[x] = self.cpu.delay_timer;
            }
            // Self-repeating while no key is held: rewinding the program
            // counter refetches this same instruction next cycle, so the
            // machine spins in place while the timers keep running.
            Op::WaitKey => {
                if let Some(key) = self.cpu.first_key() {
                    self.cpu.registers[x] = key;
                } else if self.cpu.pc - OPCODE_SIZE < MEM_START {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    self.cpu.pc -= OPCODE_SIZE;
                    flow = Flow::KeyWait;
                }
            }
            Op::SetDelay => {
                self.cpu.delay_timer = self.cpu.registers[x];
            }
            Op::SetSound => {
                self.cpu.sound_timer = self.cpu.registers[x];
                self.cpu.buzzer_state = self.cpu.sound_timer > 0;
                flow = Flow::Sound;
            }
            Op::AddIndex => {
                let target = self.cpu.index as usize + self.cpu.registers[x] as usize;
                if target >= MEM_SIZE {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    self.cpu.index = target as Address;
                }
            }
            Op::IndexFont => {
                let glyph = self.cpu.registers[x] as usize;
                self.cpu.index = (FONTSET_START + FONT_GLYPH_SIZE * glyph) as Address;
            }
            Op::StoreBcd => {
                let addr = self.cpu.index as usize;
                if addr + 2 >= MEM_SIZE {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    let val = self.cpu.registers[x];
                    self.cpu.ram[addr] = val / 100 % 10;
                    self.cpu.ram[addr + 1] = val / 10 % 10;
                    self.cpu.ram[addr + 2] = val % 10;
                }
            }
            Op::StoreRegs => {
                let addr = self.cpu.index as usize;
                let count = x + 1;
                if addr + count > MEM_SIZE {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    self.cpu.ram[addr..addr + count].copy_from_slice(&self.cpu.registers[..count]);
                }
            }
            Op::LoadRegs => {
                let addr = self.cpu.index as usize;
                let count = x + 1;
                if addr + count > MEM_SIZE {
                    self.cpu.raise_fault(Faults::BAD_MEMORY);
                } else {
                    self.cpu.registers[..count].copy_from_slice(&self.cpu.ram[addr..addr + count]);
                }
            }
        }

        flow
    }

    /// Advance PC over the next instruction, unless the extra advance
    /// would leave the addressable space.
    #[inline]
    fn skip(&mut self) {
        if self.cpu.pc + OPCODE_SIZE >= MEM_SIZE {
            self.cpu.raise_fault(Faults::BAD_MEMORY);
        } else {
            self.cpu.pc += OPCODE_SIZE;
        }
    }

    /// DXYN: XOR an 8-wide, N-tall sprite read from I into the
    /// framebuffer at (VX mod 64, VY mod 32).
    ///
    /// Rows that run past the bottom edge continue from row 0; columns
    /// shifted past the right edge are dropped, not wrapped. VF reports
    /// whether any previously lit pixel was erased.
    fn exec_draw(&mut self, x: usize, y: usize, n: usize) -> Flow {
        if n == 0 {
            return Flow::Ok;
        }

        let col = self.cpu.registers[x] as usize % DISPLAY_WIDTH;
        let mut row = self.cpu.registers[y] as usize % DISPLAY_HEIGHT;

        self.cpu.registers[0xF] = 0;

        for offset in 0..n {
            let addr = self.cpu.index as usize + offset;
            if addr >= MEM_SIZE {
                // Rows already drawn stay on screen.
                self.cpu.raise_fault(Faults::BAD_MEMORY);
                break;
            }

            let sprite = self.cpu.ram[addr] as u64;
            let line = if col + 8 > DISPLAY_WIDTH {
                sprite >> (col + 8 - DISPLAY_WIDTH)
            } else {
                sprite << (DISPLAY_WIDTH - col - 8)
            };

            let old = self.cpu.display[row];
            if old & line != 0 {
                self.cpu.registers[0xF] = 1;
            }
            self.cpu.display[row] = old ^ line;

            row = (row + 1) & DISPLAY_HEIGHT_MASK;
        }

        self.cpu.redraw_pending = true;
        Flow::Draw
    }
}

/// Read-only state snapshot for external observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSnapshot {
    pub registers: [u8; REGISTER_COUNT],
    pub index: Address,
    pub pc: u16,
    pub sp: u8,
    pub stack: [Address; STACK_SIZE],
    pub delay_timer: u8,
    pub sound_timer: u8,
    /// The raw instruction word PC currently points at.
    pub opcode: u16,
    pub faults: Faults,
}

/// Observer access for the rendering, audio and debugger collaborators.
impl Cheap8Vm {
    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            registers: self.cpu.registers,
            index: self.cpu.index,
            pc: self.cpu.pc as u16,
            sp: self.cpu.sp as u8,
            stack: self.cpu.stack,
            delay_timer: self.cpu.delay_timer,
            sound_timer: self.cpu.sound_timer,
            opcode: self.cpu.opcode_word(),
            faults: self.cpu.faults,
        }
    }

    pub fn display_buffer(&self) -> &DisplayBuffer {
        &self.cpu.display
    }

    /// Raw view of the whole address space.
    pub fn ram(&self) -> &[u8] {
        &self.cpu.ram[..]
    }

    pub fn faults(&self) -> Faults {
        self.cpu.faults
    }

    /// Clear the sticky fault register. The core never does this itself;
    /// it is the external observer's operation.
    pub fn clear_faults(&mut self) {
        self.cpu.faults.clear_all();
    }

    /// Consume the pending-repaint signal. Returns whether it was set.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.cpu.redraw_pending)
    }

    /// Consume the screen-cleared signal. Returns whether it was set.
    pub fn take_screen_cleared(&mut self) -> bool {
        std::mem::take(&mut self.cpu.screen_cleared)
    }

    /// Whether the audio collaborator should currently emit a tone.
    pub fn sound_active(&self) -> bool {
        self.cpu.buzzer_state
    }

    /// Returns the contents of the display as a human readable string.
    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for row in self.cpu.display.iter() {
            for col in 0..DISPLAY_WIDTH {
                if row >> (DISPLAY_WIDTH - 1 - col) & 1 == 1 {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(opcode: &Opcode, word: u16, cpu: &Cheap8Cpu) {
    log::trace!("{:03X}: {word:04X} {}", cpu.pc, opcode.format(word));
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: &Opcode, _: u16, _: &Cheap8Cpu) {}
