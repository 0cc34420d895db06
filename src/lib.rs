// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD
#![warn(missing_docs)]

//! Library providing an Intcode virtual machine and three ways of driving it
//!
//! The VM implements all of the [Opcodes] and [Parameter Modes] of the completed Intcode
//! computer from [Day 9]. The decode/execute loop lives in [Vm]; the places where a program
//! needs to talk to the outside world (the `IN` and `OUT` instructions) go through a [Port], so
//! the same loop is shared by every execution protocol:
//!
//! * [blocking] runs a VM on its own thread, with one channel for input, one for output, and a
//!   completion signal.
//! * [tagged] runs a VM on its own thread, reporting every event as a [Message] on a single
//!   channel.
//! * [step] runs a VM on the caller's thread, returning control after every output, whenever
//!   input runs dry, and on halt.
//!
//! # Example
//!
//! ```rust
//! use intcode::prelude::*;
//! let mut vm = Vm::new(vec![104, 1024, 99]);
//!
//! assert_eq!(
//!     vm.run_through_inputs(std::iter::empty()).unwrap(),
//!     (vec![1024], State::Halted)
//! );
//! ```
//!
//! Programs are usually read from their comma-separated text form:
//!
//! ```rust
//! use intcode::prelude::*;
//! let program: Program = "3,0,4,0,99".parse().unwrap();
//!
//! let mut machine = Machine::new(program.spawn());
//! assert_eq!(machine.step([]).unwrap(), Status::AwaitingInput);
//! assert_eq!(machine.step([42]).unwrap(), Status::Output(42));
//! assert_eq!(machine.step([]).unwrap(), Status::Halted);
//! ```
//!
//! [Opcodes]: https://esolangs.org/wiki/Intcode#Opcodes
//! [Parameter Modes]: https://esolangs.org/wiki/Intcode#Parameter_Modes
//! [Day 9]: https://adventofcode.com/2019/day/9
//! [Message]: tagged::Message

mod internals;
/// The growable memory backing each VM instance
mod mmu;

pub mod blocking;
pub mod config;
pub mod program;
pub mod step;
pub mod tagged;
pub mod trace;

use std::fmt::{self, Display};
use std::io;
use std::ops::{ControlFlow, Index};
use std::thread::{self, JoinHandle};

pub use config::ChannelConfig;
pub use program::{ParseProgramError, Program};

use mmu::Memory;
use trace::Trace;

/// A small module that re-exports items needed when working with the Intcode VM
pub mod prelude {
    pub use crate::program::Program;
    pub use crate::step::{Machine, Status};
    pub use crate::{Fault, Port, State, Vm};
}

/// The reason the VM stopped executing and returned control to its caller.
///
/// [Awaiting](State::Awaiting) means that there are more instructions to execute, but the next
/// instruction is an `IN` and the [Port] had no input to give. The instruction pointer is left on
/// that `IN`, so it will be executed again when the VM is resumed.
///
/// [Yielded](State::Yielded) means an `OUT` instruction was executed and the [Port] asked for
/// control to be returned.
///
/// [Halted](State::Halted) means that a `HALT` instruction has been reached. Resuming a halted VM
/// immediately reports [Halted](State::Halted) again.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// Execution is awaiting input
    Awaiting,
    /// Execution paused right after producing an output
    Yielded,
    /// Execution has halted
    Halted,
}

/// A fatal error in a running VM. Faults are never recovered from: the VM that raised one must be
/// discarded.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum Fault {
    /// An invalid opcode was encountered
    #[error("invalid opcode {opcode} at ip={ip} (instruction {instruction})")]
    InvalidOpcode {
        /// Address of the faulting instruction
        ip: i64,
        /// The full instruction word
        instruction: i64,
        /// The decoded opcode (`instruction % 100`)
        opcode: i64,
    },
    /// An unknown parameter mode was encountered
    #[error("invalid parameter mode {mode} at ip={ip} (instruction {instruction}, parameter {offset})")]
    InvalidMode {
        /// Address of the faulting instruction
        ip: i64,
        /// The full instruction word
        instruction: i64,
        /// Which parameter (starting at 1) had the bad mode
        offset: i64,
        /// The mode digit
        mode: i64,
    },
    /// A negative memory address was accessed
    #[error("access to negative address {address} at ip={ip}")]
    NegativeAddress {
        /// Address of the faulting instruction
        ip: i64,
        /// The address that was accessed
        address: i64,
    },
    /// An instruction tried to write to an immediate-mode parameter
    #[error("write to immediate-mode parameter {offset} at ip={ip} (instruction {instruction})")]
    WriteToImmediate {
        /// Address of the faulting instruction
        ip: i64,
        /// The full instruction word
        instruction: i64,
        /// Which parameter (starting at 1) was the destination
        offset: i64,
    },
}

/// An error reported by one of the threaded protocols
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The VM faulted
    #[error(transparent)]
    Fault(#[from] Fault),
    /// The controller dropped the input channel while the VM was waiting on it
    #[error("input channel closed while the program was waiting for input")]
    InputClosed,
    /// The controller dropped the receiving end of the output channel
    #[error("output channel closed while the program was producing output")]
    OutputClosed,
    /// The worker thread went away without reporting how it finished
    #[error("worker thread exited without reporting completion")]
    WorkerLost,
    /// The worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Parameter mode for Intcode instruction
///
/// Intcode instruction parameters each have a mode:  [positional], [immediate], or [relative].
///
/// When executing an intcode instruction, the instruction's parameters are interpreted in
/// accordance with their associated modes.
///
/// [positional]: Mode::Positional
/// [immediate]: Mode::Immediate
/// [relative]: Mode::Relative
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Mode {
    /// Positional Mode
    ///
    /// A parameter in positional mode evaluates to the value at the address specified by the
    /// parameter.
    Positional = 0,
    /// Immediate Mode
    ///
    /// A parameter in immediate mode evaluates directly to the value specified. Instructions which
    /// write to memory may not use immediate mode for their destinations.
    #[doc(alias = "#")]
    Immediate = 1,
    /// Relative Mode
    ///
    /// A parameter in relative mode evaluates to the value at the address specified by the
    /// parameter, added to the relative base, which starts out as `0` and is adjusted by the
    /// `RBO` instruction.
    #[doc(alias = "@")]
    Relative = 2,
}

impl Mode {
    /// Extract the mode of parameter `offset` (starting at 1) from `instruction`.
    ///
    /// Given a 5 digit number, digits ABCDE are used as follows:
    /// DE is the two-digit opcode, C is the 1st parameter's mode, B is the 2nd parameter's mode,
    /// and A is the 3rd parameter's mode. On failure, returns the unrecognized digit.
    pub fn of(instruction: i64, offset: u32) -> Result<Self, i64> {
        let digit = (instruction / 10_i64.pow(offset + 1)) % 10;
        Self::try_from(digit)
    }
}

impl TryFrom<i64> for Mode {
    type Error = i64;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            0 => Ok(Mode::Positional),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            _ => Err(i),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Positional => Ok(()),
            Mode::Immediate => write!(fmt, "#"),
            Mode::Relative => write!(fmt, "@"),
        }
    }
}

/// An Intcode operation
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(missing_docs, reason = "trivial")]
pub enum Opcode {
    Add = 1,
    Mul = 2,
    In = 3,
    Out = 4,
    Jnz = 5,
    Jz = 6,
    Lt = 7,
    Eq = 8,
    Rbo = 9,
    Halt = 99,
}

impl Opcode {
    /// Number of parameters the instruction takes
    pub const fn param_count(self) -> u32 {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => 3,
            Opcode::Jnz | Opcode::Jz => 2,
            Opcode::In | Opcode::Out | Opcode::Rbo => 1,
            Opcode::Halt => 0,
        }
    }
}

impl TryFrom<i64> for Opcode {
    type Error = i64;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            1 => Ok(Opcode::Add),
            2 => Ok(Opcode::Mul),
            3 => Ok(Opcode::In),
            4 => Ok(Opcode::Out),
            5 => Ok(Opcode::Jnz),
            6 => Ok(Opcode::Jz),
            7 => Ok(Opcode::Lt),
            8 => Ok(Opcode::Eq),
            9 => Ok(Opcode::Rbo),
            99 => Ok(Opcode::Halt),
            _ => Err(i),
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::In => "IN",
            Opcode::Out => "OUT",
            Opcode::Jnz => "JNZ",
            Opcode::Jz => "JZ",
            Opcode::Lt => "LT",
            Opcode::Eq => "EQ",
            Opcode::Rbo => "RBO",
            Opcode::Halt => "HALT",
        };
        f.write_str(mnemonic)
    }
}

/// The two points where a running program interacts with whatever is driving it.
///
/// Each execution protocol supplies its own `Port`: a channel pair, a message channel, or a
/// plain queue.
pub trait Port {
    /// Called when an `IN` instruction is about to execute.
    ///
    /// Returning [`None`] suspends the VM with [State::Awaiting] before the instruction has any
    /// effect.
    fn input(&mut self) -> Option<i64>;

    /// Called with the value of each executed `OUT` instruction.
    ///
    /// Returning [`ControlFlow::Break`] suspends the VM with [State::Yielded]; the instruction
    /// pointer has already moved past the `OUT`.
    fn output(&mut self, value: i64) -> ControlFlow<()>;
}

impl<P: Port + ?Sized> Port for &mut P {
    fn input(&mut self) -> Option<i64> {
        (**self).input()
    }

    fn output(&mut self, value: i64) -> ControlFlow<()> {
        (**self).output(value)
    }
}

/// A [Port] fed from an iterator, collecting all outputs
struct Buffered<I> {
    inputs: I,
    outputs: Vec<i64>,
}

impl<I: Iterator<Item = i64>> Port for Buffered<I> {
    fn input(&mut self) -> Option<i64> {
        self.inputs.next()
    }

    fn output(&mut self, value: i64) -> ControlFlow<()> {
        self.outputs.push(value);
        ControlFlow::Continue(())
    }
}

/// An Intcode virtual machine instance: private memory, an instruction pointer, and a relative
/// base. Instances never share state, so any number of them can run side by side.
#[derive(Clone)]
pub struct Vm {
    ip: i64,
    rel_base: i64,
    mem: Memory,
    fault: Option<Fault>,
    trace: Option<Trace>,
}

// ignore the trace field
impl PartialEq for Vm {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip
            && self.rel_base == other.rel_base
            && self.fault == other.fault
            && self.mem == other.mem
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Vm")
            .field("mem_len", &self.mem.len())
            .field("mem", &self.mem)
            .field("rbo", &self.rel_base)
            .field("ip", &self.ip)
            .field("fault", &self.fault)
            .field("tracing", &self.trace.is_some())
            .finish()
    }
}

impl Index<u64> for Vm {
    type Output = i64;

    fn index(&self, i: u64) -> &Self::Output {
        &self.mem[i]
    }
}

impl Vm {
    /// Create a new VM. Collects `code` into the starting memory state.
    pub fn new(code: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ip: 0,
            rel_base: 0,
            mem: code.into_iter().collect(),
            fault: None,
            trace: None,
        }
    }

    /// The address of the next instruction to execute
    pub fn ip(&self) -> i64 {
        self.ip
    }

    /// The current relative base
    pub fn rel_base(&self) -> i64 {
        self.rel_base
    }

    /// The fault that stopped this VM, if any. Once set, it never runs another instruction.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// One past the highest address accessed so far, including any cells grown during execution
    pub fn mem_len(&self) -> u64 {
        self.mem.len()
    }

    /// A dense copy of memory as it currently stands, from `0` up to [Vm::mem_len].
    ///
    /// This allocates every cell up to the highest address ever accessed, so for a program that
    /// touched far-away addresses, use [Vm::mem_get] or [Vm::mem_range] instead.
    pub fn memory(&self) -> Vec<i64> {
        self.mem.get_range(0..self.mem.len())
    }

    /// Copy out `len` cells starting at `start`. Cells beyond the end of memory read as `0`.
    pub fn mem_range(&self, start: usize, len: usize) -> Vec<i64> {
        let end = start.saturating_add(len);
        self.mem.get_range(start as u64..end as u64)
    }

    /// Manually set a memory location, growing memory if needed
    #[doc(alias("poke", "write"))]
    pub fn mem_override(&mut self, location: usize, value: i64) {
        *self.mem.cell(location as u64) = value;
    }

    /// Get the memory at `address`. Addresses beyond the end of memory read as `0` and don't
    /// grow it.
    #[doc(alias = "peek")]
    pub fn mem_get(&self, address: usize) -> i64 {
        self.mem.peek(address as u64)
    }

    /// Execute a single instruction.
    ///
    /// Returns `Ok(None)` if execution can simply continue, or `Ok(Some(state))` if control has to
    /// go back to the caller.
    ///
    /// A fault is terminal: it is remembered, and every later call returns it again without
    /// executing anything or touching `port`.
    pub fn exec_instruction<P: Port + ?Sized>(
        &mut self,
        port: &mut P,
    ) -> Result<Option<State>, Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        let result = self.exec_unchecked(port);
        if let Err(fault) = result {
            tracing::debug!(ip = self.ip, "{fault}");
            self.fault = Some(fault);
        }
        result
    }

    fn exec_unchecked<P: Port + ?Sized>(&mut self, port: &mut P) -> Result<Option<State>, Fault> {
        let instruction = self.fetch(0)?;
        let opcode = Self::parse_op(instruction).map_err(|opcode| Fault::InvalidOpcode {
            ip: self.ip,
            instruction,
            opcode,
        })?;
        tracing::trace!(
            ip = self.ip,
            rbo = self.rel_base,
            instruction,
            "{opcode}"
        );

        match opcode {
            Opcode::Add => self.op3(instruction, i64::wrapping_add),
            Opcode::Mul => self.op3(instruction, i64::wrapping_mul),
            Opcode::In => {
                // a bad destination faults before anything waits on input
                let dest = self.resolve_dest(instruction, 1)?;
                let Some(input) = port.input() else {
                    tracing::debug!(ip = self.ip, "awaiting input");
                    return Ok(Some(State::Awaiting));
                };
                self.record(instruction, &[(self.raw_param(1), input)]);
                *self.mem.cell(dest) = input;
                self.ip += 2;
                Ok(None)
            }
            Opcode::Out => {
                let value = self.resolve_param(instruction, 1)?;
                self.record(instruction, &[(self.raw_param(1), value)]);
                self.ip += 2;
                match port.output(value) {
                    ControlFlow::Continue(()) => Ok(None),
                    ControlFlow::Break(()) => Ok(Some(State::Yielded)),
                }
            }
            Opcode::Jnz => self.jump(instruction, |v| v != 0),
            Opcode::Jz => self.jump(instruction, |v| v == 0),
            Opcode::Lt => self.op3(instruction, |a, b| i64::from(a < b)),
            Opcode::Eq => self.op3(instruction, |a, b| i64::from(a == b)),
            Opcode::Rbo => {
                let offset = self.resolve_param(instruction, 1)?;
                self.record(instruction, &[(self.raw_param(1), offset)]);
                self.rel_base = self.rel_base.wrapping_add(offset);
                self.ip += 2;
                Ok(None)
            }
            Opcode::Halt => {
                self.record(instruction, &[]);
                tracing::debug!(ip = self.ip, "halted");
                Ok(Some(State::Halted))
            }
        }
    }

    /// Execute instructions until the program halts, or `port` asks for control to be returned.
    pub fn run<P: Port + ?Sized>(&mut self, port: &mut P) -> Result<State, Fault> {
        loop {
            if let Some(state) = self.exec_instruction(port)? {
                break Ok(state);
            }
        }
    }

    /// Execute until either the program halts, or it tries to read nonexistent input.
    /// Returns `Ok((v, s))`, where `v` is a [`Vec<i64>`] containing all outputs that it produced,
    /// and `s` is the [`State`] at the time it stopped, which is never [State::Yielded].
    ///
    /// If it stopped on [State::Awaiting], it can be resumed by calling this again with more
    /// input.
    ///
    /// On error, it will return the [`Fault`] that stopped it.
    pub fn run_through_inputs(
        &mut self,
        inputs: impl IntoIterator<Item = i64>,
    ) -> Result<(Vec<i64>, State), Fault> {
        let mut port = Buffered {
            inputs: inputs.into_iter(),
            outputs: Vec::new(),
        };
        let state = self.run(&mut port)?;
        Ok((port.outputs, state))
    }
}

/// Translate how a VM run by a worker thread stopped into what gets reported to the controller
pub(crate) fn worker_outcome(result: Result<State, Fault>) -> Result<(), Error> {
    match result {
        Ok(State::Halted) => Ok(()),
        Ok(State::Awaiting) => Err(Error::InputClosed),
        Ok(State::Yielded) => Err(Error::OutputClosed),
        Err(fault) => Err(Error::Fault(fault)),
    }
}

/// Start `f` on a dedicated, named VM thread
pub(crate) fn spawn_worker<T, F>(f: F) -> Result<JoinHandle<T>, Error>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Ok(thread::Builder::new()
        .name(String::from("intcode-vm"))
        .spawn(f)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::empty;

    /// Example program from day 2
    #[test]
    fn self_add() {
        let mut vm = Vm::new([1, 0, 0, 0, 99]);
        assert_eq!(vm.run_through_inputs(empty()), Ok((vec![], State::Halted)));
        assert_eq!(vm[0], 2);
        assert_eq!(vm.memory(), &[2, 0, 0, 0, 99]);
    }

    /// Example program from day 9, which takes no input and outputs its own code
    #[test]
    fn quine() {
        let quine_code = vec![
            109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
        ];
        let mut vm = Vm::new(quine_code.clone());
        let (outputs, State::Halted) = vm.run_through_inputs(empty()).unwrap() else {
            panic!("Did not halt");
        };
        assert_eq!(quine_code, outputs);
        // the counter lives at 100 and the flag at 101, both past the end of the program
        assert_eq!(vm.memory().len(), 102);
    }

    /// Example program from day 9, which "should output a 16-digit number"
    #[test]
    fn output_sixteen_digit() {
        let mut vm = Vm::new([1102, 34915192, 34915192, 7, 4, 7, 99, 0]);
        let (outputs, State::Halted) = vm.run_through_inputs(empty()).unwrap() else {
            panic!("Did not halt");
        };
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].to_string().len(), 16);
    }

    #[test]
    fn immediate_equality() {
        // outputs whether the input equals 8
        let template = Vm::new([3, 3, 1108, -1, 8, 3, 4, 3, 99]);
        for (input, expected) in [(8, 1), (7, 0), (9, 0)] {
            let mut vm = template.clone();
            assert_eq!(
                vm.run_through_inputs([input]),
                Ok((vec![expected], State::Halted))
            );
        }
    }

    #[test]
    fn immediate_less_than() {
        // outputs whether the input is less than 8
        let template = Vm::new([3, 3, 1107, -1, 8, 3, 4, 3, 99]);
        for (input, expected) in [(7, 1), (8, 0), (-100, 1)] {
            let mut vm = template.clone();
            assert_eq!(
                vm.run_through_inputs([input]),
                Ok((vec![expected], State::Halted))
            );
        }
    }

    #[test]
    fn memory_grows_on_far_write() {
        // store 5 at address 1000, then output address 500
        let mut vm = Vm::new([1101, 2, 3, 1000, 4, 500, 99]);
        assert_eq!(vm.run_through_inputs(empty()), Ok((vec![0], State::Halted)));
        assert_eq!(vm.memory().len(), 1001);
        assert_eq!(vm[1000], 5);
        assert!(vm.memory()[7..1000].iter().all(|&c| c == 0));
    }

    #[test]
    fn far_addresses_grow_sparsely() {
        let mut vm = Vm::new([4, 1 << 60, 99]);
        assert_eq!(vm.run_through_inputs(empty()), Ok((vec![0], State::Halted)));
        assert_eq!(vm.mem_len(), (1 << 60) + 1);

        // store 7 at the highest address there is, then read it back
        let mut vm = Vm::new([1101, 7, 0, i64::MAX, 4, i64::MAX, 99]);
        assert_eq!(vm.run_through_inputs(empty()), Ok((vec![7], State::Halted)));
        assert_eq!(vm[i64::MAX as u64], 7);
        assert_eq!(vm.mem_len(), i64::MAX as u64 + 1);
        assert_eq!(vm.mem_range(6, 2), vec![99, 0]);
    }

    #[test]
    fn mem_range_saturates() {
        let vm = Vm::new([1, 2, 3]);
        assert_eq!(vm.mem_range(1, 4), vec![2, 3, 0, 0]);
        // the end is clamped rather than overflowing
        assert_eq!(vm.mem_range(usize::MAX - 1, 5), vec![0]);
    }

    /// A fault is remembered, and nothing runs after it
    #[test]
    fn fault_is_terminal() {
        let mut vm = Vm::new([104, 1, 77]);
        let fault = Fault::InvalidOpcode {
            ip: 2,
            instruction: 77,
            opcode: 77,
        };
        assert_eq!(vm.run_through_inputs(empty()), Err(fault));
        assert_eq!(vm.fault(), Some(fault));

        vm.mem_override(2, 99);
        vm.start_trace();
        assert_eq!(vm.run_through_inputs([5]), Err(fault));
        assert!(vm.end_trace().unwrap().0.is_empty());
        assert_eq!(vm.ip(), 2);
    }

    /// `IN` checks its destination before asking for input
    #[test]
    fn bad_input_destination_consumes_nothing() {
        let mut vm = Vm::new([303, 0, 99]);
        let mut inputs = [1, 2].into_iter();
        assert_eq!(
            vm.run_through_inputs(&mut inputs),
            Err(Fault::InvalidMode {
                ip: 0,
                instruction: 303,
                offset: 1,
                mode: 3
            })
        );
        assert_eq!(inputs.next(), Some(1));
    }

    #[test]
    fn read_past_end_grows() {
        let mut vm = Vm::new([4, 50, 99]);
        assert_eq!(vm.run_through_inputs(empty()), Ok((vec![0], State::Halted)));
        assert_eq!(vm.memory().len(), 51);
    }

    /// Ensure that running out of input leaves the VM in a sane state that can be resumed from
    #[test]
    fn missing_input_recoverable() {
        let mut vm = Vm::new(vec![3, 10, 4, 10, 99]);
        let old_state = vm.clone();

        let first_run = vm.run_through_inputs(empty());

        assert_eq!(first_run, Ok((vec![], State::Awaiting)));
        assert_eq!(vm, old_state);

        assert_eq!(vm.run_through_inputs([1]), Ok((vec![1], State::Halted)));
    }

    #[test]
    fn halted_stays_halted() {
        let mut vm = Vm::new([99]);
        assert_eq!(vm.run_through_inputs(empty()), Ok((vec![], State::Halted)));
        assert_eq!(vm.run_through_inputs([1, 2]), Ok((vec![], State::Halted)));
        assert_eq!(vm.ip(), 0);
    }

    #[test]
    fn invalid_opcode() {
        let mut vm = Vm::new([77]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Err(Fault::InvalidOpcode {
                ip: 0,
                instruction: 77,
                opcode: 77
            })
        );
    }

    #[test]
    fn invalid_opcode_after_jump() {
        // jump to 4, which holds 1277
        let mut vm = Vm::new([1105, 1, 4, 99, 1277]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Err(Fault::InvalidOpcode {
                ip: 4,
                instruction: 1277,
                opcode: 77
            })
        );
    }

    #[test]
    fn invalid_mode() {
        let mut vm = Vm::new([1301, 0, 0, 0, 99]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Err(Fault::InvalidMode {
                ip: 0,
                instruction: 1301,
                offset: 1,
                mode: 3
            })
        );
    }

    /// Mode digits of parameters the instruction doesn't take are never looked at
    #[test]
    fn unused_mode_digits_ignored() {
        let mut vm = Vm::new([104, 7, 90004, 0, 99]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Ok((vec![7, 104], State::Halted))
        );
    }

    #[test]
    fn negative_address() {
        let mut vm = Vm::new([4, -1, 99]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Err(Fault::NegativeAddress { ip: 0, address: -1 })
        );

        let mut vm = Vm::new([109, -5, 204, 2, 99]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Err(Fault::NegativeAddress { ip: 2, address: -3 })
        );
    }

    #[test]
    fn write_to_immediate() {
        let mut vm = Vm::new([11101, 1, 1, 0, 99]);
        assert_eq!(
            vm.run_through_inputs(empty()),
            Err(Fault::WriteToImmediate {
                ip: 0,
                instruction: 11101,
                offset: 3
            })
        );
    }

    #[test]
    fn mode_digits() {
        assert_eq!(Mode::of(1002, 1), Ok(Mode::Positional));
        assert_eq!(Mode::of(1002, 2), Ok(Mode::Immediate));
        assert_eq!(Mode::of(21002, 3), Ok(Mode::Relative));
        assert_eq!(Mode::of(41002, 3), Err(4));
    }
}
