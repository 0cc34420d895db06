// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! The non-blocking step protocol
//!
//! A [Machine] runs its VM on the caller's thread. Each call to [Machine::step] runs until the
//! program outputs a value, needs input that hasn't been queued, or halts, and then returns.
//! Nothing ever blocks, so one thread can keep any number of machines going by stepping each in
//! turn:
//!
//! ```
//! use intcode::prelude::*;
//!
//! // each machine echoes its first input, then halts
//! let program: Program = "3,0,4,0,99".parse().unwrap();
//! let mut machines: Vec<Machine> = (0..10)
//!     .map(|i| Machine::with_inputs(program.spawn(), [i * i]))
//!     .collect();
//!
//! let mut squares = vec![];
//! while !machines.is_empty() {
//!     machines.retain_mut(|m| match m.step([]).unwrap() {
//!         Status::Output(n) => {
//!             squares.push(n);
//!             true
//!         }
//!         Status::AwaitingInput => true,
//!         Status::Halted => false,
//!     });
//! }
//! assert_eq!(squares, vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
//! ```

use std::collections::VecDeque;
use std::ops::ControlFlow;

use crate::{Fault, Port, State, Vm};

/// Why [Machine::step] returned
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// The program output this value
    Output(i64),
    /// The program needs input and none is queued. The `IN` instruction will run on the next step
    /// that has input for it.
    AwaitingInput,
    /// The program halted. Stepping again reports this again.
    Halted,
}

/// A [Port] reading from the machine's input queue that yields on every output
struct QueuePort<'a> {
    pending: &'a mut VecDeque<i64>,
    output: Option<i64>,
}

impl Port for QueuePort<'_> {
    fn input(&mut self) -> Option<i64> {
        self.pending.pop_front()
    }

    fn output(&mut self, value: i64) -> ControlFlow<()> {
        self.output = Some(value);
        ControlFlow::Break(())
    }
}

/// A VM together with a queue of input it hasn't consumed yet
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    vm: Vm,
    pending: VecDeque<i64>,
}

impl Machine {
    /// Wrap `vm` with an empty input queue
    pub fn new(vm: Vm) -> Self {
        Self::with_inputs(vm, [])
    }

    /// Wrap `vm` with `inputs` already queued
    pub fn with_inputs(vm: Vm, inputs: impl IntoIterator<Item = i64>) -> Self {
        Self {
            vm,
            pending: inputs.into_iter().collect(),
        }
    }

    /// Queue `inputs`, then run until the program outputs, needs input that isn't queued, or
    /// halts.
    ///
    /// A fault is terminal: every later step returns the same fault, and queued input is left
    /// alone.
    pub fn step(&mut self, inputs: impl IntoIterator<Item = i64>) -> Result<Status, Fault> {
        self.pending.extend(inputs);
        let mut port = QueuePort {
            pending: &mut self.pending,
            output: None,
        };
        let state = self.vm.run(&mut port)?;
        // the port breaks on every output, so an output always ends the run
        Ok(match (port.output, state) {
            (Some(value), _) => Status::Output(value),
            (None, State::Halted) => Status::Halted,
            (None, _) => Status::AwaitingInput,
        })
    }

    /// Queue a single input value without running anything
    pub fn push_input(&mut self, value: i64) {
        self.pending.push_back(value);
    }

    /// Queue the bytes of `s` as input, one value per byte, for programs that talk in ASCII
    pub fn write_str(&mut self, s: &str) {
        self.pending.extend(s.bytes().map(i64::from));
    }

    /// Input that has been queued but not consumed yet
    pub fn pending(&self) -> &VecDeque<i64> {
        &self.pending
    }

    /// The underlying VM
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// The underlying VM, for inspecting or patching memory between steps
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    /// Unwrap the VM, discarding any unconsumed input
    pub fn into_vm(self) -> Vm {
        self.vm
    }

    /// Keep stepping until the program halts or needs input, collecting every output
    pub fn drain(&mut self) -> Result<(Vec<i64>, Status), Fault> {
        let mut outputs = Vec::new();
        loop {
            match self.step([])? {
                Status::Output(value) => outputs.push(value),
                status => break Ok((outputs, status)),
            }
        }
    }
}

impl From<Vm> for Machine {
    fn from(vm: Vm) -> Self {
        Self::new(vm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awaiting_input_is_idempotent() {
        let mut machine = Machine::new(Vm::new([3, 5, 4, 5, 99, 0]));
        let before = machine.clone();
        for _ in 0..5 {
            assert_eq!(machine.step([]), Ok(Status::AwaitingInput));
            assert_eq!(machine.vm().ip(), 0);
            assert_eq!(machine, before);
        }
        assert_eq!(machine.step([12]), Ok(Status::Output(12)));
        assert_eq!(machine.step([]), Ok(Status::Halted));
        assert_eq!(machine.step([]), Ok(Status::Halted));
    }

    #[test]
    fn one_output_per_step() {
        let mut machine = Machine::new(Vm::new([104, 1, 104, 2, 99]));
        assert_eq!(machine.step([]), Ok(Status::Output(1)));
        assert_eq!(machine.vm().ip(), 2);
        assert_eq!(machine.step([]), Ok(Status::Output(2)));
        assert_eq!(machine.step([]), Ok(Status::Halted));
    }

    #[test]
    fn inputs_consumed_in_order() {
        // read three values, output them in reverse
        let code = [3, 20, 3, 21, 3, 22, 4, 22, 4, 21, 4, 20, 99];
        let mut machine = Machine::new(Vm::new(code));
        assert_eq!(machine.step([1, 2]), Ok(Status::AwaitingInput));
        assert!(machine.pending().is_empty());
        machine.push_input(3);
        machine.push_input(4);
        assert_eq!(machine.drain(), Ok((vec![3, 2, 1], Status::Halted)));
        assert_eq!(machine.pending(), &[4]);
    }

    #[test]
    fn ascii_input() {
        let mut machine = Machine::new(Vm::new([3, 9, 3, 10, 4, 10, 4, 9, 99]));
        machine.write_str("hi");
        assert_eq!(
            machine.drain(),
            Ok((vec![i64::from(b'i'), i64::from(b'h')], Status::Halted))
        );
    }

    #[test]
    fn fault_is_an_error() {
        let mut machine = Machine::new(Vm::new([104, 1, 77]));
        assert_eq!(machine.step([]), Ok(Status::Output(1)));
        assert_eq!(
            machine.step([]),
            Err(Fault::InvalidOpcode {
                ip: 2,
                instruction: 77,
                opcode: 77
            })
        );
    }

    #[test]
    fn fault_is_terminal() {
        // IN with an immediate-mode destination
        let mut machine = Machine::new(Vm::new([103, 5, 99]));
        let fault = Fault::WriteToImmediate {
            ip: 0,
            instruction: 103,
            offset: 1,
        };
        assert_eq!(machine.step([1, 2]), Err(fault));
        assert_eq!(machine.pending(), &[1, 2]);
        for _ in 0..3 {
            assert_eq!(machine.step([]), Err(fault));
            assert_eq!(machine.pending(), &[1, 2]);
        }
        assert_eq!(machine.vm().fault(), Some(fault));
        assert_eq!(machine.vm().ip(), 0);
    }

    #[test]
    fn output_of_zero_after_input() {
        let mut machine = Machine::with_inputs(Vm::new([3, 0, 4, 0, 99]), [0]);
        assert_eq!(machine.step([]), Ok(Status::Output(0)));
        assert_eq!(machine.step([]), Ok(Status::Halted));
    }

    #[test]
    fn patch_between_steps() {
        // output whatever is at 7, twice
        let mut machine = Machine::new(Vm::new([4, 7, 4, 7, 99, 0, 0, 5]));
        assert_eq!(machine.step([]), Ok(Status::Output(5)));
        machine.vm_mut().mem_override(7, 6);
        assert_eq!(machine.step([]), Ok(Status::Output(6)));
        assert_eq!(machine.into_vm().mem_get(7), 6);
    }
}
