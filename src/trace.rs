// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Opt-in recording of executed instructions
//!
//! ```
//! use intcode::prelude::*;
//! use intcode::Opcode;
//!
//! let mut vm = Vm::new([1002, 4, 3, 4, 33]);
//! vm.start_trace();
//! vm.run_through_inputs([]).unwrap();
//! let trace = vm.end_trace().unwrap();
//!
//! assert_eq!(trace.0.len(), 2);
//! assert_eq!(trace.0[0].opcode(), Opcode::Mul);
//! assert_eq!(trace.0[0].stored_val(), Some(99));
//! assert_eq!(trace.0[1].opcode(), Opcode::Halt);
//! ```
use std::fmt::{self, Display};

use super::{Mode, Opcode, Vm};

#[derive(Clone, Debug)]
/// Information about an instruction that was executed, which can be queried with its various
/// methods, or converted into a [String] using its [Display] impl.
pub struct TracedInstr {
    opcode: Opcode,
    op_int: i64,
    instr_ptr: i64,
    rel_base: i64,
    modes: Box<[Mode]>,
    /// each parameter as it appeared in memory, paired with what it resolved to
    params: Box<[(i64, i64)]>,
}

impl TracedInstr {
    /// Return the relative base at the time the traced instruction was executed
    pub fn rel_base(&self) -> i64 {
        self.rel_base
    }

    /// Return the instruction pointer's position when the traced instruction was executed
    pub fn instr_ptr(&self) -> i64 {
        self.instr_ptr
    }

    /// Return the actual integer of the traced instruction
    pub fn op_int(&self) -> i64 {
        self.op_int
    }

    /// Return the opcode of the traced instruction
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Return the parameter modes of the traced instruction
    pub fn param_modes(&self) -> &[Mode] {
        &self.modes
    }

    /// Return each parameter as a `(raw, resolved)` pair
    pub fn params(&self) -> &[(i64, i64)] {
        &self.params
    }

    /// If the instruction stored a value, return that value
    pub fn stored_val(&self) -> Option<i64> {
        match self.opcode {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => Some(self.params[2].1),
            Opcode::In => Some(self.params[0].1),
            _ => None,
        }
    }

    fn build(op_int: i64, instr_ptr: i64, rel_base: i64, params: &[(i64, i64)]) -> Option<Self> {
        let opcode = Vm::parse_op(op_int).ok()?;
        let modes = (1..=opcode.param_count())
            .map(|offset| Mode::of(op_int, offset))
            .collect::<Result<Box<[Mode]>, _>>()
            .ok()?;
        debug_assert_eq!(modes.len(), params.len());
        Some(Self {
            opcode,
            op_int,
            instr_ptr,
            rel_base,
            modes,
            params: params.into(),
        })
    }
}

impl Vm {
    /// Begin a [Trace] of executed instructions. If a trace is already running, this replaces that
    /// trace and returns in a [`Some`], otherwise, it returns [`None`].
    pub fn start_trace(&mut self) -> Option<Trace> {
        self.trace.replace(Trace::new())
    }

    /// Stop tracing executed instructions into a [Trace]. If no trace was active, returns [`None`]
    ///
    /// see [Vm::start_trace]
    pub fn end_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    /// Get a view of the current trace
    pub fn show_trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

#[derive(Debug, Default, Clone)]
/// A log of instructions that a [Vm] has executed since a call to [Vm::start_trace]
pub struct Trace(pub Vec<TracedInstr>);

impl Trace {
    pub(crate) fn push(
        &mut self,
        op_int: i64,
        instr_ptr: i64,
        rel_base: i64,
        params: &[(i64, i64)],
    ) {
        // only instructions that decoded successfully ever get this far
        if let Some(instr) = TracedInstr::build(op_int, instr_ptr, rel_base, params) {
            self.0.push(instr);
        }
    }

    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }
}

impl Display for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ran instruction at {:0>4}: op int {: <5} | ",
            self.instr_ptr, self.op_int
        )?;
        let m = &self.modes;
        let p = &self.params;

        match self.opcode {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => write!(
                f,
                "[{} {}{} (resolves to {}), {}{} (resolves to {}), {}{} (stored {})]",
                self.opcode, m[0], p[0].0, p[0].1, m[1], p[1].0, p[1].1, m[2], p[2].0, p[2].1
            ),
            Opcode::Jnz | Opcode::Jz => {
                let jumped = (p[0].1 != 0) == (self.opcode == Opcode::Jnz);
                write!(
                    f,
                    "[{} {}{} (resolves to {}), {}{} ({} to {})]",
                    self.opcode,
                    m[0],
                    p[0].0,
                    p[0].1,
                    m[1],
                    p[1].0,
                    if jumped { "jumped" } else { "didn't jump" },
                    p[1].1
                )
            }
            Opcode::In => write!(f, "[IN {}{} (stored {})]", m[0], p[0].0, p[0].1),
            Opcode::Out => write!(f, "[OUT {}{} (resolves to {})]", m[0], p[0].0, p[0].1),
            Opcode::Rbo => write!(
                f,
                "[RBO {}{} (resolved to {}) (went from {} to {})]",
                m[0],
                p[0].0,
                p[0].1,
                self.rel_base,
                self.rel_base.wrapping_add(p[0].1),
            ),
            Opcode::Halt => write!(f, "[HALT]"),
        }
    }
}
