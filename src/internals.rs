// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use super::*;

impl Vm {
    // Given a 5 digit number, digits ABCDE are used as follows:
    // DE is the two-digit opcode
    // C is the 1st parameter's mode
    // B is the 2nd parameter's mode
    // A is the 3rd parameter's mode
    //
    // So *0*1202 would be parsed as follows:
    //
    // Opcode 02 is multiply
    // C=2: 1st parameter is in relative mode
    // B=1: 2nd parameter is in immediate mode
    // A=0: 3rd parameter is in positional mode
    //
    // Only the opcode is decoded up front. Each mode digit is checked when its parameter is
    // resolved, so digits for parameters an instruction doesn't take are never looked at.
    pub(crate) fn parse_op(instruction: i64) -> Result<Opcode, i64> {
        let opcode = instruction % 100;
        Opcode::try_from(opcode)
    }

    /// Turn `address` into a memory index, or fault if it's negative
    pub(crate) fn index_of(&self, address: i64) -> Result<u64, Fault> {
        u64::try_from(address).map_err(|_| Fault::NegativeAddress { ip: self.ip, address })
    }

    /// Read the int at `self.ip + offset`, growing memory if needed
    pub(crate) fn fetch(&mut self, offset: i64) -> Result<i64, Fault> {
        let i = self.index_of(self.ip.wrapping_add(offset))?;
        Ok(*self.mem.cell(i))
    }

    /// The raw parameter at `self.ip + offset`, without any side effects
    pub(crate) fn raw_param(&self, offset: i64) -> i64 {
        u64::try_from(self.ip.wrapping_add(offset)).map_or(0, |i| self.mem.peek(i))
    }

    fn mode(&self, instruction: i64, offset: i64) -> Result<Mode, Fault> {
        let fault = |mode| Fault::InvalidMode {
            ip: self.ip,
            instruction,
            offset,
            mode,
        };
        let digit_pos = u32::try_from(offset).map_err(|_| fault(0))?;
        Mode::of(instruction, digit_pos).map_err(fault)
    }

    /// Processes the int in memory at `self.ip + offset` into a concrete value using the method
    /// appropriate for its mode.
    pub(crate) fn resolve_param(&mut self, instruction: i64, offset: i64) -> Result<i64, Fault> {
        let mode = self.mode(instruction, offset)?;
        let param = self.fetch(offset)?;
        match mode {
            Mode::Positional => {
                let i = self.index_of(param)?;
                Ok(*self.mem.cell(i))
            }
            Mode::Immediate => Ok(param),
            Mode::Relative => {
                let i = self.index_of(self.rel_base.wrapping_add(param))?;
                Ok(*self.mem.cell(i))
            }
        }
    }

    /// Turns the parameter at `self.ip + offset` into the index of the cell it designates.
    ///
    /// Destinations are always resolved to an index rather than a reference, since writing to
    /// them may grow memory.
    pub(crate) fn resolve_dest(&mut self, instruction: i64, offset: i64) -> Result<u64, Fault> {
        let mode = self.mode(instruction, offset)?;
        let param = self.fetch(offset)?;
        match mode {
            Mode::Positional => self.index_of(param),
            Mode::Relative => self.index_of(self.rel_base.wrapping_add(param)),
            Mode::Immediate => Err(Fault::WriteToImmediate {
                ip: self.ip,
                instruction,
                offset,
            }),
        }
    }

    /// common logic of all 4 instructions that take 3 parameters
    pub(crate) fn op3(
        &mut self,
        instruction: i64,
        operation: impl Fn(i64, i64) -> i64,
    ) -> Result<Option<State>, Fault> {
        let a = self.resolve_param(instruction, 1)?;
        let b = self.resolve_param(instruction, 2)?;
        let dest = self.resolve_dest(instruction, 3)?;
        let val = operation(a, b);
        self.record(
            instruction,
            &[
                (self.raw_param(1), a),
                (self.raw_param(2), b),
                (self.raw_param(3), val),
            ],
        );
        *self.mem.cell(dest) = val;
        self.ip += 4;
        Ok(None)
    }

    pub(crate) fn jump(
        &mut self,
        instruction: i64,
        func: impl Fn(i64) -> bool,
    ) -> Result<Option<State>, Fault> {
        let expr = self.resolve_param(instruction, 1)?;
        let dest = self.resolve_param(instruction, 2)?;
        self.record(
            instruction,
            &[(self.raw_param(1), expr), (self.raw_param(2), dest)],
        );
        if func(expr) {
            // a negative target faults on the next fetch
            self.ip = dest;
        } else {
            self.ip += 3;
        }
        Ok(None)
    }

    /// Add the instruction about to complete to the trace, if one is running
    pub(crate) fn record(&mut self, instruction: i64, params: &[(i64, i64)]) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(instruction, self.ip, self.rel_base, params);
        }
    }
}
