// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Intcode programs and their on-disk formats
//!
//! A [Program] is never modified. Every VM started from one gets its own copy of the code in
//! private memory, so a single `Program` can seed any number of VMs, on any number of threads.
//!
//! ```
//! use intcode::prelude::*;
//!
//! let program: Program = " 1,0,0,0,99\n".parse().unwrap();
//! let mut vm = program.spawn();
//! vm.run_through_inputs([]).unwrap();
//!
//! assert_eq!(vm.mem_get(0), 2);
//! assert_eq!(program.to_string(), "1,0,0,0,99");
//! ```

use itertools::Itertools;
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::Vm;

/// An immutable Intcode program, cheap to clone and share between threads
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Program(Arc<[i64]>);

/// An error encountered when reading a [Program]
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum ParseProgramError {
    /// There was no code at all
    #[error("program is empty")]
    Empty,
    /// One of the comma-separated fields isn't a valid 64-bit integer
    #[error("field {index} ({text:?}) is not a valid integer: {source}")]
    BadInt {
        /// 0-based position of the field
        index: usize,
        /// The field's text, with whitespace trimmed
        text: Box<str>,
        /// Why it couldn't be parsed
        source: std::num::ParseIntError,
    },
    /// Binary code whose length isn't a multiple of 8 bytes
    #[error("expected 8 bytes, got {}: {:02x?}", .0.len(), .0)]
    IncompleteI64(Box<[u8]>),
}

impl Program {
    /// Start a new [Vm] with a private copy of this program
    pub fn spawn(&self) -> Vm {
        Vm::new(self.0.iter().copied())
    }

    /// Read a program stored as little-endian 64-bit integers
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, ParseProgramError> {
        Self::from_bytes(bytes, i64::from_le_bytes)
    }

    /// Read a program stored as big-endian 64-bit integers
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, ParseProgramError> {
        Self::from_bytes(bytes, i64::from_be_bytes)
    }

    fn from_bytes(bytes: &[u8], func: fn([u8; 8]) -> i64) -> Result<Self, ParseProgramError> {
        let chunks = bytes.chunks_exact(8);
        if !chunks.remainder().is_empty() {
            return Err(ParseProgramError::IncompleteI64(chunks.remainder().into()));
        }
        let code: Arc<[i64]> = chunks
            .map(|c| {
                let mut word = [0; 8];
                word.copy_from_slice(c);
                func(word)
            })
            .collect();
        if code.is_empty() {
            return Err(ParseProgramError::Empty);
        }
        Ok(Self(code))
    }

    /// Write the program as little-endian 64-bit integers
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|i| i.to_le_bytes()).collect()
    }

    /// Write the program as big-endian 64-bit integers
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|i| i.to_be_bytes()).collect()
    }
}

impl FromStr for Program {
    type Err = ParseProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseProgramError::Empty);
        }
        s.split(',')
            .map(str::trim)
            .enumerate()
            .map(|(index, text)| {
                text.parse::<i64>()
                    .map_err(|source| ParseProgramError::BadInt {
                        index,
                        text: text.into(),
                        source,
                    })
            })
            .collect::<Result<Arc<[i64]>, _>>()
            .map(Self)
    }
}

impl From<Vec<i64>> for Program {
    fn from(code: Vec<i64>) -> Self {
        Self(code.into())
    }
}

impl From<&[i64]> for Program {
    fn from(code: &[i64]) -> Self {
        Self(code.into())
    }
}

impl FromIterator<i64> for Program {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for Program {
    type Target = [i64];
    fn deref(&self) -> &[i64] {
        &self.0
    }
}

impl From<&Program> for Vm {
    fn from(program: &Program) -> Self {
        program.spawn()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format(","))
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Program").field(&&self.0[..]).finish()
    }
}
