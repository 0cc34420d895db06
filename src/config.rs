// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Channel configuration for the threaded protocols

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

/// Capacities of the channels created by [blocking::spawn](crate::blocking::spawn) and
/// [tagged::spawn](crate::tagged::spawn).
///
/// [`None`] makes an unbounded channel. `Some(0)` makes a rendezvous channel, where every send
/// waits for the matching receive, and `Some(n)` buffers up to `n` values before a send blocks.
///
/// Capacity only changes when the sending side blocks; values are never lost or reordered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Capacity of the controller-to-VM input channel
    pub input_capacity: Option<usize>,
    /// Capacity of the VM-to-controller channel: the output channel for the blocking protocol,
    /// or the message channel for the tagged protocol
    pub output_capacity: Option<usize>,
}

impl ChannelConfig {
    /// Unbounded input and output
    pub const UNBOUNDED: Self = Self {
        input_capacity: None,
        output_capacity: None,
    };

    /// Every send waits for its receive, in both directions
    pub const RENDEZVOUS: Self = Self {
        input_capacity: Some(0),
        output_capacity: Some(0),
    };

    /// Set the capacity of the input channel
    pub const fn with_input_capacity(mut self, capacity: Option<usize>) -> Self {
        self.input_capacity = capacity;
        self
    }

    /// Set the capacity of the output (or message) channel
    pub const fn with_output_capacity(mut self, capacity: Option<usize>) -> Self {
        self.output_capacity = capacity;
        self
    }

    pub(crate) fn input_channel<T>(&self) -> (Sender<T>, Receiver<T>) {
        channel(self.input_capacity)
    }

    pub(crate) fn output_channel<T>(&self) -> (Sender<T>, Receiver<T>) {
        channel(self.output_capacity)
    }
}

fn channel<T>(capacity: Option<usize>) -> (Sender<T>, Receiver<T>) {
    match capacity {
        Some(cap) => bounded(cap),
        None => unbounded(),
    }
}
