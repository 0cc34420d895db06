// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! The synchronous tagged-message protocol
//!
//! Like [blocking](crate::blocking), the VM runs on its own thread, but everything it does is
//! reported as a [Message] on a single channel, in the order it happens. Before each `IN`, the VM
//! sends [Message::AwaitingInput] and only then waits for a value, so a controller can drive a
//! program without knowing ahead of time how many outputs come between inputs:
//!
//! ```
//! use intcode::prelude::*;
//! use intcode::tagged::{self, Message};
//!
//! // add pairs of inputs until a pair sums to 0
//! let program: Program = "3,17,3,18,1,17,18,17,4,17,1005,17,0,99,0,0,0,0,0".parse().unwrap();
//! let session = tagged::spawn(program.spawn(), &Default::default()).unwrap();
//!
//! let mut inputs = [3, 4, 10, -10].into_iter();
//! let mut outputs = vec![];
//! loop {
//!     match session.recv().unwrap() {
//!         Message::AwaitingInput => session.send(inputs.next().unwrap()).unwrap(),
//!         Message::Output(n) => outputs.push(n),
//!         Message::Halted => break,
//!         Message::Faulted(fault) => panic!("{fault}"),
//!     }
//! }
//! assert_eq!(outputs, vec![7, 0]);
//! assert!(session.join().is_ok());
//! ```

use crossbeam_channel::{Receiver, Sender};
use std::ops::ControlFlow;
use std::thread::JoinHandle;

use crate::{ChannelConfig, Error, Fault, Port, Vm, spawn_worker, worker_outcome};

/// Something that happened in a VM run with [run]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Message {
    /// The VM is about to execute `IN`, and is waiting for a value on the input channel
    AwaitingInput,
    /// The VM executed `OUT` with this value
    Output(i64),
    /// The VM halted. This is the last message.
    Halted,
    /// The VM faulted. This is the last message.
    Faulted(Fault),
}

/// A [Port] that announces every interaction on the message channel
struct MessagePort {
    input: Receiver<i64>,
    messages: Sender<Message>,
    /// set once a message couldn't be delivered
    hung_up: bool,
}

impl Port for MessagePort {
    fn input(&mut self) -> Option<i64> {
        if self.messages.send(Message::AwaitingInput).is_err() {
            self.hung_up = true;
            return None;
        }
        self.input.recv().ok()
    }

    fn output(&mut self, value: i64) -> ControlFlow<()> {
        match self.messages.send(Message::Output(value)) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

/// Run `vm` on a new thread, reading input from `input` and reporting every event on `messages`.
///
/// The thread's result is the VM itself if it halted, so its memory can be inspected after
/// [joining](JoinHandle::join) it.
pub fn run(
    mut vm: Vm,
    input: Receiver<i64>,
    messages: Sender<Message>,
) -> Result<JoinHandle<Result<Vm, Error>>, Error> {
    spawn_worker(move || {
        let mut port = MessagePort {
            input,
            messages,
            hung_up: false,
        };
        let result = vm.run(&mut port);
        let last = match result {
            Ok(crate::State::Halted) => Some(Message::Halted),
            Err(fault) => Some(Message::Faulted(fault)),
            // the controller hung up, so there's nobody to tell
            Ok(_) => None,
        };
        if let Some(message) = last {
            if port.messages.send(message).is_err() {
                tracing::debug!("controller dropped the message channel");
            }
        }
        let outcome = match result {
            Ok(crate::State::Awaiting) if port.hung_up => Err(Error::OutputClosed),
            result => worker_outcome(result),
        };
        if let Err(e) = &outcome {
            tracing::warn!("tagged VM stopped: {e}");
        }
        outcome.map(|()| vm)
    })
}

/// The controller's side of a VM started with [spawn]
#[derive(Debug)]
pub struct Session {
    input: Sender<i64>,
    messages: Receiver<Message>,
    handle: JoinHandle<Result<Vm, Error>>,
}

/// Create the channels described by `config` and [run] `vm` with them.
///
/// The message channel uses [ChannelConfig::output_capacity]. Whatever its capacity, messages
/// are neither lost nor reordered; a bounded channel just makes the VM wait for the controller
/// to catch up.
pub fn spawn(vm: Vm, config: &ChannelConfig) -> Result<Session, Error> {
    let (input_tx, input_rx) = config.input_channel();
    let (message_tx, message_rx) = config.output_channel();
    let handle = run(vm, input_rx, message_tx)?;
    Ok(Session {
        input: input_tx,
        messages: message_rx,
        handle,
    })
}

impl Session {
    /// Wait for the next message.
    ///
    /// Fails with [Error::WorkerLost] if called after the final message.
    pub fn recv(&self) -> Result<Message, Error> {
        self.messages.recv().map_err(|_| Error::WorkerLost)
    }

    /// Send an input value. Should only be done in response to [Message::AwaitingInput].
    pub fn send(&self, value: i64) -> Result<(), Error> {
        self.input.send(value).map_err(|_| Error::InputClosed)
    }

    /// The receiving end of the message channel
    pub fn messages(&self) -> &Receiver<Message> {
        &self.messages
    }

    /// Wait for the VM thread to finish, returning the halted VM or the reason it stopped.
    ///
    /// Closes the input channel first, so a VM still waiting on input stops with
    /// [Error::InputClosed] instead of waiting forever. Any unread messages are discarded.
    pub fn join(self) -> Result<Vm, Error> {
        let Self {
            input,
            messages,
            handle,
        } = self;
        drop(input);
        // with a bounded channel, the VM may be waiting for room to send
        drop(messages);
        handle.join().unwrap_or(Err(Error::WorkerLost))
    }
}
