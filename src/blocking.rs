// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! The blocking dual-channel protocol
//!
//! The VM runs on its own thread. `IN` blocks until a value arrives on the input channel, `OUT`
//! blocks until its value has been handed to (or buffered in) the output channel, and when the
//! program stops, its [Outcome] is sent on the completion channel exactly once. A fault is
//! delivered through that same completion channel, so a controller waiting on it will always see
//! it.
//!
//! ```
//! use intcode::blocking::{self, Event};
//! use intcode::prelude::*;
//!
//! // double every input until a 0 comes in
//! let program: Program = "3,15,1006,15,14,1002,15,2,15,4,15,1105,1,0,99,0".parse().unwrap();
//! let mut channels = blocking::spawn(program.spawn(), &Default::default()).unwrap();
//!
//! for i in 1..=3 {
//!     channels.send(i).unwrap();
//!     assert!(matches!(channels.next_event(), Some(Event::Output(n)) if n == i * 2));
//! }
//! channels.send(0).unwrap();
//! assert!(matches!(channels.next_event(), Some(Event::Finished(Ok(_)))));
//! assert!(channels.next_event().is_none());
//! ```

use crossbeam_channel::{Receiver, Sender, select};
use std::ops::ControlFlow;
use std::thread::JoinHandle;

use crate::{ChannelConfig, Error, Port, Vm, spawn_worker, worker_outcome};

/// How a VM run by [run] ended: the VM itself once it halts, so its memory can be inspected, or
/// the reason it didn't.
pub type Outcome = Result<Vm, Error>;

/// A [Port] that blocks on a pair of channels
struct ChannelPort {
    input: Receiver<i64>,
    output: Sender<i64>,
}

impl Port for ChannelPort {
    fn input(&mut self) -> Option<i64> {
        // a disconnected input channel can never produce a value, so stop rather than hang
        self.input.recv().ok()
    }

    fn output(&mut self, value: i64) -> ControlFlow<()> {
        match self.output.send(value) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

/// Run `vm` on a new thread, reading input from `input`, writing output to `output`, and sending
/// the [Outcome] on `done` once it stops.
///
/// `output` is dropped before `done` is sent, so every output is already in the channel by the
/// time completion is signalled.
pub fn run(
    mut vm: Vm,
    input: Receiver<i64>,
    output: Sender<i64>,
    done: Sender<Outcome>,
) -> Result<JoinHandle<()>, Error> {
    spawn_worker(move || {
        let mut port = ChannelPort { input, output };
        let outcome = worker_outcome(vm.run(&mut port)).map(|()| vm);
        drop(port);
        if let Err(e) = &outcome {
            tracing::warn!("blocking VM stopped: {e}");
        }
        if done.send(outcome).is_err() {
            tracing::debug!("controller dropped the completion channel");
        }
    })
}

/// Something a controller observes from a VM started with [spawn]
#[derive(Debug)]
pub enum Event {
    /// The VM produced an output
    Output(i64),
    /// The VM stopped. Comes after every [Output](Event::Output), and only once.
    Finished(Outcome),
}

/// The controller's ends of the channels of a VM started with [spawn]
#[derive(Debug)]
pub struct Channels {
    input: Option<Sender<i64>>,
    output: Receiver<i64>,
    done: Receiver<Outcome>,
    finished: Option<Outcome>,
    completed: bool,
}

/// Create the channels described by `config` and [run] `vm` with them
pub fn spawn(vm: Vm, config: &ChannelConfig) -> Result<Channels, Error> {
    let (input_tx, input_rx) = config.input_channel();
    let (output_tx, output_rx) = config.output_channel();
    // completion is only ever sent once, so it never needs to block
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    run(vm, input_rx, output_tx, done_tx)?;
    Ok(Channels {
        input: Some(input_tx),
        output: output_rx,
        done: done_rx,
        finished: None,
        completed: false,
    })
}

impl Channels {
    /// Send an input value to the VM.
    ///
    /// Fails with [Error::InputClosed] once the VM has stopped, or after [Channels::close_input].
    pub fn send(&self, value: i64) -> Result<(), Error> {
        let input = self.input.as_ref().ok_or(Error::InputClosed)?;
        input.send(value).map_err(|_| Error::InputClosed)
    }

    /// Drop the input channel. A VM waiting on input after this stops with
    /// [Error::InputClosed].
    pub fn close_input(&mut self) {
        self.input = None;
    }

    /// The sending end of the input channel, for use in a custom `select!`
    pub fn input(&self) -> Option<&Sender<i64>> {
        self.input.as_ref()
    }

    /// The receiving end of the output channel, for use in a custom `select!`
    pub fn output(&self) -> &Receiver<i64> {
        &self.output
    }

    /// The receiving end of the completion channel, for use in a custom `select!`
    pub fn done(&self) -> &Receiver<Outcome> {
        &self.done
    }

    /// Wait for whichever comes first, an output or completion.
    ///
    /// Outputs are returned in the order they were produced, and completion is only reported
    /// once every output has been. Returns [`None`] after completion has been reported.
    pub fn next_event(&mut self) -> Option<Event> {
        if self.completed {
            return None;
        }
        if self.finished.is_none() {
            let outcome = select! {
                recv(self.output) -> value => match value {
                    Ok(value) => return Some(Event::Output(value)),
                    // the worker drops its output sender right before signalling completion
                    Err(_) => self.done.recv(),
                },
                recv(self.done) -> outcome => outcome,
            };
            self.finished = Some(outcome.unwrap_or(Err(Error::WorkerLost)));
        }
        if let Ok(value) = self.output.try_recv() {
            return Some(Event::Output(value));
        }
        self.completed = true;
        self.finished.take().map(Event::Finished)
    }

    /// Close the input channel and wait for the VM to stop, collecting every output it produces
    /// along the way
    pub fn finish(mut self) -> (Vec<i64>, Outcome) {
        self.close_input();
        let mut outputs = Vec::new();
        while let Some(event) = self.next_event() {
            match event {
                Event::Output(value) => outputs.push(value),
                Event::Finished(outcome) => return (outputs, outcome),
            }
        }
        (outputs, Err(Error::WorkerLost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fault, Program};

    #[test]
    fn outputs_then_completion() {
        let vm = Vm::new([104, 1, 104, 2, 104, 3, 99]);
        let (outputs, outcome) = spawn(vm, &ChannelConfig::default()).unwrap().finish();
        assert_eq!(outputs, vec![1, 2, 3]);
        let vm = outcome.unwrap();
        assert_eq!(vm.ip(), 6);
    }

    #[test]
    fn rendezvous_outputs() {
        let vm = Vm::new([104, 1, 104, 2, 104, 3, 99]);
        let mut channels = spawn(vm, &ChannelConfig::RENDEZVOUS).unwrap();
        let mut seen = vec![];
        while let Some(event) = channels.next_event() {
            match event {
                Event::Output(v) => seen.push(v),
                Event::Finished(outcome) => assert!(outcome.is_ok()),
            }
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn fault_reaches_controller() {
        let vm = Vm::new([104, 5, 77]);
        let (outputs, outcome) = spawn(vm, &ChannelConfig::default()).unwrap().finish();
        assert_eq!(outputs, vec![5]);
        assert!(matches!(
            outcome,
            Err(Error::Fault(Fault::InvalidOpcode {
                ip: 2,
                instruction: 77,
                opcode: 77
            }))
        ));
    }

    #[test]
    fn closed_input_stops_vm() {
        let vm = Vm::new([3, 0, 99]);
        let (outputs, outcome) = spawn(vm, &ChannelConfig::default()).unwrap().finish();
        assert!(outputs.is_empty());
        assert!(matches!(outcome, Err(Error::InputClosed)));
    }

    #[test]
    fn far_address_reaches_controller() {
        let vm = Vm::new([4, 1 << 60, 99]);
        let (outputs, outcome) = spawn(vm, &ChannelConfig::default()).unwrap().finish();
        assert_eq!(outputs, vec![0]);
        assert_eq!(outcome.unwrap().mem_len(), (1 << 60) + 1);
    }

    #[test]
    fn bad_input_destination_faults_without_waiting() {
        // the input channel stays open, so waiting on it would block forever
        let mut channels = spawn(Vm::new([303, 0, 99]), &ChannelConfig::default()).unwrap();
        let Some(Event::Finished(outcome)) = channels.next_event() else {
            panic!("expected completion");
        };
        assert!(matches!(
            outcome,
            Err(Error::Fault(Fault::InvalidMode {
                ip: 0,
                instruction: 303,
                offset: 1,
                mode: 3
            }))
        ));
        assert!(channels.input().is_some());
    }

    #[test]
    fn send_after_halt_fails() {
        let mut channels = spawn(Vm::new([99]), &ChannelConfig::default()).unwrap();
        assert!(matches!(channels.next_event(), Some(Event::Finished(Ok(_)))));
        // the worker drops its receiver when it stops
        assert!(matches!(channels.send(1), Err(Error::InputClosed)));
    }

    #[test]
    fn halted_vm_memory_is_returned() {
        let program: Program = "1,0,0,0,99".parse().unwrap();
        let (_, outcome) = spawn(program.spawn(), &ChannelConfig::default())
            .unwrap()
            .finish();
        assert_eq!(outcome.unwrap().mem_get(0), 2);
    }
}
