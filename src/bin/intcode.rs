// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Run an Intcode program, with input from the command line and then stdin, and output to stdout

use intcode::blocking::{self, Event};
use intcode::prelude::*;
use intcode::tagged::{self, Message};
use intcode::{ChannelConfig, ParseProgramError};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, Write, stdin, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(PartialEq, Clone, Copy, ValueEnum)]
enum CodeFormat {
    /// comma-separated ASCII-encoded decimal numbers
    #[value(alias("text"))]
    #[value(alias("aoc"))]
    Ascii,
    /// little-endian 64-bit integers
    #[cfg_attr(target_endian = "little", value(alias("binary-native")))]
    #[value(name("binary-little-endian"), alias("binle"))]
    LittleEndian,
    #[cfg_attr(target_endian = "big", value(alias("binary-native")))]
    #[value(name("binary-big-endian"), alias("binbe"))]
    /// big-endian 64-bit integers
    BigEndian,
}

#[derive(PartialEq, Clone, Copy, Debug, ValueEnum)]
enum Protocol {
    /// run on this thread, one step at a time
    Step,
    /// run on a worker thread with separate input and output channels
    Blocking,
    /// run on a worker thread reporting every event as a message
    Tagged,
}

const VERSION: &str = concat!(env!("CARGO_CRATE_NAME"), '-', env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = VERSION)]
#[command(about = "Intcode runner", long_about = None)]
struct Args {
    #[arg(help = "The program to run")]
    source: PathBuf,
    #[arg(help = "Input format for the intcode")]
    #[arg(short, long)]
    #[arg(default_value = "ascii")]
    format: CodeFormat,
    #[arg(help = "Input values to feed before reading stdin")]
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Vec<i64>,
    #[arg(help = "Treat input and output as ASCII text")]
    #[arg(short, long)]
    ascii: bool,
    #[arg(help = "Set memory before running, e.g. --set 1=12 --set 2=2")]
    #[arg(long = "set", value_name = "ADDR=VALUE", value_parser = parse_patch)]
    patches: Vec<(usize, i64)>,
    #[arg(help = "How to drive the VM")]
    #[arg(short, long, default_value = "step")]
    protocol: Protocol,
    #[arg(help = "Log more (repeat for even more)")]
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_patch(s: &str) -> Result<(usize, i64), String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got {s:?}"))?;
    let addr = addr.trim().parse().map_err(|e| format!("bad address: {e}"))?;
    let value = value.trim().parse().map_err(|e| format!("bad value: {e}"))?;
    Ok((addr, value))
}

/// Everything needed to run a program, independent of how it was asked for
struct RunConfig {
    program: Program,
    inputs: Vec<i64>,
    ascii: bool,
    patches: Vec<(usize, i64)>,
    protocol: Protocol,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid program: {0}")]
    Program(#[from] ParseProgramError),
    #[error("VM fault: {0}")]
    Fault(#[from] Fault),
    #[error(transparent)]
    Vm(#[from] intcode::Error),
    #[error("invalid input {0:?}")]
    BadInput(String),
    #[error("program is waiting for input, but stdin is closed")]
    InputExhausted,
}

impl Args {
    fn into_config(self) -> Result<RunConfig, CliError> {
        let read_err = |source| CliError::Read {
            path: self.source.clone(),
            source,
        };
        let program = match self.format {
            CodeFormat::Ascii => fs::read_to_string(&self.source)
                .map_err(read_err)?
                .parse()?,
            CodeFormat::LittleEndian => {
                Program::from_le_bytes(&fs::read(&self.source).map_err(read_err)?)?
            }
            CodeFormat::BigEndian => {
                Program::from_be_bytes(&fs::read(&self.source).map_err(read_err)?)?
            }
        };
        Ok(RunConfig {
            program,
            inputs: self.input,
            ascii: self.ascii,
            patches: self.patches,
            protocol: self.protocol,
        })
    }
}

/// Reads more input from stdin, a line at a time
fn read_line(ascii: bool) -> Result<Vec<i64>, CliError> {
    stdout().flush()?;
    let mut buf = String::new();
    if stdin().lock().read_line(&mut buf)? == 0 {
        return Err(CliError::InputExhausted);
    }
    if ascii {
        if let Some(bad_char) = buf.chars().find(|c| !c.is_ascii()) {
            return Err(CliError::BadInput(bad_char.to_string()));
        }
        Ok(buf.bytes().map(i64::from).collect())
    } else {
        buf.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|_| CliError::BadInput(s.to_string())))
            .collect()
    }
}

/// Writes one output value, as a character if it's printable ASCII and `ascii` is set
fn emit(out: &mut impl Write, value: i64, ascii: bool) -> io::Result<()> {
    match u8::try_from(value) {
        Ok(c) if ascii && c.is_ascii() => write!(out, "{}", char::from(c)),
        _ => writeln!(out, "{value}"),
    }
}

fn run_step(vm: Vm, config: &RunConfig) -> Result<(), CliError> {
    let mut machine = Machine::with_inputs(vm, config.inputs.iter().copied());
    let mut out = stdout().lock();
    loop {
        match machine.step([])? {
            Status::Output(value) => emit(&mut out, value, config.ascii)?,
            Status::AwaitingInput => {
                out.flush()?;
                for value in read_line(config.ascii)? {
                    machine.push_input(value);
                }
            }
            Status::Halted => break Ok(()),
        }
    }
}

fn run_blocking(vm: Vm, config: &RunConfig) -> Result<(), CliError> {
    let mut channels = blocking::spawn(vm, &ChannelConfig::default())?;
    for &value in &config.inputs {
        channels.send(value)?;
    }
    // There's no way to tell when the VM is waiting, so stdin is forwarded as it comes in
    if let Some(input) = channels.input().cloned() {
        let ascii = config.ascii;
        std::thread::spawn(move || {
            while let Ok(values) = read_line(ascii) {
                if values.into_iter().any(|v| input.send(v).is_err()) {
                    break;
                }
            }
        });
    }
    let mut out = stdout().lock();
    while let Some(event) = channels.next_event() {
        match event {
            Event::Output(value) => {
                emit(&mut out, value, config.ascii)?;
                out.flush()?;
            }
            Event::Finished(outcome) => {
                outcome?;
            }
        }
    }
    Ok(())
}

fn run_tagged(vm: Vm, config: &RunConfig) -> Result<(), CliError> {
    let session = tagged::spawn(vm, &ChannelConfig::default())?;
    let mut queued: VecDeque<i64> = config.inputs.iter().copied().collect();
    let mut out = stdout().lock();
    loop {
        match session.recv()? {
            Message::AwaitingInput => {
                out.flush()?;
                // an empty line in numeric mode gives nothing to send yet
                while queued.is_empty() {
                    queued.extend(read_line(config.ascii)?);
                }
                if let Some(value) = queued.pop_front() {
                    session.send(value)?;
                }
            }
            Message::Output(value) => emit(&mut out, value, config.ascii)?,
            Message::Halted => break,
            Message::Faulted(fault) => return Err(fault.into()),
        }
    }
    session.join()?;
    Ok(())
}

fn run(config: &RunConfig) -> Result<(), CliError> {
    let mut vm = config.program.spawn();
    for &(addr, value) in &config.patches {
        vm.mem_override(addr, value);
    }
    tracing::debug!(
        protocol = ?config.protocol,
        len = config.program.len(),
        "starting program"
    );
    match config.protocol {
        Protocol::Step => run_step(vm, config),
        Protocol::Blocking => run_blocking(vm, config),
        Protocol::Tagged => run_tagged(vm, config),
    }?;
    stdout().flush()?;
    Ok(())
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match args.into_config().and_then(|config| run(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patches() {
        assert_eq!(parse_patch("1=12"), Ok((1, 12)));
        assert_eq!(parse_patch(" 0 = -2 "), Ok((0, -2)));
        assert!(parse_patch("12").is_err());
        assert!(parse_patch("-1=2").is_err());
    }

    #[test]
    fn emit_formats() {
        let mut buf = Vec::new();
        emit(&mut buf, i64::from(b'A'), true).unwrap();
        emit(&mut buf, 1000, true).unwrap();
        emit(&mut buf, i64::from(b'A'), false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "A1000\n65\n");
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "intcode", "prog.txt", "-i", "1,-2", "--set", "1=12", "-p", "tagged", "-vv",
        ])
        .unwrap();
        assert_eq!(args.input, vec![1, -2]);
        assert_eq!(args.patches, vec![(1, 12)]);
        assert_eq!(args.protocol, Protocol::Tagged);
        assert_eq!(args.verbose, 2);
        assert!(!args.ascii);
    }
}
