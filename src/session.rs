//! # Session Module
//!
//! Drives an [`ExtraHid`] from text commands, standing in for the guest and
//! the host's clock.
//!
//! ## Commands
//!
//! | Command | Effect |
//! |---------|--------|
//! | `01 05 00` / `010500` | Deliver the bytes as one inbound packet |
//! | `press <name>` / `release <name>` | Set a virtual button |
//! | `stick <name> <x> <y>` | Set a virtual stick, axes in -1.0..=1.0 |
//! | `wait <ms>` | Advance virtual time, firing due status reports |
//! | `reload` | Request input re-acquisition |
//! | `connect` / `disconnect` | Forward to the device |
//!
//! Blank lines and lines starting with `#` are ignored. Every packet the
//! device emits is rendered as `<< XX XX ...`.

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

use crate::config::Config;
use crate::device::ExtraHid;
use crate::error::{ExtraHidError, Result};
use crate::input::evdev_input::EvdevInput;
use crate::input::virtual_input::VirtualInput;
use crate::input::InputRegistry;
use crate::protocol::protocol::hex_string;
use crate::timing::{TickRate, VirtualTimer};
use crate::transport::capture::{CaptureTransport, Direction, PacketCapture};
use crate::transport::{ChannelTransport, Transport};

/// Prefix of every emitted packet line
pub const OUTPUT_PREFIX: &str = "<<";

/// One parsed session command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Packet(Vec<u8>),
    Press(String),
    Release(String),
    Stick { name: String, x: f32, y: f32 },
    Wait(u64),
    Reload,
    Connect,
    Disconnect,
}

impl Command {
    /// Parse one input line
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Blank line or comment
    /// * `Ok(Some(command))` - Parsed command
    ///
    /// # Errors
    ///
    /// Returns `Command` error for unknown keywords, wrong argument counts,
    /// and malformed numbers or hex
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match keyword {
            "press" => Command::Press(single_arg(keyword, &args)?.to_string()),
            "release" => Command::Release(single_arg(keyword, &args)?.to_string()),
            "stick" => {
                let [name, x, y] = args[..] else {
                    return Err(usage("stick <name> <x> <y>"));
                };
                Command::Stick {
                    name: name.to_string(),
                    x: parse_axis(x)?,
                    y: parse_axis(y)?,
                }
            }
            "wait" => {
                let ms = single_arg(keyword, &args)?;
                let ms = ms
                    .parse()
                    .map_err(|_| ExtraHidError::Command(format!("Invalid wait duration '{}'", ms)))?;
                Command::Wait(ms)
            }
            "reload" => no_args(keyword, &args, Command::Reload)?,
            "connect" => no_args(keyword, &args, Command::Connect)?,
            "disconnect" => no_args(keyword, &args, Command::Disconnect)?,
            _ => Command::Packet(parse_hex(line)?),
        };

        Ok(Some(command))
    }
}

fn usage(form: &str) -> ExtraHidError {
    ExtraHidError::Command(format!("Usage: {}", form))
}

fn single_arg<'a>(keyword: &str, args: &[&'a str]) -> Result<&'a str> {
    match args {
        [arg] => Ok(arg),
        _ => Err(usage(&format!("{} <value>", keyword))),
    }
}

fn no_args(keyword: &str, args: &[&str], command: Command) -> Result<Command> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(usage(keyword))
    }
}

fn parse_axis(value: &str) -> Result<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ExtraHidError::Command(format!("Invalid axis value '{}'", value)))
}

/// Parse hex bytes, with or without separating whitespace
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.split_whitespace().collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(ExtraHidError::Command(format!("Expected an even number of hex digits: '{}'", text)));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| ExtraHidError::Command(format!("Not a hex command: '{}'", text)))
        })
        .collect()
}

/// A device wired to a virtual clock, virtual inputs and an output queue
pub struct Session {
    device: ExtraHid,
    timer: VirtualTimer,
    input: VirtualInput,
    outbound: UnboundedReceiver<Bytes>,
    capture: Option<PacketCapture>,
    tick_rate: TickRate,
    elapsed_ms: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("elapsed_ms", &self.elapsed_ms)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session from configuration
    ///
    /// Both the `virtual` and `evdev` engines are registered, so the input
    /// mapping may point at either.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `capture` - Optional capture file for inbound and outbound packets
    pub fn new(config: &Config, capture: Option<PacketCapture>) -> Self {
        let timer = VirtualTimer::new();
        let input = VirtualInput::new();
        let tick_rate = TickRate::new(config.timing.ticks_per_second);

        let mut registry = InputRegistry::new();
        registry.register("virtual", input.clone());
        registry.register("evdev", EvdevInput::new());

        let (tx, outbound) = mpsc::unbounded_channel();
        let transport: Box<dyn Transport> = match &capture {
            Some(capture) => Box::new(CaptureTransport::new(ChannelTransport::new(tx), capture.clone())),
            None => Box::new(ChannelTransport::new(tx)),
        };

        let device = ExtraHid::new(
            Box::new(timer.clone()),
            transport,
            registry,
            config.input.clone(),
            tick_rate,
        );

        Self {
            device,
            timer,
            input,
            outbound,
            capture,
            tick_rate,
            elapsed_ms: 0,
        }
    }

    pub fn device(&self) -> &ExtraHid {
        &self.device
    }

    /// Milliseconds of virtual time elapsed since the session started
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Parse and apply one line, returning the packets it caused
    ///
    /// # Errors
    ///
    /// Returns `Command` error if the line cannot be parsed
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<String>> {
        if let Some(command) = Command::parse(line)? {
            self.apply(command);
        }
        Ok(self.drain_output())
    }

    /// Apply one command to the device or its inputs
    pub fn apply(&mut self, command: Command) {
        debug!("Session command: {:?}", command);

        match command {
            Command::Packet(bytes) => {
                if let Some(capture) = &self.capture {
                    if let Err(e) = capture.record(Direction::Inbound, &bytes) {
                        warn!("Failed to capture inbound packet: {}", e);
                    }
                }
                self.device.receive(&bytes);
            }
            Command::Press(name) => self.input.set_button(&name, true),
            Command::Release(name) => self.input.set_button(&name, false),
            Command::Stick { name, x, y } => self.input.set_stick(&name, x, y),
            Command::Wait(ms) => self.advance_ms(ms),
            Command::Reload => self.device.reload_input_devices(),
            Command::Connect => self.device.connect(),
            Command::Disconnect => self.device.disconnect(),
        }
    }

    /// Advance virtual time and deliver every status event that falls due
    ///
    /// Virtual time is tracked in whole milliseconds so that repeated small
    /// steps land on the same tick as one large step. Events due inside the
    /// window fire at their own deadline, so a long wait yields one report
    /// per period.
    pub fn advance_ms(&mut self, ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(ms);
        let target = self.tick_rate.ms_to_ticks(self.elapsed_ms);

        while let Some(deadline) = self
            .timer
            .next_deadline()
            .filter(|&deadline| deadline > self.timer.now() && deadline <= target)
        {
            self.fire_due(deadline - self.timer.now());
        }
        self.fire_due(target.saturating_sub(self.timer.now()));
    }

    fn fire_due(&mut self, ticks: u64) {
        for event in self.timer.advance(ticks) {
            self.device.on_status_tick(event.handle, event.lateness);
        }
    }

    /// Render every packet emitted since the last drain
    pub fn drain_output(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(packet) = self.outbound.try_recv() {
            lines.push(format!("{} {}", OUTPUT_PREFIX, hex_string(&packet)));
        }
        lines
    }

    /// Run commands from `reader` until EOF, writing output to `writer`
    ///
    /// Lines that fail to parse are reported on `writer` as `!! <error>` and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `Io` error if reading or writing fails
    pub async fn run_script<R, W>(&mut self, reader: R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let output = match self.handle_line(&line) {
                Ok(output) => output,
                Err(e) => {
                    warn!("{}", e);
                    vec![format!("!! {}", e)]
                }
            };
            write_lines(writer, &output).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

/// Write each line followed by a newline
pub async fn write_lines<W: AsyncWrite + Unpin>(writer: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}
