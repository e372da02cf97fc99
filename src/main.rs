//! # Extra HID
//!
//! Interactive driver for the emulated extra HID peripheral.
//!
//! Reads guest requests and input changes from stdin, one command per line,
//! and prints every packet the peripheral emits as a `<<` hex line on
//! stdout. Logs go to stderr and, optionally, to a daily rotated file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use extra_hid::config::{Config, LoggingConfig};
use extra_hid::session::{write_lines, Session};
use extra_hid::transport::capture::PacketCapture;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Base name of rotated log files
const LOG_FILE_NAME: &str = "extra-hid.log";

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    script: bool,
}

/// Parse `[--script] [CONFIG]`
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut parsed = Args::default();

    for arg in args {
        match arg.as_str() {
            "--script" => parsed.script = true,
            flag if flag.starts_with("--") => bail!("Unknown option '{}'", flag),
            path if parsed.config_path.is_none() => parsed.config_path = Some(PathBuf::from(path)),
            extra => bail!("Unexpected argument '{}'", extra),
        }
    }

    Ok(parsed)
}

/// Load the configuration, falling back to defaults only when the default
/// file is absent. An explicitly named file must exist.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Initialize tracing
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must be held for the life of the program so buffered file logs are
/// flushed on exit.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = if logging.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse arguments and load configuration
///    - Set up logging
///    - Build the session, opening the capture file if enabled
///
/// 2. **Main Loop**
///    - Interactive: a `session.step_ms` interval advances virtual time in
///      real time while stdin commands are applied as they arrive
///    - `--script`: stdin is processed without a real-time clock; time only
///      moves on `wait`
///
/// 3. **Shutdown**
///    - EOF or Ctrl+C ends the loop and the device is disconnected
///
/// # Examples
///
/// ```bash
/// printf '01 05 00\npress zl\nwait 10\n' | cargo run -- --script
/// ```
///
/// Expected output:
/// ```text
/// << 10 00 08 80 DF 00
/// << 10 00 08 80 DF 00
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(args.config_path.as_deref())?;
    let _log_guard = init_logging(&config.logging);

    info!("Extra HID v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Scheduler at {} ticks/s, inputs: zl '{}', zr '{}', c_stick '{}'",
        config.timing.ticks_per_second, config.input.zl, config.input.zr, config.input.c_stick
    );

    let capture = if config.capture.enabled {
        let capture = PacketCapture::open(&config.capture.path)
            .with_context(|| format!("Failed to open capture file {}", config.capture.path))?;
        info!("Capturing packets to {}", config.capture.path);
        Some(capture)
    } else {
        None
    };

    let mut session = Session::new(&config, capture);
    let mut stdout = tokio::io::stdout();
    let stdin = BufReader::new(tokio::io::stdin());

    if args.script {
        tokio::select! {
            result = session.run_script(stdin, &mut stdout) => result?,
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
        }
    } else {
        run_interactive(&mut session, stdin, &mut stdout, config.session.step_ms).await?;
    }

    info!("Session ended after {} ms of virtual time", session.elapsed_ms());
    Ok(())
}

async fn run_interactive<R>(
    session: &mut Session,
    stdin: R,
    stdout: &mut tokio::io::Stdout,
    step_ms: u64,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut lines = stdin.lines();
    let mut clock = interval(Duration::from_millis(step_ms));
    // First tick completes immediately
    clock.tick().await;

    info!("Advancing virtual time every {} ms", step_ms);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = clock.tick() => {
                session.advance_ms(step_ms);
                let output = session.drain_output();
                if !output.is_empty() {
                    write_lines(stdout, &output).await?;
                    stdout.flush().await?;
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("End of input, shutting down...");
                    break;
                };

                let output = match session.handle_line(&line) {
                    Ok(output) => output,
                    Err(e) => {
                        warn!("{}", e);
                        vec![format!("!! {}", e)]
                    }
                };
                write_lines(stdout, &output).await?;
                stdout.flush().await?;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
