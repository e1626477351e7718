//! FlashRESP - command-line RESP encoder and decoder
//!
//! `flashresp decode` reads RESP values from stdin and prints them the way
//! redis-cli does. `flashresp encode ARG...` writes its arguments to stdout
//! as a RESP array of bulk strings.

use flashresp::stream::{AsyncRespReader, Encoder};
use std::io;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// What the tool was asked to do
enum Mode {
    Decode,
    Encode(Vec<String>),
}

/// Tool configuration
struct Config {
    /// Selected subcommand
    mode: Mode,
    /// Log at debug level
    verbose: bool,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut mode = None;
        let mut verbose = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--verbose" | "-v" => {
                    verbose = true;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-V" => {
                    println!("FlashRESP version {}", flashresp::VERSION);
                    std::process::exit(0);
                }
                "decode" if mode.is_none() => {
                    mode = Some(Mode::Decode);
                    i += 1;
                }
                "encode" if mode.is_none() => {
                    // Everything after the subcommand is payload, flags included.
                    mode = Some(Mode::Encode(args[i + 1..].to_vec()));
                    i = args.len();
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        match mode {
            Some(mode) => Config { mode, verbose },
            None => {
                eprintln!("Error: a subcommand is required");
                print_help();
                std::process::exit(1);
            }
        }
    }

    fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        }
    }
}

fn print_help() {
    println!(
        r#"
FlashRESP - RESP encoder and decoder

USAGE:
    flashresp [OPTIONS] decode
    flashresp [OPTIONS] encode [ARG...]

COMMANDS:
    decode               Read RESP values from stdin and print them
    encode [ARG...]      Write ARG... to stdout as an array of bulk strings

OPTIONS:
    -v, --verbose        Log decoding and encoding activity to stderr
    -V, --version        Print version information
    -h, --help           Print this help message

    RUST_LOG overrides the log level, e.g. RUST_LOG=flashresp=trace

EXAMPLES:
    $ flashresp encode SET name Ariz | flashresp decode
    1) "SET"
    2) "name"
    3) "Ariz"

    $ flashresp encode PING | redis-cli --pipe
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging; stdout carries data, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level().to_string().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match config.mode {
        Mode::Decode => decode_stdin().await,
        Mode::Encode(args) => encode_args(&args),
    }
}

/// Prints every value on stdin until end of input
async fn decode_stdin() -> anyhow::Result<()> {
    let mut reader = AsyncRespReader::new(tokio::io::stdin());

    while let Some(value) = reader.read_value().await? {
        println!("{}", value);
    }

    info!(
        values = reader.values_read(),
        bytes = reader.bytes_read(),
        "Reached end of input"
    );
    Ok(())
}

/// Writes `args` to stdout as one array of bulk strings
fn encode_args(args: &[String]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut encoder = Encoder::new(stdout.lock());

    encoder.encode(args)?;
    encoder.flush()?;

    debug!(elements = args.len(), "Encoded arguments");
    Ok(())
}
