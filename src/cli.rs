//! Command line interface for the `gattframe` binary.
//!
//! `decode` replays captured notifications through the accumulator and
//! prints each response; `encode` builds a response and prints the
//! notifications it would be split into.

use std::{io::Write, num::NonZeroUsize};

use clap::{Parser, Subcommand};
use gattframe::{
    AccumulateStatus,
    DecodedMessage,
    FragmentAccumulator,
    Fragmenter,
    config::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MTU},
    decode,
    hexdump::{HexBytes, parse_hex},
};

/// Command line arguments for the `gattframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "gattframe",
    version,
    about = "Reassemble and decode BLE GATT response notifications"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reassemble hex notifications and print the decoded responses.
    Decode {
        /// Notifications in arrival order, e.g. `05:01:00:01:01:ab`.
        #[arg(required = true)]
        fragments: Vec<String>,
        /// Reject responses declaring more payload bytes than this.
        #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
        max_message_size: NonZeroUsize,
    },
    /// Encode a response and print its notifications as hex.
    Encode {
        /// Message id, decimal or `0x` hex.
        #[arg(long, value_parser = parse_byte)]
        id: u8,
        /// Status byte, decimal or `0x` hex.
        #[arg(long, default_value = "0", value_parser = parse_byte)]
        status: u8,
        /// Parameter as `TAG=HEX`, repeatable.
        #[arg(long = "param", value_parser = parse_parameter)]
        parameters: Vec<(u8, Vec<u8>)>,
        /// Maximum notification size in bytes.
        #[arg(long, default_value_t = DEFAULT_MTU)]
        mtu: NonZeroUsize,
    },
}

fn parse_hex_arg(text: &str) -> Result<Vec<u8>, String> {
    parse_hex(text).map_err(|err| format!("invalid hex {text:?}: {err}"))
}

fn parse_byte(text: &str) -> Result<u8, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("invalid byte {text:?}: {err}"))
}

fn parse_parameter(text: &str) -> Result<(u8, Vec<u8>), String> {
    let (tag, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=HEX, got {text:?}"))?;
    Ok((parse_byte(tag)?, parse_hex_arg(value)?))
}

/// Errors surfaced by [`run`].
pub type RunError = Box<dyn std::error::Error + Send + Sync>;

/// Execute `command`, writing human-readable output to `out`.
///
/// # Errors
///
/// Returns an error when reassembly, decoding or encoding fails, when the
/// notifications end mid-response, or when writing to `out` fails.
pub fn run(command: Command, out: &mut impl Write) -> Result<(), RunError> {
    match command {
        Command::Decode {
            fragments,
            max_message_size,
        } => decode_fragments(&fragments, max_message_size, out),
        Command::Encode {
            id,
            status,
            parameters,
            mtu,
        } => {
            let message = parameters
                .into_iter()
                .fold(DecodedMessage::new(id, status), |message, (tag, value)| {
                    message.with_parameter(tag, value)
                });
            let batch = Fragmenter::new(mtu)?.fragment_message(&message)?;
            for fragment in batch {
                writeln!(out, "{}", HexBytes(&fragment))?;
            }
            Ok(())
        }
    }
}

fn decode_fragments(
    fragments: &[String],
    max_message_size: NonZeroUsize,
    out: &mut impl Write,
) -> Result<(), RunError> {
    let mut accumulator = FragmentAccumulator::with_max_message_size(max_message_size);
    for text in fragments {
        let fragment = parse_hex_arg(text)?;
        if accumulator.accumulate(&fragment)? != AccumulateStatus::Complete {
            continue;
        }
        let payload = accumulator.take_message().unwrap_or_default();
        write_message(&decode(&payload)?, out)?;
    }

    if accumulator.is_in_progress() {
        return Err(format!(
            "notifications ended with {} payload bytes outstanding",
            accumulator.remaining()
        )
        .into());
    }
    Ok(())
}

fn write_message(message: &DecodedMessage, out: &mut impl Write) -> std::io::Result<()> {
    let outcome = if message.is_success() {
        "success"
    } else {
        "failure"
    };
    writeln!(
        out,
        "id={:#04x} status={} ({outcome})",
        message.id(),
        message.status()
    )?;
    for (tag, value) in message.parameters() {
        writeln!(out, "  {tag:#04x}: {}", HexBytes(value))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, run};

    fn run_args(args: &[&str]) -> Result<String, super::RunError> {
        let cli = Cli::try_parse_from(args)?;
        let mut out = Vec::new();
        run(cli.command, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn parses_encode_options() {
        let cli = Cli::parse_from([
            "gattframe", "encode", "--id", "0x13", "--param", "1=ab:cd", "--mtu", "8",
        ]);
        let Command::Encode {
            id,
            status,
            parameters,
            mtu,
        } = cli.command
        else {
            panic!("expected encode command");
        };
        assert_eq!(id, 0x13);
        assert_eq!(status, 0);
        assert_eq!(parameters, vec![(1, vec![0xab, 0xcd])]);
        assert_eq!(mtu.get(), 8);
    }

    #[test]
    fn decode_prints_each_response() {
        let output = run_args(&[
            "gattframe",
            "decode",
            "05:01:00:01:01:ab",
            "04:13:02",
            "80:02:00",
        ])
        .expect("decode succeeds");
        assert_eq!(
            output,
            "id=0x01 status=0 (success)\n  0x01: ab\nid=0x13 status=2 (failure)\n  0x02: \n"
        );
    }

    #[test]
    fn decode_reports_trailing_partial_response() {
        let err = run_args(&["gattframe", "decode", "06:01:00"]).expect_err("incomplete");
        assert_eq!(
            err.to_string(),
            "notifications ended with 4 payload bytes outstanding"
        );
    }

    #[test]
    fn encode_prints_fragments() {
        let output = run_args(&[
            "gattframe",
            "encode",
            "--id",
            "1",
            "--param",
            "0x01=0102030405",
            "--mtu",
            "6",
        ])
        .expect("encode succeeds");
        assert_eq!(output, "09:01:00:01:05:01\n80:02:03:04:05\n");
    }

    #[test]
    fn decode_rejects_invalid_hex() {
        let err = run_args(&["gattframe", "decode", "0g"]).expect_err("invalid hex");
        assert!(err.to_string().starts_with("invalid hex \"0g\""));
    }

    #[test]
    fn rejects_malformed_parameter() {
        assert!(Cli::try_parse_from(["gattframe", "encode", "--id", "1", "--param", "zz"]).is_err());
    }
}
