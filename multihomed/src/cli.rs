//! Command-line surface.
//!
//! Exit codes are part of the contract: `--help` exits 1, `--version`
//! exits 0, a parse error exits 1, a clean run exits 0. clap's defaults
//! differ, so parsing goes through [`Cli::parse_or_exit`].

use std::{path::PathBuf, process::exit};

use clap::{error::ErrorKind, ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "multihomed",
    version,
    about = "Keeps per-interface policy routing tables in sync with the kernel main table"
)]
pub struct Cli {
    /// Managed interface and its custom routing table, as NAME:TABLE.
    /// May be given multiple times.
    #[arg(long = "network", value_name = "IFNAME:TABLE")]
    pub network: Vec<String>,

    /// Configuration file carrying NETWORK / NETWORK1..5 entries.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log severity threshold: 0 = trace, 1 = debug, 2 = info,
    /// 3 = warning, 4 = error, 5 = fatal.
    #[arg(short = 'L', long, value_name = "LEVEL", default_value_t = 2)]
    pub loglevel: u8,

    /// Log everything (same as --loglevel 0).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Warnings and errors only (same as --loglevel 3).
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Append log output to this file instead of stderr.
    #[arg(short = 'O', long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// ANSI colour escape sequences in log output.
    #[arg(short = 'Z', long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub logcolor: bool,
}

impl Cli {
    /// Parse the process arguments, honouring the exit-code contract.
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                let code = match err.kind() {
                    ErrorKind::DisplayVersion => 0,
                    _ => 1,
                };
                let _ = err.print();
                exit(code);
            }
        }
    }

    /// The default `tracing` directive for the selected severity;
    /// `RUST_LOG` overrides it.
    pub fn default_directive(&self) -> &'static str {
        let level = if self.verbose {
            0
        } else if self.quiet {
            3
        } else {
            self.loglevel
        };
        match level {
            0 => "trace",
            1 => "debug",
            2 => "info",
            3 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_network_options_accumulate() {
        let cli = Cli::try_parse_from([
            "multihomed",
            "--network",
            "eth0:1000",
            "--network",
            "eth1:1001",
        ])
        .unwrap();
        assert_eq!(cli.network, vec!["eth0:1000", "eth1:1001"]);
        assert_eq!(cli.default_directive(), "info");
    }

    #[test]
    fn verbose_wins_over_the_numeric_level() {
        let cli = Cli::try_parse_from(["multihomed", "-L", "4", "-v"]).unwrap();
        assert_eq!(cli.default_directive(), "trace");
    }

    #[test]
    fn quiet_maps_to_warn() {
        let cli = Cli::try_parse_from(["multihomed", "--quiet"]).unwrap();
        assert_eq!(cli.default_directive(), "warn");
    }

    #[test]
    fn logcolor_takes_an_explicit_value() {
        let cli = Cli::try_parse_from(["multihomed", "--logcolor", "false"]).unwrap();
        assert!(!cli.logcolor);
        let cli = Cli::try_parse_from(["multihomed"]).unwrap();
        assert!(cli.logcolor);
    }

    #[test]
    fn unknown_options_fail_to_parse() {
        assert!(Cli::try_parse_from(["multihomed", "--bogus"]).is_err());
    }
}
