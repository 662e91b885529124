use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clipbridge::retry::RetryPolicy;

#[derive(Parser)]
#[command(name = "clipbridge", about = "Read and write the system clipboard")]
pub struct Cli {
    /// Retries while another application holds the clipboard
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: u32,

    /// Delay before the first retry, in milliseconds (doubles each time)
    #[arg(long, global = true, default_value_t = 20)]
    pub retry_delay_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_millis(self.retry_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Show the clipboard contents
    Read {
        /// Write the raw bytes of the first item of this type to stdout
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Save every item to a snapshot file
        #[arg(long, conflicts_with = "kind")]
        dump: Option<PathBuf>,
    },

    /// Replace the clipboard contents
    Write {
        /// Logical type of the data read from stdin [default: text/plain]
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Write every item of a snapshot file instead of stdin
        #[arg(long, conflicts_with = "kind")]
        restore: Option<PathBuf>,

        /// On X11/Wayland, stop serving the data after this many seconds
        /// [default: until another application takes it over]
        #[arg(long, value_name = "SECS")]
        serve_secs: Option<u64>,
    },

    /// List the clipboard types the active backend supports
    Types,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_with_type() {
        let cli = Cli::try_parse_from(["clipbridge", "read", "--type", "text/html"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Read {
                kind: Some("text/html".into()),
                dump: None,
            }
        );
    }

    #[test]
    fn type_conflicts_with_dump() {
        assert!(
            Cli::try_parse_from(["clipbridge", "read", "--type", "a/b", "--dump", "x"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["clipbridge", "write", "--type", "a/b", "--restore", "x"])
                .is_err()
        );
    }

    #[test]
    fn retry_flags_build_policy() {
        let cli =
            Cli::try_parse_from(["clipbridge", "types", "--retries", "7", "--retry-delay-ms", "5"])
                .unwrap();
        let policy = cli.retry_policy();
        assert_eq!(policy.retries, 7);
        assert_eq!(policy.delay, Duration::from_millis(5));
    }

    #[test]
    fn write_serve_limit() {
        let cli = Cli::try_parse_from(["clipbridge", "write", "--serve-secs", "30"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Write {
                kind: None,
                restore: None,
                serve_secs: Some(30),
            }
        );
    }

    #[test]
    fn retry_defaults() {
        let cli = Cli::try_parse_from(["clipbridge", "write"]).unwrap();
        assert_eq!(cli.retries, 3);
        assert_eq!(cli.retry_delay_ms, 20);
    }
}
