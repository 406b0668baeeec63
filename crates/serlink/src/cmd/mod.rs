use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod ports;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a message and send it over the link.
    Send(SendArgs),
    /// Listen and print validated inbound frames.
    Listen(ListenArgs),
    /// List serial devices on this host.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device to open.
    pub device: PathBuf,
    /// Line speed in baud.
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Five-character frame envelope (station/function addressing).
    #[arg(long, default_value = "10001")]
    pub envelope: String,
    /// Message text.
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,
    /// Read message text from a file.
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,
    /// Maximum time to wait for the transfer window to close (e.g. 60s, 500ms).
    #[arg(long, default_value = "60s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device to open.
    pub device: PathBuf,
    /// Line speed in baud.
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
