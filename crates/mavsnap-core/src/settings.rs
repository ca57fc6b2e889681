use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::message_types::MessageTypeList;
use crate::snapshot::DEFAULT_PARAMS_DIR;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Poll MAVLink telemetry into JSON snapshots and serve them over HTTP
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mavsnap",
    about = "Poll MAVLink telemetry into JSON snapshots and serve them over HTTP",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (logs are also written to stderr)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Read telemetry from the vehicle link and write snapshot files
    Collect(CollectorArgs),
    /// Serve snapshot files and the web page over HTTP
    Serve(PresenterArgs),
}

// ── Collector ──────────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone)]
pub struct CollectorArgs {
    /// Telemetry link: a serial device, serial:<dev>:<baud>, udpin:<host>:<port>,
    /// udpout:<host>:<port>, tcpin:<host>:<port> or tcpout:<host>:<port>
    #[arg(long, env = "MAVSNAP_LINK", default_value = "/dev/tty.usbserial-0001")]
    pub link: String,

    /// Baud rate for serial devices given without one
    #[arg(long, default_value = "57600")]
    pub baud: u32,

    /// Directory that receives the <TYPE>.json snapshots
    #[arg(long, env = "MAVSNAP_PARAMS_DIR", default_value = DEFAULT_PARAMS_DIR)]
    pub params_dir: PathBuf,

    /// Comma-separated message types to poll, in order
    #[arg(long)]
    pub message_types: Option<String>,

    /// How long to wait for each message type, in milliseconds
    #[arg(long, default_value = "500", value_parser = clap::value_parser!(u64).range(1..))]
    pub receive_timeout_ms: u64,

    /// Interval between polling cycles, in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub cycle_interval_ms: u64,

    /// Give up if no heartbeat arrives within this many seconds (default: wait forever)
    #[arg(long)]
    pub heartbeat_timeout_secs: Option<u64>,
}

impl CollectorArgs {
    /// The configured message types, or the default list.
    pub fn message_type_list(&self) -> Result<MessageTypeList> {
        match &self.message_types {
            Some(list) => MessageTypeList::parse(list),
            None => Ok(MessageTypeList::default()),
        }
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Option<Duration> {
        self.heartbeat_timeout_secs.map(Duration::from_secs)
    }
}

// ── Presenter ──────────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone)]
pub struct PresenterArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MAVSNAP_PORT", default_value = "5000")]
    pub port: u16,

    /// Directory holding the <TYPE>.json snapshots
    #[arg(long, env = "MAVSNAP_PARAMS_DIR", default_value = DEFAULT_PARAMS_DIR)]
    pub params_dir: PathBuf,

    /// Directory holding templates/index.html and static/
    #[arg(long, default_value = "web")]
    pub web_root: PathBuf,
}

impl PresenterArgs {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` flag.
    pub fn load() -> Self {
        Self::load_from(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
