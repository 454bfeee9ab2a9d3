use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use njall_core::{FrameCodec, WireCodec};

/// Output format of the console log layer.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Runtime configuration for the `njall-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for a single-node
/// deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "njall-server",
    version,
    about = "Receives framed envelopes and dispatches them to verticle workers"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix
    /// socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/njall.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a
    /// file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Number of verticle workers. Each owns one subscription; envelopes are
    /// distributed round-robin.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 1)]
    pub num_workers: usize,

    /// Capacity of each worker's mailbox. A full mailbox applies backpressure
    /// to the connection that feeds it.
    ///
    /// Environment variable: `MAILBOX_SIZE`
    #[arg(long, env = "MAILBOX_SIZE", default_value_t = 64)]
    pub mailbox_size: usize,

    /// Largest accepted frame payload in bytes. Connections that announce a
    /// larger frame are closed.
    ///
    /// Environment variable: `MAX_FRAME_BYTES`
    #[arg(long, env = "MAX_FRAME_BYTES", default_value_t = FrameCodec::DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_bytes: usize,

    /// Seconds to wait for workers to acknowledge shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Console log format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub num_workers: usize,
    pub mailbox_size: usize,
    pub max_frame_bytes: usize,
    pub shutdown_timeout: Duration,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.mailbox_size == 0 {
            bail!("MAILBOX_SIZE must be greater than 0");
        }

        if args.max_frame_bytes < WireCodec::HEADER_LEN {
            bail!(
                "MAX_FRAME_BYTES ({}) must be at least the frame header size ({})",
                args.max_frame_bytes,
                WireCodec::HEADER_LEN
            );
        }

        if u32::try_from(args.max_frame_bytes).is_err() {
            bail!(
                "MAX_FRAME_BYTES ({}) exceeds the largest encodable frame ({})",
                args.max_frame_bytes,
                u32::MAX
            );
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            num_workers: args.num_workers,
            mailbox_size: args.mailbox_size,
            max_frame_bytes: args.max_frame_bytes,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            log_format: args.log_format,
        })
    }
}
