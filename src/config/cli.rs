use clap::Parser;
use parking_lot::RwLock;
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Duration,
};

use super::types::LogLevel;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static CLI_CONFIG: OnceLock<Arc<RwLock<CliConfig>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub listen_addr: SocketAddr,
    pub config_file_location: Option<PathBuf>,
    pub log_level: LogLevel,
    pub idle_timeout: Option<Duration>,
    pub max_payload_len: usize,
}

impl CliConfig {
    pub fn init() {
        CLI_CONFIG.get_or_init(|| {
            let cfg = Self::from_args();
            cfg.validate();
            Arc::new(RwLock::new(cfg))
        });
    }

    pub fn snapshot() -> CliConfig {
        handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- CliConfig: Private ----------------------------------------------------

impl CliConfig {
    fn from_args() -> Self {
        let args = Args::try_parse().unwrap_or_else(|e| e.exit());
        Self::from_parsed(args)
    }

    fn from_parsed(args: Args) -> Self {
        let idle_timeout: Duration = args.idle_timeout.into();

        Self {
            listen_addr: SocketAddr::from((args.host, args.port)),
            config_file_location: args.config_file,
            log_level: args.log_level,
            idle_timeout: (!idle_timeout.is_zero()).then_some(idle_timeout),
            max_payload_len: args.max_payload,
        }
    }

    fn validate(&self) {
        if let Some(path) = self.config_file_location.as_ref() {
            must_exist_file(path, "--config / IMGATE_CONFIG_FILE");
        }

        if self.max_payload_len == 0 {
            panic!("--max-payload must be greater than zero");
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "imgate", version, about = "Instant-messaging connection gateway")]
struct Args {
    // IPv4 or IPv6 literal (e.g., 0.0.0.0, 127.0.0.1, ::, ::1).
    #[arg(long = "host", short = 'H', env = "IMGATE_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(long = "port", short = 'p', env = "IMGATE_PORT", default_value_t = 8085)]
    port: u16,

    #[arg(long = "log", default_value = "info")]
    log_level: LogLevel,

    // Optional; without it the gateway runs alone and never forwards.
    #[arg(long = "config", env = "IMGATE_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    // "0s" disables the read-idle timeout.
    #[arg(long = "idle-timeout", env = "IMGATE_IDLE_TIMEOUT", default_value = "5m")]
    idle_timeout: humantime::Duration,

    // Largest accepted payload, in bytes.
    #[arg(long = "max-payload", env = "IMGATE_MAX_PAYLOAD", default_value_t = 1024 * 1024)]
    max_payload: usize,
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

fn handle() -> Arc<RwLock<CliConfig>> {
    CLI_CONFIG
        .get()
        .expect("config not initialized; call config::init().await first")
        .clone()
}

fn must_exist_file(path: &Path, hint: &str) {
    let md = fs::metadata(path).unwrap_or_else(|_| {
        panic!("required file missing: {} (from {hint})", path.display());
    });

    if !md.is_file() {
        panic!("path is not a file: {} (from {hint})", path.display());
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
