//! pamgated: PAM authentication gateway daemon.
//!
//! Listens on a root-owned unix socket and answers newline-delimited JSON
//! requests (see `pamgate::daemon`). Intended to run as root: PAM can only
//! verify other accounts' credentials when it can read the shadow password
//! database.

use std::fs;
use std::io::{self, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use log::{error, info, warn};

use pamgate::config::{DEFAULT_SERVICE, DEFAULT_SOCKET, PamgateConfig};
use pamgate::daemon;
use pamgate::gateway::{self, PamGateway};

const APP_NAME: &str = "pamgate";
const DEFAULT_CONFIG_PATH: &str = "/etc/pamgate/pamgate.toml";

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "Error: {err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = load_or_init_config(&cli)?;
    let gateway = gateway::install(config.gateway.clone())
        .context("this platform has no native PAM stack; refusing to start")?;

    if unsafe { libc::geteuid() } != 0 {
        warn!("not running as root; PAM will usually reject logins for other accounts");
    }

    info!(
        "pamgated starting (pid {}, service '{}')",
        std::process::id(),
        gateway.service_name()
    );

    let socket_path = cli
        .socket
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.daemon.socket));
    serve(&gateway, &socket_path)
}

#[derive(Debug, Parser)]
#[command(
    name = "pamgated",
    author,
    version,
    about = "PAM authentication gateway daemon."
)]
struct Cli {
    /// Config file path
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH, env = "PAMGATE_CONFIG")]
    config: PathBuf,

    /// Unix socket to listen on (overrides the config file)
    #[arg(long)]
    socket: Option<PathBuf>,
}

fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.try_init().ok();
}

fn load_or_init_config(cli: &Cli) -> Result<PamgateConfig> {
    if !cli.config.exists() {
        write_default_config(&cli.config)?;
    }

    let built = Config::builder()
        .set_default("gateway.service_name", DEFAULT_SERVICE)?
        .set_default("daemon.socket", DEFAULT_SOCKET)?
        .add_source(
            File::from(cli.config.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix("PAMGATE").separator("__"))
        .build()
        .context("loading configuration")?;

    built.try_deserialize().context("parsing configuration")
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = PamgateConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = format!("# Configuration for {APP_NAME}\n# File: {}\n\n", path.display());
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))?;
    info!("wrote default config to {}", path.display());
    Ok(())
}

fn serve(gateway: &PamGateway, socket_path: &Path) -> Result<()> {
    // Remove any stale socket from a previous run
    let _ = fs::remove_file(socket_path);

    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating socket directory {}", parent.display()))?;
    }

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("binding {}", socket_path.display()))?;
    restrict_socket(socket_path)?;

    info!("listening on {}", socket_path.display());

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => daemon::handle_connection(gateway, stream),
            Err(e) => error!("accept error: {e}"),
        }
    }

    Ok(())
}

fn restrict_socket(socket_path: &Path) -> Result<()> {
    // Mode 0600: only the socket owner may connect, so every accepted peer
    // is administrative.
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(socket_path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("restricting permissions on {}", socket_path.display()))
}
