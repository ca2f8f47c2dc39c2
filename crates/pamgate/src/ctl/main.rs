//! pamgatectl - control CLI for the pamgated daemon.
//!
//! Speaks the newline-delimited JSON protocol over the daemon socket.

use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

const DEFAULT_SOCKET: &str = "/run/pamgate/pamgate.sock";

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "Error: {err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let mut conn = Connection::open(&cli.socket)?;

    let response = match &cli.command {
        Command::Verify { username } => {
            let password = read_password()?;
            conn.request(
                "authenticate",
                json!({ "username": username, "password": password }),
            )?
        }
        Command::Lookup { username } => conn.request("lookup", json!({ "username": username }))?,
        Command::Group { name } => conn.request("lookup-group", json!({ "group": name }))?,
        Command::Diagnose => conn.request("diagnose", json!({}))?,
        Command::Ping => conn.request("ping", json!({}))?,
    };

    render(&response, cli.json)
}

#[derive(Debug, Parser)]
#[command(
    name = "pamgatectl",
    author,
    version,
    about = "Control CLI for the pamgated daemon - verify logins, look up users and groups."
)]
struct Cli {
    /// Daemon socket path
    #[arg(long, short = 's', default_value = DEFAULT_SOCKET, env = "PAMGATE_SOCKET")]
    socket: PathBuf,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify a username/password pair (password read from stdin)
    Verify { username: String },

    /// Look up a user and its group memberships (no password)
    Lookup { username: String },

    /// Check that a group exists ("@" marker accepted)
    Group { name: String },

    /// Run the shadow-database readability self-test
    Diagnose,

    /// Check daemon health and configuration
    Ping,
}

/// Read the password from stdin so it can be piped in; no terminal echo
/// handling.
fn read_password() -> Result<String> {
    if io::stdin().is_terminal() {
        eprint!("Password: ");
        let _ = io::stderr().flush();
    }
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

struct Connection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Connection {
    fn open(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("connecting to pamgated at {}", path.display()))?;
        let reader = BufReader::new(stream.try_clone().context("cloning socket")?);
        Ok(Self {
            reader,
            writer: stream,
        })
    }

    fn request(&mut self, cmd: &str, args: Value) -> Result<Value> {
        let mut line = serde_json::to_string(&json!({ "cmd": cmd, "args": args }))?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .context("sending request")?;
        self.writer.flush().context("flushing request")?;

        let mut response = String::new();
        self.reader
            .read_line(&mut response)
            .context("reading response")?;
        if response.is_empty() {
            bail!("daemon closed the connection");
        }
        serde_json::from_str(response.trim_end()).context("parsing response")
    }
}

fn render(response: &Value, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    if response.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        match response.get("data") {
            Some(data) => println!("{}", serde_json::to_string_pretty(data)?),
            None => println!("ok"),
        }
        Ok(())
    } else {
        let message = response
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        bail!("{message}");
    }
}
