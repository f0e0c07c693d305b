use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tethertrust::crypto::keystore::DEFAULT_KEY_DIR;

#[derive(Debug, Parser)]
#[command(name = "tethernode")]
#[command(about = "Mutually authenticated handshake server and client")]
#[command(version)]
pub(crate) struct Cli {
    /// Directory holding `<name>.pem` and `<name>.pub.pem` key files.
    #[arg(long, global = true, default_value = DEFAULT_KEY_DIR)]
    pub keys_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Accept connections and answer handshakes.
    Server {
        #[arg(short, long)]
        port: u16,
        /// Close connections that send no command for this many seconds.
        #[arg(long)]
        idle_timeout: Option<u64>,
        /// Log a liveness tick per connection every this many seconds.
        #[arg(long)]
        heartbeat: Option<u64>,
    },
    /// Connect, run one handshake and optionally an echo.
    Client {
        #[arg(short, long)]
        port: u16,
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long)]
        echo: Option<String>,
    },
    /// Generate an identity key pair and write it to the key directory.
    GenerateKeys {
        #[arg(short, long)]
        name: String,
    },
}
