use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use votifier::client;
use votifier::crypto::keys;
use votifier::Vote;

#[derive(Parser)]
#[command(name = "vote-cli")]
#[command(about = "Test client and key tool for the vote receiver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one vote to a receiver
    Send {
        #[arg(short, long, default_value = "127.0.0.1:8192")]
        address: SocketAddr,

        /// Receiver's public.key file
        #[arg(short = 'k', long, default_value = "rsa/public.key")]
        public_key: PathBuf,

        #[arg(long, default_value = "vote-cli")]
        service: String,

        #[arg(short, long)]
        username: String,

        /// Voter address reported to the receiver
        #[arg(long, default_value = "127.0.0.1")]
        voter_address: String,

        /// Defaults to the current Unix time
        #[arg(long)]
        timestamp: Option<String>,

        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Generate a key pair into a directory
    Keygen {
        #[arg(short, long, default_value = "rsa")]
        directory: PathBuf,

        #[arg(long, default_value_t = keys::DEFAULT_KEY_BITS)]
        bits: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            address,
            public_key,
            service,
            username,
            voter_address,
            timestamp,
            timeout_secs,
        } => {
            let key = keys::load_public_key(&public_key)?;
            let timestamp = match timestamp {
                Some(ts) => ts,
                None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs().to_string(),
            };
            let vote = Vote::new(service, username, voter_address, timestamp);

            let version = client::send_vote(address, &key, &vote, Duration::from_secs(timeout_secs)).await?;
            println!("Sent {} to receiver version {}", vote, version);
        }
        Commands::Keygen { directory, bits } => {
            if directory.join(keys::PRIVATE_KEY_FILE).exists() {
                eprintln!("Error: {} already holds a key pair", directory.display());
                std::process::exit(1);
            }
            let pair = keys::generate(bits)?;
            keys::save(&directory, &pair)?;
            println!("Wrote key pair to {}", directory.display());
        }
    }

    Ok(())
}
