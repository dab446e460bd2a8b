//! Command-line interface.

pub mod doctor;

use clap::{Parser, Subcommand};

use crate::signer::{hash_message, recover_address};

#[derive(Parser, Debug)]
#[command(name = "unified-wallet", version, about = "Unified smart wallet tooling")]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "WALLET_LOG_JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check wallet configuration and wallet API reachability.
    Doctor {
        /// Exit non-zero when any check fails.
        #[arg(long)]
        strict: bool,
    },
    /// Print the EIP-191 personal-sign digest of a message.
    HashMessage {
        message: String,
        /// Also recover the address that produced this signature over the message.
        #[arg(long)]
        signature: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Doctor { strict } => doctor::run_doctor_command(strict).await,
            Command::HashMessage { message, signature } => {
                println!("0x{}", hex::encode(hash_message(message.as_bytes())));
                if let Some(signature) = signature {
                    let signer = recover_address(message.as_bytes(), &signature)?;
                    println!("signer: {signer}");
                }
                Ok(())
            }
        }
    }
}
