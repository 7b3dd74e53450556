use clap::{Parser, Subcommand};
use data_encoding::HEXLOWER_PERMISSIVE;
use std::path::PathBuf;
use std::str::FromStr;

/// Raw bytes given on the command line as hex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HEXLOWER_PERMISSIVE
            .decode(s.trim().as_bytes())
            .map(HexBytes)
            .map_err(|e| format!("Invalid hex: {e}"))
    }
}

#[derive(Debug, Parser)]
#[command(name = "ledger-core")]
pub struct Opt {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Wallet passphrase (defaults to LEDGER_WALLET_PASSPHRASE)"
    )]
    pub passphrase: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createaccount", about = "Create a new account in the wallet")]
    CreateAccount,
    #[command(name = "listaccounts", about = "Print the wallet's accounts")]
    ListAccounts,
    #[command(name = "importkey", about = "Import a hex-encoded private key")]
    ImportKey {
        #[arg(help = "The private key as 64 hex characters")]
        key: String,
    },
    #[command(name = "exportkey", about = "Print the private key of an account")]
    ExportKey {
        #[arg(help = "The account address")]
        address: String,
    },
    #[command(name = "validateaddress", about = "Check a Base58Check address")]
    ValidateAddress {
        #[arg(help = "The address to check")]
        address: String,
    },
    #[command(name = "decodetx", about = "Decode and verify a serialized transaction")]
    DecodeTx {
        #[arg(help = "The transaction bytes as hex")]
        tx: HexBytes,
    },
    #[command(name = "decodeblock", about = "Decode and validate a serialized block")]
    DecodeBlock {
        #[arg(help = "The block bytes as hex")]
        block: HexBytes,
    },
}
