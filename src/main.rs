// Entry point for the ledger-core command line tool
use clap::Parser;
use ledger_core::config::wallet_passphrase_from_env;
use ledger_core::{
    validate_address, Block, Command, Config, Opt, SledStorage, Transaction, UtxoSet, Wallet,
    GLOBAL_CONFIG,
};
use log::{error, LevelFilter};
use std::process;
use std::sync::Arc;

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &opt.config {
        Some(path) => Config::load(Some(path.as_path()))?,
        None => GLOBAL_CONFIG.clone(),
    };

    match opt.command {
        Command::ValidateAddress { address } => {
            if validate_address(&address) {
                println!("{address} is valid");
            } else {
                println!("{address} is NOT valid");
            }
        }
        Command::DecodeTx { tx } => {
            let tx = Transaction::deserialize(&tx.0)?;
            println!("{tx}");
            tx.validate()?;
            tx.verify_signatures()?;
            println!("Transaction is valid");
        }
        Command::DecodeBlock { block } => {
            let block = Block::deserialize(&block.0)?;
            println!("{block}");
            block.validate()?;
            for tx in block.get_transactions() {
                tx.verify_signatures()?;
            }
            println!("Block {} is valid", block.hex_hash());
        }
        Command::CreateAccount => {
            let wallet = open_wallet(&config, opt.passphrase)?;
            let address = wallet.create_account()?;
            wallet.save()?;
            println!("Your new address: {address}");
        }
        Command::ListAccounts => {
            let wallet = open_wallet(&config, opt.passphrase)?;
            let default = wallet.get_default_account();
            for account in wallet.get_all_accounts() {
                let marker = if Some(&account) == default.as_ref() {
                    " (default)"
                } else {
                    ""
                };
                println!("{account}{marker}");
            }
        }
        Command::ImportKey { key } => {
            let wallet = open_wallet(&config, opt.passphrase)?;
            let account = wallet.import_private_key(&key)?;
            wallet.save()?;
            println!("Imported {}", account.get_address());
        }
        Command::ExportKey { address } => {
            let wallet = open_wallet(&config, opt.passphrase)?;
            println!("{}", wallet.export_private_key(&address)?);
        }
    }
    Ok(())
}

// The CLI has no chain to scan, so balances stay whatever the wallet cached
fn open_wallet(
    config: &Config,
    passphrase: Option<String>,
) -> Result<Wallet, Box<dyn std::error::Error>> {
    let passphrase = passphrase
        .or_else(wallet_passphrase_from_env)
        .ok_or("no wallet passphrase: pass --passphrase or set LEDGER_WALLET_PASSPHRASE")?;
    let storage = Arc::new(SledStorage::open(config.get_data_dir())?);
    let wallet = Wallet::open(
        &config.wallet,
        &passphrase,
        Arc::new(UtxoSet::new()),
        storage,
    )?;
    Ok(wallet)
}
