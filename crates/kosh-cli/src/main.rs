//! Command-line front end for the Kosh wallet vault
//!
//! Every invocation opens the vault database, unlocks it with the given PIN
//! where the command needs a session, runs one operation and exits. Run
//! `set-pin` before any command that takes `--pin`.

use clap::{Parser, Subcommand};
use kosh_core::{ChainId, ChainRegistry};
use kosh_wallet_service::{VaultConfig, WalletVault};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "kosh")]
#[command(about = "Kosh multi-chain wallet vault", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, default_value = "kosh.json")]
    config: PathBuf,

    /// Database path (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with default values
    Init,

    /// Configure the PIN (or change it with --current)
    SetPin {
        /// New 6-digit PIN
        #[arg(long)]
        pin: String,

        /// Current PIN, when one is already set
        #[arg(long)]
        current: Option<String>,
    },

    /// Create the wallet, or derive the next address if it exists
    Create {
        #[arg(long)]
        pin: String,

        #[arg(long)]
        password: String,

        /// Chain for the address (defaults to the configured chain)
        #[arg(long)]
        chain: Option<ChainId>,

        /// Restore from this mnemonic instead of generating one
        #[arg(long)]
        mnemonic: Option<String>,
    },

    /// Derive the next address on a chain
    Add {
        #[arg(long)]
        pin: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        chain: Option<ChainId>,
    },

    /// List wallet addresses
    List {
        #[arg(long)]
        pin: String,
    },

    /// Query balances of every address
    Balance {
        #[arg(long)]
        pin: String,
    },

    /// Write a backup file
    Export {
        #[arg(long)]
        pin: String,

        /// Seal the backup with the PIN
        #[arg(long)]
        seal: bool,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Restore a backup file
    Import {
        #[arg(long)]
        pin: String,

        /// Backup file
        #[arg(short, long)]
        file: PathBuf,

        /// PIN the backup was sealed with (defaults to --pin)
        #[arg(long)]
        backup_pin: Option<String>,
    },

    /// Print the recovery phrase
    Reveal {
        #[arg(long)]
        pin: String,

        #[arg(long)]
        password: String,
    },

    /// Remove the PIN and the wallet stored under it
    ResetPin {
        #[arg(long)]
        pin: String,
    },

    /// Erase the stored wallet
    Logout {
        #[arg(long)]
        pin: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        let config = VaultConfig::default();
        config.save(&cli.config)?;
        info!("Wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let mut config = VaultConfig::load_or_default(&cli.config)?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let default_chain = config.default_chain;
    let mut vault = WalletVault::open(config, ChainRegistry::with_builtin())?;

    match cli.command {
        Commands::Init => {}
        Commands::SetPin { pin, current } => {
            if let Some(current) = current {
                vault.unlock(&current)?;
            }
            vault.set_pin(&pin)?;
            info!("PIN set");
        }
        Commands::Create {
            pin,
            password,
            chain,
            mnemonic,
        } => {
            vault.unlock(&pin)?;
            let key = vault.create_wallet(
                &password,
                chain.unwrap_or(default_chain),
                mnemonic.as_deref(),
            )?;
            println!("{} #{}", key.address, key.index);
        }
        Commands::Add {
            pin,
            password,
            chain,
        } => {
            vault.unlock(&pin)?;
            let key = vault.add_address(&password, chain.unwrap_or(default_chain))?;
            println!("{} #{}", key.address, key.index);
        }
        Commands::List { pin } => {
            vault.unlock(&pin)?;
            list_addresses(&vault);
        }
        Commands::Balance { pin } => {
            vault.unlock(&pin)?;
            for balance in vault.fetch_all_balances().await? {
                println!(
                    "{:<9} {}  USDT {:.2}  native {:.8}",
                    balance.network, balance.address, balance.usdt, balance.native
                );
            }
        }
        Commands::Export { pin, seal, out } => {
            vault.unlock(&pin)?;
            let backup = vault.export_backup(seal.then_some(pin.as_str()))?;
            let path = out.join(&backup.filename);
            std::fs::write(&path, &backup.data)?;
            info!("Backup written to {}", path.display());
        }
        Commands::Import {
            pin,
            file,
            backup_pin,
        } => {
            vault.unlock(&pin)?;
            let data = std::fs::read(&file)?;
            let backup_pin = backup_pin.unwrap_or_else(|| pin.clone());
            vault.import_backup(data, Some(&backup_pin)).await?;
            list_addresses(&vault);
        }
        Commands::Reveal { pin, password } => {
            vault.unlock(&pin)?;
            let phrase = vault.reveal_mnemonic(&password)?;
            println!("{}", phrase.as_str());
        }
        Commands::ResetPin { pin } => {
            vault.unlock(&pin)?;
            vault.reset_pin()?;
            info!("PIN removed");
        }
        Commands::Logout { pin } => {
            vault.unlock(&pin)?;
            vault.logout()?;
            info!("Wallet erased");
        }
    }

    vault.lock();
    Ok(())
}

fn list_addresses(vault: &WalletVault) {
    let record = match vault.record() {
        Some(record) => record,
        None => {
            info!("No wallet yet");
            return;
        }
    };
    for (chain, keys) in record.networks.iter() {
        for key in keys {
            println!("{:<9} #{:<3} {}", chain, key.index, key.address);
        }
    }
}
