//! Quorum CLI - Main entry point

use clap::{Parser, Subcommand};
use quorum_approval::OfferRequest;
use quorum_core::PublicKey;
use quorum_ledger::Thresholds;
use quorum_rpc::{commands, AppContext};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Quorum - multi-signer transaction authorization", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Engine config file (defaults to <data>/config.json when present)
    #[arg(long, env = "QUORUM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new keypair
    Keygen,

    /// Create an account in the sandbox ledger
    SandboxAccount {
        /// Account public key
        account: PublicKey,
        /// Thresholds as master,low,med,high
        #[arg(long, value_parser = parse_thresholds)]
        thresholds: Option<Thresholds>,
        /// Extra signers as <public_key>:<weight>, applied directly
        #[arg(long = "signer", value_parser = parse_weighted_key)]
        signers: Vec<(PublicKey, u8)>,
    },

    /// Stage adding a signer to an account
    AddSigner {
        /// Transaction source account
        #[arg(long)]
        source: PublicKey,
        /// Account that gets the signer (defaults to the source)
        #[arg(long)]
        account: Option<PublicKey>,
        /// Signer public key
        signer: PublicKey,
        /// Signer weight (0 removes)
        weight: u8,
    },

    /// Stage a master weight and thresholds change
    SetThresholds {
        #[arg(long)]
        source: PublicKey,
        #[arg(long)]
        account: Option<PublicKey>,
        /// Thresholds as master,low,med,high
        #[arg(value_parser = parse_thresholds)]
        thresholds: Thresholds,
    },

    /// Stage a payment
    Pay {
        #[arg(long)]
        source: PublicKey,
        /// Paying account (defaults to the source)
        #[arg(long)]
        from: Option<PublicKey>,
        /// Receiving account
        to: PublicKey,
        /// Amount to pay
        amount: String,
        /// Asset code
        #[arg(long, default_value = "XLM")]
        asset: String,
        /// Asset issuer (required for non-native assets)
        #[arg(long)]
        issuer: Option<PublicKey>,
    },

    /// Stage an offer (offer id 0 or omitted creates; sell amount 0 deletes)
    Offer {
        #[arg(long)]
        source: PublicKey,
        #[arg(long)]
        account: Option<PublicKey>,
        #[arg(long)]
        offer_id: Option<String>,
        /// Amount to sell
        #[arg(long)]
        sell: String,
        #[arg(long)]
        sell_asset: String,
        #[arg(long)]
        sell_issuer: Option<PublicKey>,
        /// Amount to buy
        #[arg(long)]
        buy: String,
        #[arg(long)]
        buy_asset: String,
        #[arg(long)]
        buy_issuer: Option<PublicKey>,
    },

    /// Stage a trustline change
    Trust {
        #[arg(long)]
        source: PublicKey,
        #[arg(long)]
        account: Option<PublicKey>,
        /// Asset code
        asset: String,
        /// Asset issuer
        issuer: PublicKey,
        /// Trust limit
        #[arg(long)]
        limit: Option<String>,
    },

    /// Stage an issuer authorizing or revoking a trustline
    AllowTrust {
        #[arg(long)]
        source: PublicKey,
        /// Issuing account (defaults to the source)
        #[arg(long)]
        issuer: Option<PublicKey>,
        /// Asset code
        asset: String,
        /// Trusting account
        trustor: PublicKey,
        /// Revoke instead of authorize
        #[arg(long)]
        revoke: bool,
    },

    /// Stage creating a new account
    CreateAccount {
        #[arg(long)]
        source: PublicKey,
        #[arg(long)]
        funder: Option<PublicKey>,
        /// New account public key
        new_account: PublicKey,
        /// Starting balance
        starting_balance: String,
    },

    /// Stage a home domain change
    HomeDomain {
        #[arg(long)]
        source: PublicKey,
        #[arg(long)]
        account: Option<PublicKey>,
        domain: String,
    },

    /// Stage a flag change, e.g. `setFlags AuthRevocableFlag`
    SetFlags {
        #[arg(long)]
        source: PublicKey,
        #[arg(long)]
        account: Option<PublicKey>,
        /// setFlags or clearFlags
        operation: String,
        /// AuthRequiredFlag, AuthRequiredFlagOnly, AuthRevocableFlag or AuthImmutableFlag
        flag: String,
    },

    /// Sign a staged transaction
    Sign {
        /// Transaction ID
        id: String,
        /// Signer public key
        #[arg(long)]
        public_key: PublicKey,
        /// Signer secret
        #[arg(long, env = "QUORUM_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Pre-authorize a staged transaction by its hash
    PreAuthorize {
        /// Transaction ID
        id: String,
        #[arg(long)]
        public_key: PublicKey,
        #[arg(long, env = "QUORUM_SECRET", hide_env_values = true)]
        secret: String,
        /// Final approver who may release the transaction
        #[arg(long)]
        approver: Option<PublicKey>,
    },

    /// Release a pre-authorized transaction as its final approver
    Approve {
        /// Transaction ID
        id: String,
        /// Approver public key
        #[arg(long)]
        approver: PublicKey,
    },

    /// Submit (or retry) a sufficiently signed transaction
    Submit {
        /// Transaction ID
        id: String,
    },

    /// Show a transaction and its collected weights
    Show {
        /// Transaction ID
        id: String,
    },

    /// List transactions waiting on a key
    Inbox {
        public_key: PublicKey,
    },

    /// List transactions staged by an account
    Initiated {
        source: PublicKey,
    },
}

fn parse_thresholds(value: &str) -> Result<Thresholds, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|e| format!("{}: {}", part, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [master, low, med, high] => Ok(Thresholds::new(*master, *low, *med, *high)),
        _ => Err(format!("expected master,low,med,high, got {}", value)),
    }
}

fn parse_weighted_key(value: &str) -> Result<(PublicKey, u8), String> {
    let (key, weight) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <public_key>:<weight>, got {}", value))?;
    let key = key.parse::<PublicKey>().map_err(|e| e.to_string())?;
    let weight = weight.parse::<u8>().map_err(|e| e.to_string())?;
    Ok((key, weight))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let ctx = AppContext::new(&cli.data, cli.config.as_deref()).await?;

    match cli.command {
        Commands::Keygen => {
            commands::keygen();
        }

        Commands::SandboxAccount {
            account,
            thresholds,
            signers,
        } => {
            commands::sandbox_account(&ctx, &account, thresholds)?;
            for (signer, weight) in &signers {
                commands::sandbox_signer(&ctx, &account, signer, *weight)?;
            }
        }

        Commands::AddSigner {
            source,
            account,
            signer,
            weight,
        } => {
            let account = account.unwrap_or_else(|| source.clone());
            commands::add_signer(&ctx, &source, &account, &signer, weight).await?;
        }

        Commands::SetThresholds {
            source,
            account,
            thresholds,
        } => {
            let account = account.unwrap_or_else(|| source.clone());
            commands::set_thresholds(&ctx, &source, &account, thresholds).await?;
        }

        Commands::Pay {
            source,
            from,
            to,
            amount,
            asset,
            issuer,
        } => {
            let from = from.unwrap_or_else(|| source.clone());
            commands::pay(&ctx, &source, &from, &to, &amount, &asset, issuer.as_ref()).await?;
        }

        Commands::Offer {
            source,
            account,
            offer_id,
            sell,
            sell_asset,
            sell_issuer,
            buy,
            buy_asset,
            buy_issuer,
        } => {
            let account = account.unwrap_or_else(|| source.clone());
            let request = OfferRequest {
                offer_id: offer_id.as_deref(),
                sell_code: &sell_asset,
                sell_issuer: sell_issuer.as_ref(),
                sell_amount: &sell,
                buy_code: &buy_asset,
                buy_issuer: buy_issuer.as_ref(),
                buy_amount: &buy,
            };
            commands::offer(&ctx, &source, &account, &request).await?;
        }

        Commands::Trust {
            source,
            account,
            asset,
            issuer,
            limit,
        } => {
            let account = account.unwrap_or_else(|| source.clone());
            commands::trust(&ctx, &source, &account, &asset, &issuer, limit.as_deref()).await?;
        }

        Commands::AllowTrust {
            source,
            issuer,
            asset,
            trustor,
            revoke,
        } => {
            let issuer = issuer.unwrap_or_else(|| source.clone());
            commands::allow_trust(&ctx, &source, &issuer, &asset, &trustor, !revoke).await?;
        }

        Commands::CreateAccount {
            source,
            funder,
            new_account,
            starting_balance,
        } => {
            let funder = funder.unwrap_or_else(|| source.clone());
            commands::create_account(&ctx, &source, &funder, &new_account, &starting_balance)
                .await?;
        }

        Commands::HomeDomain {
            source,
            account,
            domain,
        } => {
            let account = account.unwrap_or_else(|| source.clone());
            commands::home_domain(&ctx, &source, &account, &domain).await?;
        }

        Commands::SetFlags {
            source,
            account,
            operation,
            flag,
        } => {
            let account = account.unwrap_or_else(|| source.clone());
            commands::set_flags(&ctx, &source, &account, &operation, &flag).await?;
        }

        Commands::Sign {
            id,
            public_key,
            secret,
        } => {
            commands::sign(&ctx, &public_key, &secret, &id).await?;
        }

        Commands::PreAuthorize {
            id,
            public_key,
            secret,
            approver,
        } => {
            commands::pre_authorize(&ctx, &public_key, &secret, &id, approver.as_ref()).await?;
        }

        Commands::Approve { id, approver } => {
            commands::approve(&ctx, &id, &approver).await?;
        }

        Commands::Submit { id } => {
            commands::submit(&ctx, &id).await?;
        }

        Commands::Show { id } => {
            commands::show(&ctx, &id).await?;
        }

        Commands::Inbox { public_key } => {
            commands::inbox(&ctx, &public_key)?;
        }

        Commands::Initiated { source } => {
            commands::initiated(&ctx, &source)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thresholds() {
        assert_eq!(parse_thresholds("1,1,2,3").unwrap(), Thresholds::new(1, 1, 2, 3));
        assert_eq!(parse_thresholds("1, 2, 2, 2").unwrap(), Thresholds::new(1, 2, 2, 2));
        assert!(parse_thresholds("1,2,3").is_err());
        assert!(parse_thresholds("1,2,3,300").is_err());
    }

    #[test]
    fn test_parse_weighted_key() {
        let key = "ab".repeat(32);
        let (parsed, weight) = parse_weighted_key(&format!("{}:2", key)).unwrap();
        assert_eq!(parsed.as_str(), key);
        assert_eq!(weight, 2);
        assert!(parse_weighted_key(&key).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
