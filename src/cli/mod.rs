use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{LedgerService, ServiceConfig};
use crate::contract::{LedgerConfig, NegativeIssuance, VoucherConfig};
use crate::domain::{parse_amount, Amount, TxRecord, VoucherSchedule};

/// Tessera - token ledger and voucher exchange
#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "A token balance ledger with a voucher exchange, run as transaction functions")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tessera.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What a negative issue amount does: allow (debit) or reject
    #[arg(long, global = true, default_value = "allow")]
    pub negative_issuance: String,

    /// Largest voucher a single exchange grants
    #[arg(long, global = true, default_value = "0.3")]
    pub max_voucher: String,

    /// Voucher value of one token
    #[arg(long, global = true, default_value = "0.2")]
    pub voucher_rate: String,

    /// Company identity stamped on vouchers
    #[arg(long, global = true, default_value = crate::contract::DEFAULT_COMPANY_ID)]
    pub company_id: String,

    /// Channel the contracts are deployed on
    #[arg(long, global = true, default_value = crate::contract::DEFAULT_CHANNEL)]
    pub channel: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Submit a raw transaction and commit it
    Invoke {
        /// Contract name (e.g., "balance_ledger", "voucher_exchange")
        contract: String,

        /// Function name (e.g., "issueToken")
        function: String,

        /// Positional string arguments
        args: Vec<String>,
    },

    /// Evaluate a raw transaction without committing it
    Query {
        /// Contract name
        contract: String,

        /// Function name (e.g., "queryToken")
        function: String,

        /// Positional string arguments
        args: Vec<String>,
    },

    /// Issue tokens to an account (creates the account if needed)
    Issue {
        /// Account identifier
        account: String,

        /// Amount to issue (e.g., "10", "2.500000" or "1e2")
        amount: String,
    },

    /// Spend tokens from an account
    Spend {
        /// Account identifier
        account: String,

        /// Amount to spend
        amount: String,
    },

    /// Show balance for an account or all accounts
    Balance {
        /// Account identifier (omit for all accounts)
        account: Option<String>,
    },

    /// Exchange tokens for a voucher
    Voucher {
        /// Account identifier
        account: String,

        /// Tokens offered for the exchange
        tokens: String,
    },

    /// List committed transactions, newest first
    History {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a committed transaction
    Show {
        /// Transaction ID
        id: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: balances, history, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv for balances and history, json for full)
        #[arg(short, long)]
        format: Option<String>,
    },
}

impl Cli {
    /// Build the contract configuration from the command-line flags.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let negative_issuance = NegativeIssuance::parse(&self.negative_issuance)?;
        let max_voucher = parse_amount(&self.max_voucher)
            .with_context(|| format!("Invalid --max-voucher '{}'", self.max_voucher))?;
        let token_to_voucher_rate = parse_amount(&self.voucher_rate)
            .with_context(|| format!("Invalid --voucher-rate '{}'", self.voucher_rate))?;

        let voucher = VoucherConfig {
            schedule: VoucherSchedule {
                max_voucher,
                token_to_voucher_rate,
            },
            company_id: self.company_id.clone(),
            channel: self.channel.clone(),
            ..VoucherConfig::default()
        };
        voucher.validate()?;

        Ok(ServiceConfig {
            ledger: LedgerConfig { negative_issuance },
            voucher,
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.service_config()?;
        let database = self.database;

        match self.command {
            Commands::Init => {
                LedgerService::init(&database, config).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Invoke {
                contract,
                function,
                args,
            } => {
                let service = LedgerService::connect(&database, config).await?;
                let record = service.submit(&contract, &function, args).await?;
                println!("{}", record.payload);
                eprintln!("Committed {} (sequence {})", record.tx_id, record.sequence);
            }

            Commands::Query {
                contract,
                function,
                args,
            } => {
                let service = LedgerService::connect(&database, config).await?;
                let payload = service.evaluate(&contract, &function, &args).await?;
                println!("{}", payload);
            }

            Commands::Issue { account, amount } => {
                let service = LedgerService::connect(&database, config).await?;
                let amount = parse_amount_arg(&amount)?;
                let committed = service.issue(&account, amount).await?;
                println!(
                    "Issued {} to {}: balance {} ({})",
                    amount, account, committed.result.balance, committed.record.tx_id
                );
            }

            Commands::Spend { account, amount } => {
                let service = LedgerService::connect(&database, config).await?;
                let amount = parse_amount_arg(&amount)?;
                let committed = service.spend(&account, amount).await?;
                println!(
                    "Spent {} from {}: balance {} ({})",
                    amount, account, committed.result.balance, committed.record.tx_id
                );
            }

            Commands::Balance { account } => {
                let service = LedgerService::connect(&database, config).await?;
                run_balance_command(&service, account).await?;
            }

            Commands::Voucher { account, tokens } => {
                let service = LedgerService::connect(&database, config).await?;
                let tokens = parse_amount_arg(&tokens)?;
                let committed = service.get_voucher(&account, tokens).await?;
                let grant = &committed.result;
                println!(
                    "Voucher {} from {} for {}: spent {} tokens ({})",
                    grant.voucher,
                    grant.company_id,
                    grant.account_id,
                    grant.spend_token,
                    committed.record.tx_id
                );
            }

            Commands::History { limit } => {
                let service = LedgerService::connect(&database, config).await?;
                let transactions = service.history(limit).await?;
                print_history(&transactions);
            }

            Commands::Show { id } => {
                let service = LedgerService::connect(&database, config).await?;
                let tx_id =
                    Uuid::parse_str(&id).context("Invalid transaction ID format (expected UUID)")?;
                let record = service.get_transaction(tx_id).await?;
                print_transaction(&record);
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                let service = LedgerService::connect(&database, config).await?;
                run_export_command(&service, &export_type, output.as_deref(), format.as_deref())
                    .await?;
            }
        }

        Ok(())
    }
}

fn parse_amount_arg(input: &str) -> Result<Amount> {
    parse_amount(input)
        .with_context(|| format!("Invalid amount '{}'. Use '10' or '2.500000'", input))
}

async fn run_balance_command(service: &LedgerService, account: Option<String>) -> Result<()> {
    match account {
        Some(account) => {
            let balance = service.query_balance(&account).await?;
            println!("{}: {}", balance.account_id, balance.balance);
        }
        None => {
            let balances = service.list_balances().await?;
            if balances.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }

            println!("{:<24} {:>20}", "ACCOUNT", "BALANCE");
            println!("{}", "-".repeat(45));
            for entry in balances {
                println!("{:<24} {:>20}", entry.account_id, entry.balance.to_string());
            }
        }
    }
    Ok(())
}

fn print_history(transactions: &[TxRecord]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<6} {:<20} {:<18} {:<12} {}",
        "SEQ", "COMMITTED", "CONTRACT", "FUNCTION", "ARGS"
    );
    println!("{}", "-".repeat(80));
    for tx in transactions {
        println!(
            "{:<6} {:<20} {:<18} {:<12} {}",
            tx.sequence,
            tx.committed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            tx.contract,
            tx.function,
            tx.args.join(" ")
        );
    }
}

fn print_transaction(tx: &TxRecord) {
    println!("Transaction: {}", tx.tx_id);
    println!("  Sequence:  {}", tx.sequence);
    println!("  Committed: {}", tx.committed_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Contract:  {}", tx.contract);
    println!("  Function:  {}", tx.function);
    println!("  Args:      {}", tx.args.join(" "));
    println!("  Payload:   {}", tx.payload);
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let default_format = if export_type == "full" { "json" } else { "csv" };
    let format = format.unwrap_or(default_format);

    match (export_type, format) {
        ("balances", "csv") => {
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        ("balances", "json") => {
            let count = exporter.export_balances_json(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        ("history", "csv") => {
            let count = exporter.export_history_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        ("history", "json") => {
            let count = exporter.export_history_json(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        ("full", "json") => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} accounts, {} transactions",
                    snapshot.balances.len(),
                    snapshot.transactions.len()
                );
            }
        }
        ("balances" | "history" | "full", _) => {
            anyhow::bail!(
                "Unsupported format '{}' for {}. Valid formats: csv, json (full is json only)",
                format,
                export_type
            );
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: balances, history, full",
                export_type
            );
        }
    }

    Ok(())
}
