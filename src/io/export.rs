use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{TokenBalance, TxRecord};

/// Ledger snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub balances: Vec<TokenBalance>,
    pub transactions: Vec<TxRecord>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export account balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.service.list_balances().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account", "balance"])?;

        for entry in &balances {
            csv_writer.write_record([entry.account_id.as_str(), &entry.balance.to_string()])?;
        }

        csv_writer.flush()?;
        Ok(balances.len())
    }

    /// Export the transaction log to CSV format, oldest first
    pub async fn export_history_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut transactions = self.service.history(None).await?;
        transactions.reverse();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "tx_id",
            "sequence",
            "committed_at",
            "contract",
            "function",
            "args",
            "payload",
        ])?;

        for tx in &transactions {
            csv_writer.write_record([
                tx.tx_id.to_string(),
                tx.sequence.to_string(),
                tx.committed_at.to_rfc3339(),
                tx.contract.clone(),
                tx.function.clone(),
                tx.args.join(";"),
                tx.payload.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export account balances as a JSON array
    pub async fn export_balances_json<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.service.list_balances().await?;
        write_json(writer, &balances)?;
        Ok(balances.len())
    }

    /// Export the transaction log as a JSON array, oldest first
    pub async fn export_history_json<W: Write>(&self, writer: W) -> Result<usize> {
        let mut transactions = self.service.history(None).await?;
        transactions.reverse();
        write_json(writer, &transactions)?;
        Ok(transactions.len())
    }

    /// Export balances and history as one JSON snapshot
    pub async fn export_full_json<W: Write>(&self, writer: W) -> Result<LedgerSnapshot> {
        let balances = self.service.list_balances().await?;
        let mut transactions = self.service.history(None).await?;
        transactions.reverse();

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balances,
            transactions,
        };

        write_json(writer, &snapshot)?;
        Ok(snapshot)
    }
}

fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    Ok(())
}
