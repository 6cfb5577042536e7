mod common;

use anyhow::Result;
use common::{amount, args, test_service, test_service_with};
use tessera::application::{AppError, ServiceConfig};
use tessera::contract::{
    LedgerConfig, NegativeIssuance, DEFAULT_LEDGER_CONTRACT, ISSUE_TOKEN, QUERY_TOKEN,
};

#[tokio::test]
async fn test_issue_creates_account_and_query_reads_it() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let committed = service.issue("alice", amount("10")).await?;
    assert_eq!(committed.result.account_id, "alice");
    assert_eq!(committed.result.balance, amount("10"));
    assert_eq!(committed.record.sequence, 1);

    let balance = service.query_balance("alice").await?;
    assert_eq!(balance.balance, amount("10"));

    Ok(())
}

#[tokio::test]
async fn test_issue_accumulates() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.issue("alice", amount("2.5")).await?;
    let committed = service.issue("alice", amount("0.25")).await?;
    assert_eq!(committed.result.balance, amount("2.75"));

    Ok(())
}

#[tokio::test]
async fn test_query_unknown_account_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.query_balance("ghost").await;
    match result {
        Err(AppError::Rejected { status, message, .. }) => {
            assert_eq!(status, 500);
            assert!(message.contains("Asset not found: ghost"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_spend_debits_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.issue("alice", amount("10")).await?;

    let committed = service.spend("alice", amount("4")).await?;
    assert_eq!(committed.result.balance, amount("6"));
    assert_eq!(service.query_balance("alice").await?.balance, amount("6"));

    Ok(())
}

#[tokio::test]
async fn test_spend_whole_balance_leaves_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.issue("alice", amount("3")).await?;

    service.spend("alice", amount("3")).await?;
    assert_eq!(service.query_balance("alice").await?.balance, amount("0"));

    Ok(())
}

#[tokio::test]
async fn test_overspend_is_rejected_and_nothing_commits() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.issue("alice", amount("1")).await?;

    let result = service.spend("alice", amount("2")).await;
    match result {
        Err(AppError::Rejected { message, .. }) => {
            assert!(message.contains("Insufficient funds"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    assert_eq!(service.query_balance("alice").await?.balance, amount("1"));
    assert_eq!(service.history(None).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_spend_from_unknown_account_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.spend("ghost", amount("1")).await;
    assert!(matches!(result, Err(AppError::Rejected { .. })));
    assert!(service.history(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_negative_issue_debits_by_default() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.issue("alice", amount("5")).await?;

    let committed = service.issue("alice", amount("-2")).await?;
    assert_eq!(committed.result.balance, amount("3"));

    // Never below zero
    let result = service.issue("alice", amount("-4")).await;
    assert!(matches!(result, Err(AppError::Rejected { .. })));
    assert_eq!(service.query_balance("alice").await?.balance, amount("3"));

    Ok(())
}

#[tokio::test]
async fn test_negative_issue_rejected_by_policy() -> Result<()> {
    let config = ServiceConfig {
        ledger: LedgerConfig {
            negative_issuance: NegativeIssuance::Reject,
        },
        ..ServiceConfig::default()
    };
    let (service, _temp) = test_service_with(config).await?;
    service.issue("alice", amount("5")).await?;

    let result = service.issue("alice", amount("-1")).await;
    match result {
        Err(AppError::Rejected { message, .. }) => {
            assert!(message.contains("Incorrect arguments"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(service.query_balance("alice").await?.balance, amount("5"));

    Ok(())
}

#[tokio::test]
async fn test_raw_invocation_and_evaluation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let record = service
        .submit(DEFAULT_LEDGER_CONTRACT, ISSUE_TOKEN, args(&["bob", "1.5"]))
        .await?;
    assert_eq!(record.payload, r#"{"AccountID":"bob","AccountBalance":1.5}"#);

    let payload = service
        .evaluate(DEFAULT_LEDGER_CONTRACT, QUERY_TOKEN, &args(&["bob"]))
        .await?;
    assert_eq!(payload, r#"{"AccountID":"bob","AccountBalance":1.5}"#);

    // Evaluation never lands in the log
    assert_eq!(service.history(None).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_raw_invocation_argument_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let wrong_count = service
        .submit(DEFAULT_LEDGER_CONTRACT, ISSUE_TOKEN, args(&["bob"]))
        .await;
    assert!(matches!(wrong_count, Err(AppError::Rejected { .. })));

    let bad_amount = service
        .submit(DEFAULT_LEDGER_CONTRACT, ISSUE_TOKEN, args(&["bob", "ten"]))
        .await;
    assert!(matches!(bad_amount, Err(AppError::Rejected { .. })));

    let unknown = service
        .submit(DEFAULT_LEDGER_CONTRACT, "burnToken", args(&["bob", "1"]))
        .await;
    match unknown {
        Err(AppError::Rejected { message, .. }) => {
            assert!(message.contains("Invalid Smart Contract function name"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_list_balances_ordered_by_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.issue("carol", amount("3")).await?;
    service.issue("alice", amount("1")).await?;
    service.issue("bob", amount("2")).await?;

    let balances = service.list_balances().await?;
    let accounts: Vec<&str> = balances.iter().map(|b| b.account_id.as_str()).collect();
    assert_eq!(accounts, vec!["alice", "bob", "carol"]);
    assert_eq!(balances[2].balance, amount("3"));

    Ok(())
}

#[tokio::test]
async fn test_history_is_newest_first_and_retrievable() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.issue("alice", amount("10")).await?;
    let spent = service.spend("alice", amount("1")).await?;

    let history = service.history(None).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].function, "spendToken");
    assert_eq!(history[0].args, args(&["alice", "1.000000"]));
    assert_eq!(history[1].function, ISSUE_TOKEN);
    assert!(history[0].sequence > history[1].sequence);

    let limited = service.history(Some(1)).await?;
    assert_eq!(limited.len(), 1);

    let fetched = service.get_transaction(spent.record.tx_id).await?;
    assert_eq!(fetched.tx_id, spent.record.tx_id);
    assert_eq!(fetched.sequence, spent.record.sequence);
    assert_eq!(fetched.payload, spent.record.payload);

    Ok(())
}

#[tokio::test]
async fn test_get_missing_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.get_transaction(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    Ok(())
}
