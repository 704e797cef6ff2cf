//! End-to-end tests of the mutation service against the in-memory store.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use finlog_core::ledger::{
    Account, AccountType, CreateTransactionInput, LedgerError, TransactionStatus, TransactionType,
    UpdateTransactionInput,
};
use finlog_shared::types::{Currency, UserId};

use crate::service::{LedgerService, ServiceConfig};
use crate::store::MemoryLedgerStore;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn income(account: &Account, amount: rust_decimal::Decimal, day: u32) -> CreateTransactionInput {
    CreateTransactionInput {
        transaction_type: TransactionType::Income,
        account_id: account.id,
        to_account_id: None,
        amount,
        currency: account.currency,
        date: date(2026, 3, day),
        status: TransactionStatus::Completed,
        description: None,
    }
}

fn expense(account: &Account, amount: rust_decimal::Decimal, day: u32) -> CreateTransactionInput {
    CreateTransactionInput {
        transaction_type: TransactionType::Expense,
        ..income(account, amount, day)
    }
}

async fn setup() -> (Arc<MemoryLedgerStore>, LedgerService, UserId, Account) {
    let store = Arc::new(MemoryLedgerStore::new());
    let service = LedgerService::new(Arc::clone(&store), ServiceConfig::default());
    let owner = UserId::new();
    let account = Account::new(owner, AccountType::Checking, Currency::Usd);
    store.insert_account(account.clone()).await;
    (store, service, owner, account)
}

async fn balance_of(store: &MemoryLedgerStore, account: &Account) -> rust_decimal::Decimal {
    store.account(account.id).await.unwrap().balance
}

#[tokio::test]
async fn test_expense_decreases_balance() {
    let (store, service, owner, account) = setup().await;

    service
        .create(owner, income(&account, dec!(100.00), 1))
        .await
        .unwrap();
    let tx = service
        .create(owner, expense(&account, dec!(75.25), 2))
        .await
        .unwrap();

    assert_eq!(tx.signed_amount, Some(dec!(-75.25)));
    assert_eq!(tx.running_balance, Some(dec!(24.75)));
    assert_eq!(balance_of(&store, &account).await, dec!(24.75));
}

#[tokio::test]
async fn test_transfer_moves_both_balances_atomically() {
    let (store, service, owner, checking) = setup().await;
    let savings = Account::new(owner, AccountType::Savings, Currency::Usd);
    store.insert_account(savings.clone()).await;

    service
        .create(owner, income(&checking, dec!(500.00), 1))
        .await
        .unwrap();
    let transfer = service
        .create(
            owner,
            CreateTransactionInput {
                transaction_type: TransactionType::Transfer,
                to_account_id: Some(savings.id),
                ..income(&checking, dec!(200.00), 2)
            },
        )
        .await
        .unwrap();

    assert_eq!(transfer.signed_amount, Some(dec!(-200.00)));
    assert_eq!(balance_of(&store, &checking).await, dec!(300.00));
    assert_eq!(balance_of(&store, &savings).await, dec!(200.00));
}

#[tokio::test]
async fn test_backdated_insert_rebuilds_running_balances() {
    let (store, service, owner, account) = setup().await;

    let later = service
        .create(owner, income(&account, dec!(50.00), 10))
        .await
        .unwrap();
    // Inserted afterwards but dated earlier, so it sorts first.
    let earlier = service
        .create(owner, income(&account, dec!(20.00), 5))
        .await
        .unwrap();

    assert_eq!(earlier.running_balance, Some(dec!(20.00)));
    let later = store.transaction(later.id).await.unwrap();
    assert_eq!(later.running_balance, Some(dec!(70.00)));
    assert_eq!(balance_of(&store, &account).await, dec!(70.00));
}

#[tokio::test]
async fn test_pending_transaction_is_inert_until_completed() {
    let (store, service, owner, account) = setup().await;

    let pending = service
        .create(
            owner,
            CreateTransactionInput {
                status: TransactionStatus::Pending,
                ..income(&account, dec!(40.00), 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(pending.running_balance, None);
    assert_eq!(balance_of(&store, &account).await, dec!(0));

    let completed = service
        .update(
            owner,
            pending.id,
            UpdateTransactionInput {
                status: Some(TransactionStatus::Completed),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(completed.running_balance, Some(dec!(40.00)));
    assert_eq!(balance_of(&store, &account).await, dec!(40.00));
}

#[tokio::test]
async fn test_cancelling_removes_effect_and_running_balance() {
    let (store, service, owner, account) = setup().await;

    let tx = service
        .create(owner, income(&account, dec!(40.00), 1))
        .await
        .unwrap();
    let cancelled = service
        .update(
            owner,
            tx.id,
            UpdateTransactionInput {
                status: Some(TransactionStatus::Cancelled),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(cancelled.running_balance, None);
    assert_eq!(balance_of(&store, &account).await, dec!(0));
}

#[tokio::test]
async fn test_update_amount_recomputes_downstream() {
    let (store, service, owner, account) = setup().await;

    let first = service
        .create(owner, income(&account, dec!(100.00), 1))
        .await
        .unwrap();
    service
        .create(owner, expense(&account, dec!(30.00), 2))
        .await
        .unwrap();

    let updated = service
        .update(
            owner,
            first.id,
            UpdateTransactionInput {
                amount: Some(dec!(80.00)),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.signed_amount, Some(dec!(80.00)));
    assert_eq!(updated.running_balance, Some(dec!(80.00)));
    assert_eq!(balance_of(&store, &account).await, dec!(50.00));
}

#[tokio::test]
async fn test_metadata_only_update_keeps_trail() {
    let (store, service, owner, account) = setup().await;

    let tx = service
        .create(owner, income(&account, dec!(10.00), 1))
        .await
        .unwrap();
    let version_before = store.account(account.id).await.unwrap().version;

    let updated = service
        .update(
            owner,
            tx.id,
            UpdateTransactionInput {
                description: Some(Some("groceries".into())),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.description.as_deref(), Some("groceries"));
    assert_eq!(updated.running_balance, Some(dec!(10.00)));
    assert_eq!(
        store.account(account.id).await.unwrap().version,
        version_before
    );
}

#[tokio::test]
async fn test_update_moves_transaction_between_accounts() {
    let (store, service, owner, first) = setup().await;
    let second = Account::new(owner, AccountType::Savings, Currency::Usd);
    store.insert_account(second.clone()).await;

    let tx = service
        .create(owner, income(&first, dec!(60.00), 1))
        .await
        .unwrap();
    service
        .update(
            owner,
            tx.id,
            UpdateTransactionInput {
                account_id: Some(second.id),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(balance_of(&store, &first).await, dec!(0));
    assert_eq!(balance_of(&store, &second).await, dec!(60.00));
}

#[tokio::test]
async fn test_delete_replays_both_transfer_accounts() {
    let (store, service, owner, checking) = setup().await;
    let savings = Account::new(owner, AccountType::Savings, Currency::Usd);
    store.insert_account(savings.clone()).await;

    service
        .create(owner, income(&checking, dec!(500.00), 1))
        .await
        .unwrap();
    let transfer = service
        .create(
            owner,
            CreateTransactionInput {
                transaction_type: TransactionType::Transfer,
                to_account_id: Some(savings.id),
                ..income(&checking, dec!(200.00), 2)
            },
        )
        .await
        .unwrap();

    service.delete(owner, transfer.id).await.unwrap();

    assert_eq!(balance_of(&store, &checking).await, dec!(500.00));
    assert_eq!(balance_of(&store, &savings).await, dec!(0));
    assert!(store.transaction(transfer.id).await.is_none());
}

#[tokio::test]
async fn test_rejects_non_positive_amount() {
    let (_store, service, owner, account) = setup().await;

    let err = service
        .create(owner, income(&account, dec!(0), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_rejects_transfer_without_destination() {
    let (_store, service, owner, account) = setup().await;

    let err = service
        .create(
            owner,
            CreateTransactionInput {
                transaction_type: TransactionType::Transfer,
                to_account_id: None,
                ..income(&account, dec!(10.00), 1)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::MissingDestination));
}

#[tokio::test]
async fn test_rejects_self_transfer() {
    let (_store, service, owner, account) = setup().await;

    let err = service
        .create(
            owner,
            CreateTransactionInput {
                transaction_type: TransactionType::Transfer,
                to_account_id: Some(account.id),
                ..income(&account, dec!(10.00), 1)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::MissingDestination));
}

#[tokio::test]
async fn test_rejects_currency_mismatch() {
    let (_store, service, owner, account) = setup().await;

    let err = service
        .create(
            owner,
            CreateTransactionInput {
                currency: Currency::Eur,
                ..income(&account, dec!(10.00), 1)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
}

#[tokio::test]
async fn test_cross_owner_access_is_rejected() {
    let (store, service, owner, account) = setup().await;
    let intruder = UserId::new();

    let tx = service
        .create(owner, income(&account, dec!(10.00), 1))
        .await
        .unwrap();

    let err = service.get_by_id(intruder, tx.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized));

    let err = service.delete(intruder, tx.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized));

    // The intruder cannot post into someone else's account either.
    let err = service
        .create(intruder, income(&account, dec!(10.00), 2))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized));

    assert_eq!(balance_of(&store, &account).await, dec!(10.00));
}

#[tokio::test]
async fn test_get_by_id_unknown_is_not_found() {
    let (_store, service, owner, _account) = setup().await;

    let err = service
        .get_by_id(owner, finlog_shared::types::TransactionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_creates_both_land() {
    let (store, service, owner, account) = setup().await;

    let a = service.create(owner, income(&account, dec!(10.00), 1));
    let b = service.create(owner, income(&account, dec!(25.00), 1));
    let (a, b) = tokio::join!(a, b);

    // Version conflicts are absorbed by the internal retry loop.
    a.unwrap();
    b.unwrap();
    assert_eq!(balance_of(&store, &account).await, dec!(35.00));
}

#[tokio::test]
async fn test_recalculate_restores_corrupted_balance() {
    let (store, service, owner, account) = setup().await;

    service
        .create(owner, income(&account, dec!(100.00), 1))
        .await
        .unwrap();

    // Corrupt the cached balance through a raw commit.
    let current = store.account(account.id).await.unwrap();
    store
        .commit(crate::store::MutationBatch {
            expected_versions: vec![(account.id, current.version)],
            account_balances: vec![(account.id, dec!(999.00))],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(balance_of(&store, &account).await, dec!(999.00));

    let healed = service.recalculate(account.id).await.unwrap();
    assert_eq!(healed, dec!(100.00));
    assert_eq!(balance_of(&store, &account).await, dec!(100.00));
}
