//! Property tests for running balance replay.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use finlog_shared::types::{AccountId, Currency, TransactionId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{canonical_cmp, replay};
use super::types::{Transaction, TransactionStatus, TransactionType};

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn status_strategy() -> impl Strategy<Value = TransactionStatus> {
    prop_oneof![
        Just(TransactionStatus::Pending),
        Just(TransactionStatus::Completed),
        Just(TransactionStatus::Cancelled),
    ]
}

fn single_account_type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Income),
        Just(TransactionType::Expense),
    ]
}

/// A randomized single-account transaction log. Dates and creation times
/// are offsets from a fixed epoch so ties occur regularly.
fn log_strategy(account: AccountId) -> impl Strategy<Value = Vec<Transaction>> {
    let owner = UserId::new();
    prop::collection::vec(
        (
            single_account_type_strategy(),
            amount_strategy(),
            0i64..30,
            0i64..1_000,
            status_strategy(),
        ),
        0..40,
    )
    .prop_map(move |rows| {
        let epoch = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        rows.into_iter()
            .map(|(transaction_type, amount, day, seconds, status)| Transaction {
                id: TransactionId::new(),
                owner_id: owner,
                transaction_type,
                account_id: account,
                to_account_id: None,
                amount,
                signed_amount: None,
                currency: Currency::Usd,
                date: epoch + Duration::days(day),
                created_at: base + Duration::seconds(seconds),
                status,
                running_balance: None,
                description: None,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The final balance equals the sum of signed effects of the
    /// completed transactions, regardless of input order.
    #[test]
    fn prop_balance_is_sum_of_completed_effects(
        log in log_strategy(AccountId::from_uuid(uuid::Uuid::nil())),
    ) {
        let account = AccountId::from_uuid(uuid::Uuid::nil());
        let result = replay(account, &log).unwrap();

        let expected: Decimal = log
            .iter()
            .filter(|t| t.status.is_completed())
            .map(|t| match t.transaction_type {
                TransactionType::Income => t.amount,
                TransactionType::Expense => -t.amount,
                TransactionType::Transfer => unreachable!("single-account log"),
            })
            .sum();

        prop_assert_eq!(result.balance, expected);
    }

    /// Running balances are prefix-sum consistent: entry k equals entry
    /// k-1 plus the k-th signed effect, with the 0-th defined as zero.
    #[test]
    fn prop_running_balances_are_prefix_sums(
        log in log_strategy(AccountId::from_uuid(uuid::Uuid::nil())),
    ) {
        let account = AccountId::from_uuid(uuid::Uuid::nil());
        let result = replay(account, &log).unwrap();

        let mut previous = Decimal::ZERO;
        for entry in &result.entries {
            prop_assert_eq!(entry.running_balance, previous + entry.signed_effect);
            previous = entry.running_balance;
        }
        prop_assert_eq!(result.balance, previous);
    }

    /// Replay is invariant under permutation of the input slice: the
    /// canonical order, not arrival order, decides the trail.
    #[test]
    fn prop_replay_is_permutation_invariant(
        log in log_strategy(AccountId::from_uuid(uuid::Uuid::nil())),
        seed in any::<u64>(),
    ) {
        let account = AccountId::from_uuid(uuid::Uuid::nil());
        let baseline = replay(account, &log).unwrap();

        // Cheap deterministic shuffle.
        let mut shuffled = log;
        let len = shuffled.len();
        if len > 1 {
            for i in 0..len {
                #[allow(clippy::cast_possible_truncation)]
                let j = ((seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(i as u64))
                    % len as u64) as usize;
                shuffled.swap(i, j);
            }
        }
        let permuted = replay(account, &shuffled).unwrap();

        prop_assert_eq!(baseline.balance, permuted.balance);
        prop_assert_eq!(baseline.entries.len(), permuted.entries.len());
        for (a, b) in baseline.entries.iter().zip(permuted.entries.iter()) {
            prop_assert_eq!(a.transaction_id, b.transaction_id);
            prop_assert_eq!(a.running_balance, b.running_balance);
        }
    }

    /// Entries come out sorted by the canonical comparator.
    #[test]
    fn prop_entries_respect_canonical_order(
        log in log_strategy(AccountId::from_uuid(uuid::Uuid::nil())),
    ) {
        let account = AccountId::from_uuid(uuid::Uuid::nil());
        let result = replay(account, &log).unwrap();

        let by_id: std::collections::HashMap<_, _> =
            log.iter().map(|t| (t.id, t)).collect();
        for pair in result.entries.windows(2) {
            let a = by_id[&pair[0].transaction_id];
            let b = by_id[&pair[1].transaction_id];
            prop_assert_ne!(canonical_cmp(a, b), std::cmp::Ordering::Greater);
        }
    }
}
