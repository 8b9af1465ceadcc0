use proptest::prelude::*;

use night_indexer::{CreatedUtxo, FeedFrame, TransactionFrame, UtxoLedger};
use night_types::{IntentHash, TokenType, UtxoId};

fn id(n: u16) -> UtxoId {
    let mut bytes = [0u8; 32];
    bytes[..2].copy_from_slice(&n.to_be_bytes());
    UtxoId::new(IntentHash::new(bytes), u32::from(n % 3))
}

/// One transaction per UTXO: created in its own frame, optionally spent in a
/// later frame. Every frame touches a single identity, so frames for
/// different UTXOs are disjoint.
fn frames_for(values: &[(u64, bool, bool)]) -> Vec<FeedFrame> {
    let mut frames = Vec::new();
    for (i, &(value, native, spend)) in values.iter().enumerate() {
        let utxo = id(i as u16);
        let token_type = if native {
            TokenType::NATIVE
        } else {
            TokenType::new([1; 32])
        };
        frames.push(FeedFrame::Transaction(TransactionFrame {
            sequence: frames.len() as u64 + 1,
            created: vec![CreatedUtxo {
                id: utxo,
                value: u128::from(value),
                token_type,
            }],
            spent: vec![],
        }));
        if spend {
            frames.push(FeedFrame::Transaction(TransactionFrame {
                sequence: frames.len() as u64 + 1,
                created: vec![],
                spent: vec![utxo],
            }));
        }
    }
    frames
}

fn fold(frames: &[FeedFrame]) -> UtxoLedger {
    let mut ledger = UtxoLedger::new();
    for frame in frames {
        ledger.apply(frame);
    }
    ledger
}

proptest! {
    /// Replaying the same ordered frames on fresh state yields the same snapshot.
    #[test]
    fn replay_is_deterministic(values in prop::collection::vec((0u64..1_000_000, any::<bool>(), any::<bool>()), 0..30)) {
        let frames = frames_for(&values);
        prop_assert_eq!(fold(&frames).snapshot(), fold(&frames).snapshot());
    }

    /// Reordering whole per-UTXO histories does not change the snapshot.
    #[test]
    fn disjoint_histories_commute(
        values in prop::collection::vec((0u64..1_000_000, any::<bool>(), any::<bool>()), 1..20),
        seed in any::<u64>(),
    ) {
        let forward = frames_for(&values);

        // Group frames by UTXO, rotate the groups, keep each group's inner order.
        let mut groups: Vec<Vec<FeedFrame>> = Vec::new();
        let mut rest = forward.iter();
        for &(_, _, spend) in &values {
            let mut group = vec![rest.next().cloned().unwrap()];
            if spend {
                group.push(rest.next().cloned().unwrap());
            }
            groups.push(group);
        }
        let shift = (seed as usize) % groups.len();
        groups.rotate_left(shift);
        let reordered: Vec<FeedFrame> = groups.into_iter().flatten().collect();

        let a = fold(&forward).snapshot();
        let b = fold(&reordered).snapshot();
        prop_assert_eq!(a.balances, b.balances);
        prop_assert_eq!(a.utxo_count, b.utxo_count);
        prop_assert_eq!(a.tx_count, b.tx_count);
    }

    /// The native balance is the sum of unspent native outputs.
    #[test]
    fn native_balance_sums_unspent(values in prop::collection::vec((0u64..1_000_000, any::<bool>(), any::<bool>()), 0..30)) {
        let expected: u128 = values
            .iter()
            .filter(|(_, native, spend)| *native && !*spend)
            .map(|(v, _, _)| u128::from(*v))
            .sum();
        prop_assert_eq!(fold(&frames_for(&values)).snapshot().native(), expected);
    }

    /// Spending before creating never panics; the early spend is ignored and
    /// the later creation stands.
    #[test]
    fn spend_before_create_is_ignored(value in 1u64..1_000_000) {
        let utxo = id(7);
        let frames = vec![
            FeedFrame::Transaction(TransactionFrame { sequence: 1, created: vec![], spent: vec![utxo] }),
            FeedFrame::Transaction(TransactionFrame {
                sequence: 2,
                created: vec![CreatedUtxo { id: utxo, value: u128::from(value), token_type: TokenType::NATIVE }],
                spent: vec![],
            }),
        ];
        let snapshot = fold(&frames).snapshot();
        prop_assert_eq!(snapshot.native(), u128::from(value));
        prop_assert_eq!(snapshot.utxo_count, 1);
    }

    /// The announced highest never decreases.
    #[test]
    fn highest_known_is_monotonic(announced in prop::collection::vec(0u64..1_000, 1..20)) {
        let mut ledger = UtxoLedger::new();
        let mut max = 0;
        for highest in announced {
            ledger.apply(&FeedFrame::Progress { highest });
            max = max.max(highest);
            prop_assert_eq!(ledger.progress().highest_known, Some(max));
        }
    }
}
