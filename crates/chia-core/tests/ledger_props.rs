use std::collections::BTreeSet;
use std::sync::Arc;

use chia_core::{Ledger, OperatorMetrics};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Track(u8),
    Untrack(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Track),
        (0u8..6).prop_map(Op::Untrack),
    ]
}

proptest! {
    #[test]
    fn gauge_always_equals_tracked_count(ops in proptest::collection::vec(op(), 0..64)) {
        let metrics = Arc::new(OperatorMetrics::new());
        let ledger = Ledger::new(metrics.clone());
        let mut model = BTreeSet::new();
        for op in ops {
            match op {
                Op::Track(id) => {
                    let identity = format!("chia/r{id}");
                    prop_assert_eq!(ledger.track("ChiaNode", &identity), model.insert(identity));
                }
                Op::Untrack(id) => {
                    let identity = format!("chia/r{id}");
                    prop_assert_eq!(ledger.untrack("ChiaNode", &identity), model.remove(&identity));
                }
            }
            prop_assert_eq!(ledger.count("ChiaNode"), model.len());
            prop_assert_eq!(metrics.tracked("ChiaNode"), model.len() as i64);
        }
    }
}

#[test]
fn concurrent_tracking_keeps_gauge_consistent() {
    let metrics = Arc::new(OperatorMetrics::new());
    let ledger = Arc::new(Ledger::new(metrics.clone()));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let identity = format!("chia/r{}", i % 10);
                    if (i + t) % 3 == 0 {
                        ledger.untrack("ChiaFarmer", &identity);
                    } else {
                        ledger.track("ChiaFarmer", &identity);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(metrics.tracked("ChiaFarmer"), ledger.count("ChiaFarmer") as i64);
}
