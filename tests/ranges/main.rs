//! Property tests for score-range reads on sorted branches.

mod quotes;

use kv_branch::{BranchRange, InMemoryStore, Repository};
use proptest::prelude::*;
use quotes::{branches, Quote, BY_DESK_BY_PRICE};

fn arb_quotes() -> impl Strategy<Value = Vec<(u32, bool)>> {
    prop::collection::vec((0u32..10_000, any::<bool>()), 0..40)
}

fn arb_range() -> impl Strategy<Value = (u32, u32, u64, Option<u64>)> {
    (
        0u32..10_000,
        0u32..10_000,
        0u64..10,
        prop_oneof![Just(None), (0u64..10).prop_map(Some)],
    )
}

fn cents(n: u32) -> f64 {
    f64::from(n) / 100.0
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// `count_range` agrees with `get_range`, and both agree with a plain
    /// filter over the live quotes.
    #[test]
    fn range_reads_agree(quotes in arb_quotes(), (a, b, skip, take) in arb_range()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let repository: Repository<Quote, InMemoryStore> =
                Repository::new(InMemoryStore::new(), &branches).unwrap();
            for (i, (price, live)) in quotes.iter().enumerate() {
                let quote = Quote {
                    id: format!("Q{:03}", i),
                    desk: "fx".to_string(),
                    price: cents(*price),
                    live: *live,
                };
                repository.add(&quote).await.unwrap();
            }

            let (lo, hi) = (cents(a.min(b)), cents(a.max(b)));
            let mut range = BranchRange::between(lo, hi);
            if let Some(take) = take {
                range = range.page(skip, take);
            }

            let fetched = repository
                .get_range(BY_DESK_BY_PRICE, range, &["fx"])
                .await
                .unwrap();
            let counted = repository
                .count_range(BY_DESK_BY_PRICE, range, &["fx"])
                .await
                .unwrap();
            assert_eq!(fetched.len() as u64, counted);

            let expected = quotes
                .iter()
                .filter(|(price, live)| *live && cents(*price) >= lo && cents(*price) <= hi)
                .count() as u64;
            let expected = match take {
                Some(take) => expected.saturating_sub(skip).min(take),
                None => expected,
            };
            assert_eq!(counted, expected);

            for quote in &fetched {
                assert!(quote.live);
                assert!(quote.price >= lo && quote.price <= hi);
            }
            for pair in fetched.windows(2) {
                assert!(pair[0].price <= pair[1].price);
            }
        });
    }
}
