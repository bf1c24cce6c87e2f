use proptest::prelude::*;
use tally_calculator::{AllocationRequest, SplitKey, TallyError, allocate};

fn weights_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..=1_000, 1..40)
}

fn keyed(weights: &[i64]) -> Vec<(String, i64)> {
    weights.iter().enumerate().map(|(i, w)| (format!("k{i}"), *w)).collect()
}

fn floor_share(total: i64, weight: i64, sum: i64) -> i64 {
    let exact = i128::from(total) * i128::from(weight) / i128::from(sum);
    i64::try_from(exact).unwrap()
}

#[test]
fn three_way_even_split_gives_extra_cent_to_first_entry() {
    let result = allocate(100, &[("a", 1), ("b", 1), ("c", 1)]).unwrap();
    assert_eq!(result, vec![("a", 34), ("b", 33), ("c", 33)]);
}

#[test]
fn exact_ratio_leaves_no_remainder() {
    let result = allocate(1000, &[("a", 3), ("b", 7)]).unwrap();
    assert_eq!(result, vec![("a", 300), ("b", 700)]);
}

#[test]
fn single_remainder_cent_goes_to_first_tied_entry() {
    let result = allocate(10, &[("a", 1), ("b", 1), ("c", 1)]).unwrap();
    assert_eq!(result, vec![("a", 4), ("b", 3), ("c", 3)]);
}

#[test]
fn tie_break_follows_input_order_not_key_order() {
    let result = allocate(10, &[("c", 1), ("b", 1), ("a", 1)]).unwrap();
    assert_eq!(result, vec![("c", 4), ("b", 3), ("a", 3)]);
}

#[test]
fn invalid_inputs_are_rejected() {
    let cases: Vec<(i64, Vec<(&str, i64)>)> = vec![
        (0, vec![("a", 1)]),
        (-1, vec![("a", 1)]),
        (100, vec![]),
        (100, vec![("a", -1)]),
        (100, vec![("a", 2), ("b", 0)]),
    ];
    for (total, weights) in cases {
        match allocate(total, &weights) {
            Err(TallyError::InvalidInput { .. }) => {}
            other => panic!("expected invalid input for {total} / {weights:?}, got {other:?}"),
        }
    }
}

#[test]
fn typed_request_matches_free_function() {
    let entries = vec![
        (SplitKey::new("x").unwrap(), 5),
        (SplitKey::new("y").unwrap(), 3),
        (SplitKey::new("z").unwrap(), 1),
    ];
    let via_request = AllocationRequest::new(1001, entries.clone()).unwrap().allocate().into_pairs();
    let via_function = allocate(1001, &entries).unwrap();
    assert_eq!(via_request, via_function);
}

proptest! {
    #[test]
    fn allocation_sums_to_total(total in 1i64..10_000_000, weights in weights_strategy()) {
        let result = allocate(total, &keyed(&weights)).unwrap();
        prop_assert_eq!(result.iter().map(|(_, c)| *c).sum::<i64>(), total);
    }

    #[test]
    fn allocation_is_bounded_by_floor_share(total in 1i64..10_000_000, weights in weights_strategy()) {
        let sum: i64 = weights.iter().sum();
        let result = allocate(total, &keyed(&weights)).unwrap();
        let mut extra_cents = 0;
        for ((_, cents), weight) in result.iter().zip(&weights) {
            let floor = floor_share(total, *weight, sum);
            prop_assert!(*cents >= 0);
            prop_assert!(*cents >= floor);
            prop_assert!(*cents <= floor + 1);
            extra_cents += cents - floor;
        }
        prop_assert!(extra_cents < i64::try_from(weights.len()).unwrap());
    }

    #[test]
    fn allocation_is_deterministic(total in 1i64..10_000_000, weights in weights_strategy()) {
        let entries = keyed(&weights);
        prop_assert_eq!(allocate(total, &entries).unwrap(), allocate(total, &entries).unwrap());
    }

    #[test]
    fn heavier_weight_never_gets_less(total in 1i64..10_000_000, weights in weights_strategy()) {
        let result = allocate(total, &keyed(&weights)).unwrap();
        for (i, a) in weights.iter().enumerate() {
            for (j, b) in weights.iter().enumerate() {
                if a > b {
                    prop_assert!(result[i].1 >= result[j].1);
                }
            }
        }
    }

    #[test]
    fn large_totals_stay_exact(total in (i64::MAX / 2)..i64::MAX, weights in weights_strategy()) {
        let result = allocate(total, &keyed(&weights)).unwrap();
        let sum: i128 = result.iter().map(|(_, c)| i128::from(*c)).sum();
        prop_assert_eq!(sum, i128::from(total));
    }
}
