//! Proportional Allocator
//!
//! Splits a positive `total` of cents across weighted entries so that the
//! parts sum to the total exactly.
//!
//! share_i = floor(total * weight_i / sum(weights))
//!
//! The `total - sum(share_i)` cents left over (always fewer than the number of
//! entries) are handed out one each to the entries with the largest fractional
//! remainder `total * weight_i mod sum(weights)`. Equal remainders are served
//! in input order, so identical inputs always produce identical output.

use serde::Serialize;
use std::collections::HashSet;
use tally_types::{Cents, SplitKey, TallyError, TallyResult, Weight};
use tracing::debug;

/// Floor share plus whether the entry won a remainder cent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Share {
    floor: i64,
    remainder_cent: bool,
}

impl Share {
    fn cents(self) -> Cents {
        Cents::from(if self.remainder_cent { self.floor + 1 } else { self.floor })
    }
}

/// Allocates `total` cents across `weights`, preserving input order.
///
/// Keys are carried through untouched; callers that need unique keys should
/// go through [`AllocationRequest`], which rejects duplicates.
///
/// # Errors
/// Returns [`TallyError::InvalidInput`] when `total` is not positive, when
/// `weights` is empty, or when any weight is not a positive integer.
pub fn allocate<K: Clone>(total: i64, weights: &[(K, i64)]) -> TallyResult<Vec<(K, i64)>> {
    let total = validate_total(total)?;
    if weights.is_empty() {
        return Err(TallyError::invalid_field("weights", "at least one weight is required"));
    }

    let validated =
        weights.iter().map(|(_, weight)| Weight::try_from(*weight)).collect::<TallyResult<Vec<_>>>()?;

    let shares = apportion(total, &validated);
    Ok(weights.iter().zip(shares).map(|((key, _), share)| (key.clone(), i64::from(share.cents()))).collect())
}

fn validate_total(total: i64) -> TallyResult<Cents> {
    let cents = Cents::from(total);
    if !cents.is_positive() {
        return Err(TallyError::invalid_field(
            "total",
            format!("total must be a positive number of cents, got {total}"),
        ));
    }
    Ok(cents)
}

/// Largest-remainder apportionment. `total` must be positive and `weights`
/// non-empty.
fn apportion(total: Cents, weights: &[Weight]) -> Vec<Share> {
    let total_wide = u128::from(total.get().unsigned_abs());
    let sum_weights: u128 = weights.iter().map(|w| u128::from(w.get())).sum();

    let mut shares = Vec::with_capacity(weights.len());
    let mut fractions = Vec::with_capacity(weights.len());
    let mut distributed: u128 = 0;

    for (index, weight) in weights.iter().enumerate() {
        // i64::MAX * u64::MAX < 2^127
        let scaled = total_wide * u128::from(weight.get());
        let floor = scaled / sum_weights;
        distributed += floor;
        // floor <= total <= i64::MAX
        #[allow(clippy::cast_possible_truncation)]
        let floor = floor as i64;
        shares.push(Share { floor, remainder_cent: false });
        fractions.push((index, scaled % sum_weights));
    }

    let remainder = total_wide - distributed;
    debug_assert!(remainder < weights.len() as u128);

    // sort_by is stable: equal fractions keep input order
    fractions.sort_by(|a, b| b.1.cmp(&a.1));
    let winners = usize::try_from(remainder).unwrap_or(weights.len());
    for &(index, _) in fractions.iter().take(winners) {
        shares[index].remainder_cent = true;
    }

    debug!(
        total = total.get(),
        entries = weights.len(),
        remainder = winners,
        "Apportioned cents by largest remainder"
    );

    shares
}

fn reject_duplicate_keys(entries: &[(SplitKey, Weight)]) -> TallyResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (key, _) in entries {
        if !seen.insert(key) {
            return Err(TallyError::invalid_key(key.as_str(), format!("duplicate key '{key}'")));
        }
    }
    Ok(())
}

/// A validated allocation request
///
/// Construction checks every precondition once; [`AllocationRequest::allocate`]
/// cannot fail afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    total: Cents,
    entries: Vec<(SplitKey, Weight)>,
}

impl AllocationRequest {
    /// Validate a raw request.
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] for a non-positive total, an empty
    /// entry list, a non-positive weight or a duplicate key.
    pub fn new(total: i64, entries: Vec<(SplitKey, i64)>) -> TallyResult<Self> {
        let entries = entries
            .into_iter()
            .map(|(key, weight)| {
                Weight::new(weight)
                    .map(|weight| (key.clone(), weight))
                    .map_err(|_| {
                        TallyError::invalid_key(
                            key.as_str(),
                            format!("weight for '{key}' must be a positive integer, got {weight}"),
                        )
                    })
            })
            .collect::<TallyResult<Vec<_>>>()?;
        Self::from_weights(total, entries)
    }

    /// Validate a request whose weights are already typed.
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] for a non-positive total, an empty
    /// entry list or a duplicate key.
    pub fn from_weights(total: i64, entries: Vec<(SplitKey, Weight)>) -> TallyResult<Self> {
        let total = validate_total(total)?;
        if entries.is_empty() {
            return Err(TallyError::invalid_field("weights", "at least one weight is required"));
        }

        reject_duplicate_keys(&entries)?;

        Ok(Self { total, entries })
    }

    /// Total to distribute
    #[must_use]
    pub const fn total(&self) -> Cents {
        self.total
    }

    /// Entries in input order
    #[must_use]
    pub fn entries(&self) -> &[(SplitKey, Weight)] {
        &self.entries
    }

    /// Runs the allocator
    #[must_use]
    pub fn allocate(&self) -> Allocation {
        let weights: Vec<Weight> = self.entries.iter().map(|(_, weight)| *weight).collect();
        let shares = apportion(self.total, &weights);

        let lines = self
            .entries
            .iter()
            .zip(shares)
            .map(|((key, weight), share)| AllocationLine {
                key: key.clone(),
                weight: *weight,
                cents: share.cents(),
                floor_cents: Cents::new(share.floor),
                remainder_cent: share.remainder_cent,
            })
            .collect();

        Allocation { total: self.total, lines }
    }
}

/// One entry of an [`Allocation`], with enough detail to audit the rounding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationLine {
    /// Entry key
    pub key: SplitKey,
    /// Entry weight
    pub weight: Weight,
    /// Allocated amount, `floor_cents` plus any remainder cent
    pub cents: Cents,
    /// Exact share rounded down
    pub floor_cents: Cents,
    /// Whether this entry absorbed one cent of the rounding remainder
    pub remainder_cent: bool,
}

/// Result of an allocation, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    total: Cents,
    lines: Vec<AllocationLine>,
}

impl Allocation {
    /// Total that was distributed
    #[must_use]
    pub const fn total(&self) -> Cents {
        self.total
    }

    /// Lines in input order
    #[must_use]
    pub fn lines(&self) -> &[AllocationLine] {
        &self.lines
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for an allocation built from a valid request
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cents allocated to `key`, if present
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Cents> {
        self.lines.iter().find(|line| line.key.as_str() == key).map(|line| line.cents)
    }

    /// `(key, cents)` pairs in input order
    pub fn iter(&self) -> impl Iterator<Item = (&SplitKey, Cents)> {
        self.lines.iter().map(|line| (&line.key, line.cents))
    }

    /// Consumes the allocation into `(key, cents)` pairs
    #[must_use]
    pub fn into_pairs(self) -> Vec<(SplitKey, i64)> {
        self.lines.into_iter().map(|line| (line.key, line.cents.get())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(weights: &[(&str, i64)]) -> Vec<(SplitKey, i64)> {
        weights.iter().map(|(k, w)| (SplitKey::new(k).unwrap(), *w)).collect()
    }

    #[test]
    fn test_even_split_with_remainder_goes_to_first() {
        let result = allocate(100, &[("a", 1), ("b", 1), ("c", 1)]).unwrap();
        assert_eq!(result, vec![("a", 34), ("b", 33), ("c", 33)]);
    }

    #[test]
    fn test_exact_split_has_no_remainder() {
        let result = allocate(1000, &[("a", 3), ("b", 7)]).unwrap();
        assert_eq!(result, vec![("a", 300), ("b", 700)]);
    }

    #[test]
    fn test_largest_fraction_wins_before_input_order() {
        // 10 * 1/6 = 1.67, 10 * 2/6 = 3.33, 10 * 3/6 = 5
        let result = allocate(10, &[("a", 1), ("b", 2), ("c", 3)]).unwrap();
        assert_eq!(result, vec![("a", 2), ("b", 3), ("c", 5)]);
    }

    #[test]
    fn test_single_entry_takes_everything() {
        assert_eq!(allocate(7, &[("only", 42)]).unwrap(), vec![("only", 7)]);
    }

    #[test]
    fn test_tiny_total_over_many_entries() {
        let weights: Vec<(usize, i64)> = (0..5).map(|i| (i, 1)).collect();
        let result = allocate(2, &weights).unwrap();
        let cents: Vec<i64> = result.iter().map(|(_, c)| *c).collect();
        assert_eq!(cents, vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_extreme_magnitudes_do_not_overflow() {
        let result = allocate(i64::MAX, &[("a", i64::MAX), ("b", 1)]).unwrap();
        let sum: i128 = result.iter().map(|(_, c)| i128::from(*c)).sum();
        assert_eq!(sum, i128::from(i64::MAX));
        assert_eq!(result[1].1, 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(allocate(0, &[("a", 1)]).is_err());
        assert!(allocate(-5, &[("a", 1)]).is_err());
        assert!(allocate::<&str>(10, &[]).is_err());
        assert!(allocate(10, &[("a", 1), ("b", -1)]).is_err());
        assert!(allocate(10, &[("a", 0)]).is_err());
    }

    #[test]
    fn test_request_rejects_duplicate_keys() {
        let err = AllocationRequest::new(10, keyed(&[("a", 1), ("a", 2)])).unwrap_err();
        match err {
            TallyError::InvalidInput { key, .. } => assert_eq!(key.as_deref(), Some("a")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_request_names_key_with_bad_weight() {
        let err = AllocationRequest::new(10, keyed(&[("a", 1), ("b", 0)])).unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_allocation_records_audit_detail() {
        let request = AllocationRequest::new(10, keyed(&[("a", 1), ("b", 1), ("c", 1)])).unwrap();
        let allocation = request.allocate();

        assert_eq!(allocation.total(), Cents::new(10));
        assert_eq!(allocation.len(), 3);
        let first = &allocation.lines()[0];
        assert_eq!(first.floor_cents, Cents::new(3));
        assert!(first.remainder_cent);
        assert!(!allocation.lines()[1].remainder_cent);
        assert_eq!(allocation.get("a"), Some(Cents::new(4)));
        assert_eq!(allocation.get("missing"), None);
    }

    #[test]
    fn test_allocation_serializes_in_input_order() {
        let request = AllocationRequest::new(1000, keyed(&[("z", 3), ("a", 7)])).unwrap();
        let json = serde_json::to_value(request.allocate()).unwrap();
        assert_eq!(json["total"], 1000);
        assert_eq!(json["lines"][0]["key"], "z");
        assert_eq!(json["lines"][0]["cents"], 300);
        assert_eq!(json["lines"][1]["remainder_cent"], false);
    }
}
