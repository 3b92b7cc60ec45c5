//! Order-index allocation for cards.
//!
//! Given a column's current card ranks and a destination position, this
//! module computes the rank a moved or created card should carry. The common
//! path allocates a midpoint (or an end rank) and touches no other card; when
//! f64 precision between two neighbors is exhausted, or the neighbor ranks
//! are inconsistent, it falls back to a dense re-rank of the whole column.
//!
//! Everything here is pure and deterministic for identical inputs.

/// The outcome of planning a rank for one inserted card.
#[derive(Debug, Clone, PartialEq)]
pub enum RankPlan {
    /// Place the card at this rank; every other card keeps its rank.
    /// The rank is strictly between its neighbors' ranks.
    Rank(f64),
    /// Precision between the destination neighbors is exhausted (or their
    /// ranks are inconsistent): re-rank the entire resulting sequence with
    /// dense integer ranks `0..n`, relative order preserved. The vector has
    /// one entry per card in the destination sequence, the inserted card
    /// included.
    Rebalance(Vec<f64>),
}

/// Plan the rank for a card inserted at `position` into a column whose
/// current ascending card ranks are `ranks`.
///
/// `position` is 0-based and clamped to the sequence length, so appending
/// past the end is always valid.
pub fn plan_insert(ranks: &[f64], position: usize) -> RankPlan {
    let n = ranks.len();
    let position = position.min(n);

    if n == 0 {
        return RankPlan::Rank(0.0);
    }

    if position == 0 {
        let first = ranks[0];
        let candidate = first - 1.0;
        if candidate < first {
            return RankPlan::Rank(candidate);
        }
        return rebalance(n + 1);
    }

    if position == n {
        let last = ranks[n - 1];
        let candidate = last + 1.0;
        if candidate > last {
            return RankPlan::Rank(candidate);
        }
        return rebalance(n + 1);
    }

    let lo = ranks[position - 1];
    let hi = ranks[position];
    if !(lo < hi) {
        // Duplicate, inverted, or non-finite neighbor ranks.
        return rebalance(n + 1);
    }

    let mid = lo + (hi - lo) / 2.0;
    if mid > lo && mid < hi {
        RankPlan::Rank(mid)
    } else {
        rebalance(n + 1)
    }
}

/// Plan the rank for a same-column move from index `from` to index `to`.
///
/// The source entry is removed before the destination slot is computed, so
/// `to` is a position in the sequence without the moved card (the convention
/// drag-and-drop destinations use).
pub fn plan_move(ranks: &[f64], from: usize, to: usize) -> RankPlan {
    if from >= ranks.len() {
        return plan_insert(ranks, to);
    }
    let mut remaining = ranks.to_vec();
    remaining.remove(from);
    plan_insert(&remaining, to)
}

fn rebalance(count: usize) -> RankPlan {
    RankPlan::Rebalance((0..count).map(|i| i as f64).collect())
}
