//! Per-cell power accumulation with bounded Top-K selection
//!
//! For every grid cell the engine keeps a running total of received power
//! density and the three largest per-source contributions, held in a small
//! fixed-size insertion structure rather than a sort over all sources.
//! Contributions must be folded in ascending source-index order; equal
//! powers then resolve to the smaller index, which keeps the ranking
//! deterministic.

use crate::types::TOP_K;

/// One retained contribution: the per-source power density and the
/// post-filter index of the source that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub power_w_m2: f64,
    pub source_index: usize,
}

/// The largest [`TOP_K`] contributions seen at one cell, strongest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopContributors {
    slots: [Option<Contribution>; TOP_K],
}

impl TopContributors {
    /// Offer a contribution. Zero and non-finite powers are ignored. A new
    /// entry displaces the first strictly-smaller slot, so among equals the
    /// earlier (smaller-index) source keeps the better rank.
    pub fn offer(&mut self, power_w_m2: f64, source_index: usize) {
        if !(power_w_m2 > 0.0) || !power_w_m2.is_finite() {
            return;
        }
        for rank in 0..TOP_K {
            let beats = match self.slots[rank] {
                Some(held) => power_w_m2 > held.power_w_m2,
                None => true,
            };
            if beats {
                for shift in (rank + 1..TOP_K).rev() {
                    self.slots[shift] = self.slots[shift - 1];
                }
                self.slots[rank] = Some(Contribution {
                    power_w_m2,
                    source_index,
                });
                return;
            }
        }
    }

    /// Retained contributions in rank order (strongest first).
    pub fn iter(&self) -> impl Iterator<Item = &Contribution> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    pub fn clear(&mut self) {
        self.slots = [None; TOP_K];
    }
}

/// Running (total, Top-K) state for every cell of one band.
#[derive(Debug, Clone)]
pub struct CellAccumulator {
    totals: Vec<f64>,
    top: Vec<TopContributors>,
}

impl CellAccumulator {
    pub fn new(cells: usize) -> Self {
        Self {
            totals: vec![0.0; cells],
            top: vec![TopContributors::default(); cells],
        }
    }

    /// Fold one per-source contribution into a cell.
    #[inline]
    pub fn fold(&mut self, cell: usize, power_w_m2: f64, source_index: usize) {
        if power_w_m2.is_finite() && power_w_m2 > 0.0 {
            self.totals[cell] += power_w_m2;
            self.top[cell].offer(power_w_m2, source_index);
        }
    }

    /// Accumulated total power density at a cell, W/m^2.
    #[inline]
    pub fn total(&self, cell: usize) -> f64 {
        self.totals[cell]
    }

    /// Top contributions at a cell, strongest first.
    #[inline]
    pub fn top(&self, cell: usize) -> &TopContributors {
        &self.top[cell]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_offer_keeps_three_largest() {
        let mut top = TopContributors::default();
        for (power, idx) in [(1.0, 0), (5.0, 1), (3.0, 2), (4.0, 3), (0.5, 4)] {
            top.offer(power, idx);
        }
        let kept: Vec<_> = top.iter().map(|c| (c.power_w_m2, c.source_index)).collect();
        assert_eq!(kept, vec![(5.0, 1), (4.0, 3), (3.0, 2)]);
    }

    #[test]
    fn test_offer_fewer_than_three() {
        let mut top = TopContributors::default();
        top.offer(2.0, 7);
        assert_eq!(top.len(), 1);
        let kept: Vec<_> = top.iter().map(|c| c.source_index).collect();
        assert_eq!(kept, vec![7]);
    }

    #[test]
    fn test_offer_ties_prefer_smaller_index() {
        let mut top = TopContributors::default();
        // Folded in index order, as the engine does.
        top.offer(1.0, 0);
        top.offer(1.0, 1);
        top.offer(1.0, 2);
        top.offer(1.0, 3);
        let kept: Vec<_> = top.iter().map(|c| c.source_index).collect();
        assert_eq!(kept, vec![0, 1, 2]);
    }

    #[test]
    fn test_offer_rejects_zero_and_non_finite() {
        let mut top = TopContributors::default();
        top.offer(0.0, 0);
        top.offer(-1.0, 1);
        top.offer(f64::NAN, 2);
        top.offer(f64::INFINITY, 3);
        assert!(top.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut top = TopContributors::default();
        top.offer(1.0, 0);
        top.clear();
        assert!(top.is_empty());
        assert_eq!(top.len(), 0);
    }

    #[test]
    fn test_accumulator_totals_match_fold_sum() {
        let mut acc = CellAccumulator::new(4);
        acc.fold(0, 1e-6, 0);
        acc.fold(0, 2e-6, 1);
        acc.fold(0, 3e-6, 2);
        acc.fold(0, 4e-6, 3);
        assert_relative_eq!(acc.total(0), 1e-5, max_relative = 1e-12);
        // Untouched cells stay zero and empty.
        assert_eq!(acc.total(3), 0.0);
        assert!(acc.top(3).is_empty());
    }

    #[test]
    fn test_accumulator_top_fractions_sum_below_one() {
        let mut acc = CellAccumulator::new(1);
        for (i, p) in [5e-6, 4e-6, 3e-6, 2e-6, 1e-6].iter().enumerate() {
            acc.fold(0, *p, i);
        }
        let total = acc.total(0);
        let frac_sum: f64 = acc.top(0).iter().map(|c| c.power_w_m2 / total).sum();
        assert!(frac_sum < 1.0, "top-3 of five sources cannot cover the total");
        assert!(frac_sum > 0.0);
    }

    #[test]
    fn test_accumulator_fraction_equality_when_all_kept() {
        let mut acc = CellAccumulator::new(1);
        acc.fold(0, 1e-6, 0);
        acc.fold(0, 2e-6, 1);
        let total = acc.total(0);
        let frac_sum: f64 = acc.top(0).iter().map(|c| c.power_w_m2 / total).sum();
        assert_relative_eq!(frac_sum, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_fold_order_independent_total_for_top_state() {
        // The Top-K ranking only depends on magnitudes when powers are
        // distinct, regardless of arrival order.
        let mut a = TopContributors::default();
        let mut b = TopContributors::default();
        for (p, i) in [(3.0, 0), (1.0, 1), (2.0, 2)] {
            a.offer(p, i);
        }
        for (p, i) in [(1.0, 1), (2.0, 2), (3.0, 0)] {
            b.offer(p, i);
        }
        let ka: Vec<_> = a.iter().map(|c| c.source_index).collect();
        let kb: Vec<_> = b.iter().map(|c| c.source_index).collect();
        assert_eq!(ka, kb);
    }
}
