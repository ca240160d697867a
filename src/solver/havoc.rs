//! Havoc phase: stacked random mutations
//!
//! Each iteration rebuilds the candidate from the baseline and applies a
//! random stack of mutations drawn from a pool that adapts to the group
//! sizes available. The budget scales with the number of touched bytes.

use crate::ast::{width_mask, Expr};
use crate::consts::{HAVOC_C, HAVOC_STACK_POW2, INTERESTING_16, INTERESTING_32, INTERESTING_8};
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::group::IndexGroup;
use crate::state::{HavocPolicy, PhaseState};

use super::Solver;

impl<E: Evaluator> Solver<E> {
    pub(crate) fn phase_havoc(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_havoc {
            return Ok(PhaseState::Inconclusive);
        }

        let mut indexes = self.mutable_indexes(branch);
        if self.config.havoc_policy == HavocPolicy::WholeQuery {
            let mut from_pi = self.mutable_indexes(pi);
            from_pi.retain(|i| !indexes.contains(i));
            indexes.extend(from_pi);
            indexes.sort_unstable();
        }
        if indexes.is_empty() {
            return Ok(PhaseState::Inconclusive);
        }
        let groups: Vec<IndexGroup> = self
            .mutable_groups(branch)
            .into_iter()
            .filter(|g| g.len() > 1)
            .collect();

        let score = indexes.len() * HAVOC_C;
        let baseline = self.snapshot_input();

        for _ in 0..score {
            self.restore_input(&baseline);

            let stack = 1u64 << (1 + self.rng.below(HAVOC_STACK_POW2 as u64));
            for _ in 0..stack {
                self.havoc_mutation(&indexes, &groups);
            }

            match self.check_candidate(branch, pi) {
                Ok(true) => return Ok(PhaseState::Sat),
                Ok(false) => {}
                Err(t) => {
                    self.restore_input(&baseline);
                    return Err(t);
                }
            }
        }

        self.restore_input(&baseline);
        Ok(PhaseState::Inconclusive)
    }

    /// Apply one random mutation in place. The pool grows with the group
    /// sizes available to the query.
    fn havoc_mutation(&mut self, indexes: &[usize], groups: &[IndexGroup]) {
        let byte_pool = 6u64;
        let pool = if groups.is_empty() { byte_pool } else { byte_pool + 3 };

        match self.rng.below(pool) {
            // Flip a random bit.
            0 => {
                let index = indexes[self.rng.below(indexes.len() as u64) as usize];
                let bit = self.rng.below(8);
                self.tmp_input[index] ^= 1 << bit;
            }
            // Interesting byte.
            1 => {
                let index = indexes[self.rng.below(indexes.len() as u64) as usize];
                let value = INTERESTING_8[self.rng.below(INTERESTING_8.len() as u64) as usize];
                self.tmp_input[index] = (value as u64) & 0xff;
            }
            // Random add.
            2 => {
                let index = indexes[self.rng.below(indexes.len() as u64) as usize];
                let delta = 1 + self.rng.below(crate::consts::ARITH_MAX - 1);
                self.tmp_input[index] = self.tmp_input[index].wrapping_add(delta) & 0xff;
            }
            // Random subtract.
            3 => {
                let index = indexes[self.rng.below(indexes.len() as u64) as usize];
                let delta = 1 + self.rng.below(crate::consts::ARITH_MAX - 1);
                self.tmp_input[index] = self.tmp_input[index].wrapping_sub(delta) & 0xff;
            }
            // Random byte.
            4 => {
                let index = indexes[self.rng.below(indexes.len() as u64) as usize];
                self.tmp_input[index] = self.rng.below(256);
            }
            // Byte flip.
            5 => {
                let index = indexes[self.rng.below(indexes.len() as u64) as usize];
                self.tmp_input[index] ^= 0xff;
            }
            // Interesting word into a random group.
            6 => {
                let group = groups[self.rng.below(groups.len() as u64) as usize];
                let table: &[i64] = if group.len() == 2 {
                    &INTERESTING_16
                } else {
                    &INTERESTING_32
                };
                let value = (table[self.rng.below(table.len() as u64) as usize] as u64) & width_mask(group.bits());
                if self.rng.coin() {
                    group.set_le(&mut self.tmp_input, value);
                } else {
                    group.set_be(&mut self.tmp_input, value);
                }
            }
            // Group arithmetic.
            7 => {
                let group = groups[self.rng.below(groups.len() as u64) as usize];
                let delta = 1 + self.rng.below(crate::consts::ARITH_MAX - 1);
                let value = group.value_le(&self.tmp_input);
                let value = if self.rng.coin() {
                    value.wrapping_add(delta)
                } else {
                    value.wrapping_sub(delta)
                };
                group.set_le(&mut self.tmp_input, value & width_mask(group.bits()));
            }
            // Random group value.
            _ => {
                let group = groups[self.rng.below(groups.len() as u64) as usize];
                let value = self.rng.next_u64() & width_mask(group.bits());
                group.set_le(&mut self.tmp_input, value);
            }
        }
    }
}
