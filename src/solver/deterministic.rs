//! Deterministic mutation phase
//!
//! Walks every touched group (or byte, per policy) through the classic
//! deterministic stages: walking bit flips, byte and word flips, small
//! arithmetic in both byte orders, and the interesting-value tables. Every
//! candidate is validated against the range store before evaluation.

use crate::ast::{width_mask, Expr};
use crate::consts::{ARITH_MAX, INTERESTING_16, INTERESTING_32, INTERESTING_64, INTERESTING_8};
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::group::IndexGroup;
use crate::state::{DeterministicPolicy, PhaseState};

use super::Solver;

impl<E: Evaluator> Solver<E> {
    pub(crate) fn phase_deterministic(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_deterministic {
            return Ok(PhaseState::Inconclusive);
        }

        for group in self.deterministic_worklist(branch) {
            if self.deterministic_group(&group, pi, branch)? {
                return Ok(PhaseState::Sat);
            }
        }
        Ok(PhaseState::Inconclusive)
    }

    /// Groups to mutate: whole groups plus singletons for uncovered bytes,
    /// or one singleton per byte under the per-byte policy.
    fn deterministic_worklist(&mut self, branch: &Expr) -> Vec<IndexGroup> {
        let indexes = self.mutable_indexes(branch);
        if self.config.deterministic_policy == DeterministicPolicy::PerByte {
            return indexes.into_iter().map(IndexGroup::single).collect();
        }

        let mut work = self.mutable_groups(branch);
        for index in indexes {
            if !work.iter().any(|g| g.contains(index)) {
                work.push(IndexGroup::single(index));
            }
        }
        work
    }

    fn deterministic_group(&mut self, group: &IndexGroup, pi: &Expr, branch: &Expr) -> Result<bool, Timeout> {
        let n = group.len();
        let bits = group.bits();
        let mask = width_mask(bits);
        let v0_le = group.value_le(&self.tmp_input);
        let v0_be = group.value_be(&self.tmp_input);
        let cfg = self.config.clone();

        // Walking bit flips of width 1, 2 and 4.
        for (width, skip) in [
            (1u32, cfg.skip_single_walking_bit),
            (2, cfg.skip_two_walking_bit),
            (4, cfg.skip_four_walking_bit),
        ] {
            if skip || bits < width {
                continue;
            }
            for bit in 0..=(bits - width) {
                let flip = (width_mask(width)) << bit;
                if self.try_group_value_le(group, v0_le ^ flip, branch, pi)? {
                    return Ok(true);
                }
            }
        }

        // Byte, word, dword and qword flips.
        if !cfg.skip_byte_flip {
            for byte in 0..n {
                if self.try_group_value_le(group, v0_le ^ (0xff << (8 * byte)), branch, pi)? {
                    return Ok(true);
                }
            }
        }
        for (chunk, skip) in [(2usize, cfg.skip_flip_short), (4, cfg.skip_flip_int), (8, cfg.skip_flip_long)] {
            if skip || n < chunk {
                continue;
            }
            let flip = width_mask(chunk as u32 * 8);
            for byte in 0..=(n - chunk) {
                if self.try_group_value_le(group, v0_le ^ (flip << (8 * byte)), branch, pi)? {
                    return Ok(true);
                }
            }
        }

        // ±k arithmetic, little and big endian.
        let arith_enabled = match n {
            1 => !cfg.skip_arith8,
            2 => !cfg.skip_arith16,
            3 | 4 => !cfg.skip_arith32,
            _ => !cfg.skip_arith64,
        };
        if arith_enabled {
            for k in 1..ARITH_MAX {
                for value in [v0_le.wrapping_add(k), v0_le.wrapping_sub(k)] {
                    if self.try_group_value_le(group, value & mask, branch, pi)? {
                        return Ok(true);
                    }
                }
                if n > 1 {
                    for value in [v0_be.wrapping_add(k), v0_be.wrapping_sub(k)] {
                        if self.try_group_value_be(group, value & mask, branch, pi)? {
                            return Ok(true);
                        }
                    }
                }
            }
        }

        // Interesting values. The qword stage deliberately shares the
        // dword skip flag.
        let mut tables: Vec<(&[i64], bool)> = vec![];
        match n {
            1 => tables.push((&INTERESTING_8[..], cfg.skip_int8)),
            2 => {
                tables.push((&INTERESTING_8[..], cfg.skip_int16));
                tables.push((&INTERESTING_16[..], cfg.skip_int16));
            }
            4 => {
                tables.push((&INTERESTING_8[..], cfg.skip_int32));
                tables.push((&INTERESTING_16[..], cfg.skip_int32));
                tables.push((&INTERESTING_32[..], cfg.skip_int32));
            }
            8 => {
                tables.push((&INTERESTING_8[..], cfg.skip_int32));
                tables.push((&INTERESTING_16[..], cfg.skip_int32));
                tables.push((&INTERESTING_32[..], cfg.skip_int32));
                tables.push((&INTERESTING_64[..], cfg.skip_int32));
            }
            _ => {}
        }
        for (table, skip) in tables {
            if skip {
                continue;
            }
            for &value in table.iter() {
                let value = (value as u64) & mask;
                if self.try_group_value_le(group, value, branch, pi)? {
                    return Ok(true);
                }
                if n > 1 && self.try_group_value_be(group, value, branch, pi)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}
