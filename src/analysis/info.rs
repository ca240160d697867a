//! Per-expression input footprint, memoised by structural hash

use std::rc::Rc;

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use crate::analysis::group_match::match_group;
use crate::analysis::input_to_state::{adjust_to_sat_side, detect_cmp_shape};
use crate::ast::{Expr, ExprKind};
use crate::consts::MAX_AST_INFO_CACHE;
use crate::group::IndexGroup;

/// A constant paired with the group it was compared against inside an ITE
/// condition. Only the low 64 bits of the constant are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IteConstant {
    pub group: IndexGroup,
    pub value: u64,
}

/// Memoised record of everything the phases want to know about a
/// sub-expression.
#[derive(Debug, Clone, Default)]
pub struct AstInfo {
    /// Input byte indices touched and free to mutate.
    pub indexes: HashSet<usize>,
    /// Multi-byte views touched and free to mutate.
    pub index_groups: HashSet<IndexGroup>,
    /// Touched indices pinned by an equality in the path constraint.
    pub indexes_ud: HashSet<usize>,
    /// Touched groups with at least one pinned byte.
    pub index_groups_ud: HashSet<IndexGroup>,
    /// Input-to-state constants harvested from ITE conditions.
    pub ite_input_to_state: Vec<IteConstant>,
    pub linear_ops: u32,
    pub nonlinear_ops: u32,
    pub extract_ops: u32,
    pub approximated_groups: u32,
    /// Node count of the expression.
    pub query_size: u32,
}

impl AstInfo {
    /// Total number of distinct touched indices, pinned or not.
    pub fn input_extent(&self) -> usize {
        self.indexes.len() + self.indexes_ud.len()
    }

    fn absorb(&mut self, child: &AstInfo) {
        self.indexes.extend(child.indexes.iter().copied());
        self.index_groups.extend(child.index_groups.iter().copied());
        self.indexes_ud.extend(child.indexes_ud.iter().copied());
        self.index_groups_ud.extend(child.index_groups_ud.iter().copied());
        self.ite_input_to_state.extend(child.ite_input_to_state.iter().copied());
        self.linear_ops += child.linear_ops;
        self.nonlinear_ops += child.nonlinear_ops;
        self.extract_ops += child.extract_ops;
        self.approximated_groups += child.approximated_groups;
        self.query_size += child.query_size;
    }
}

/// Context-owned cache of [`AstInfo`] records.
///
/// Entries are shared handles; the cache drops everything when it grows
/// past its cap and whenever a new univocally-defined input invalidates
/// previously derived footprints.
#[derive(Debug, Default)]
pub struct AstInfoCache {
    entries: HashMap<u64, Rc<AstInfo>>,
}

impl AstInfoCache {
    pub fn get(&self, hash: u64) -> Option<Rc<AstInfo>> {
        self.entries.get(&hash).cloned()
    }

    pub fn insert(&mut self, hash: u64, info: Rc<AstInfo>) {
        if self.entries.len() >= MAX_AST_INFO_CACHE {
            trace!(entries = self.entries.len(), "ast-info cache overflow, dropping");
            self.entries.clear();
        }
        self.entries.insert(hash, info);
    }

    /// Drop every memoised record.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Borrowed view over the context state the detectors need.
pub(crate) struct InfoBuilder<'a> {
    pub cache: &'a mut AstInfoCache,
    pub assignments: &'a [Expr],
    pub input_bytes: usize,
    pub univocally_defined: &'a HashSet<usize>,
    /// Comparison constants scraped while walking, fed to the extended
    /// input-to-state phase.
    pub early_constants: &'a mut HashSet<u64>,
}

impl InfoBuilder<'_> {
    /// Footprint of `expr`, computed or recalled.
    pub fn info(&mut self, expr: &Expr) -> Rc<AstInfo> {
        let hash = expr.structural_hash();
        if let Some(hit) = self.cache.get(hash) {
            return hit;
        }

        let info = Rc::new(self.compute(expr));
        self.cache.insert(hash, info.clone());
        info
    }

    fn compute(&mut self, expr: &Expr) -> AstInfo {
        let mut out = AstInfo {
            query_size: 1,
            ..AstInfo::default()
        };

        match expr.kind() {
            ExprKind::Const { .. } | ExprKind::Bool(_) => {}

            ExprKind::Input(i) => {
                if *i < self.input_bytes {
                    self.add_index(&mut out, *i);
                    self.add_group(&mut out, IndexGroup::single(*i), false);
                } else if let Some(assignment) = self.assignments.get(*i - self.input_bytes).cloned() {
                    let sub = self.info(&assignment);
                    out.absorb(&sub);
                }
            }

            ExprKind::Concat(_) | ExprKind::Extract { .. } | ExprKind::BvAnd(_) | ExprKind::BvOr(_) | ExprKind::BvAdd(_) => {
                if let Some(m) = match_group(expr, self.assignments, self.input_bytes) {
                    for i in m.group.iter() {
                        self.add_index(&mut out, i);
                    }
                    self.add_group(&mut out, m.group, m.approx);
                    out.linear_ops += 1;
                } else {
                    out.linear_ops += 1;
                    if matches!(expr.kind(), ExprKind::Extract { .. }) {
                        out.extract_ops += 1;
                    }
                    self.descend(&mut out, expr);
                }
            }

            ExprKind::BvShl(..) | ExprKind::BvLshr(..) | ExprKind::BvAshr(..) | ExprKind::BvUdiv(..)
            | ExprKind::BvSdiv(..) | ExprKind::BvUrem(..) | ExprKind::BvSrem(..) => {
                out.nonlinear_ops += 1;
                out.extract_ops += 1;
                self.descend(&mut out, expr);
            }

            ExprKind::BvMul(_) => {
                out.nonlinear_ops += 1;
                self.descend(&mut out, expr);
            }

            ExprKind::Ite(cond, _, _) => {
                self.harvest_ite_constant(&mut out, cond);
                out.linear_ops += 1;
                self.descend(&mut out, expr);
            }

            ExprKind::Cmp { lhs, rhs, .. } => {
                for side in [lhs, rhs] {
                    if let Some((value, _)) = side.as_const() {
                        self.early_constants.insert(value);
                    }
                }
                out.linear_ops += 1;
                self.descend(&mut out, expr);
            }

            ExprKind::Not(_) | ExprKind::And(_) | ExprKind::Or(_) => {
                self.descend(&mut out, expr);
            }

            _ => {
                out.linear_ops += 1;
                self.descend(&mut out, expr);
            }
        }

        out
    }

    fn descend(&mut self, out: &mut AstInfo, expr: &Expr) {
        for child in expr.children() {
            let sub = self.info(&child);
            out.absorb(&sub);
        }
    }

    fn add_index(&self, out: &mut AstInfo, index: usize) {
        if self.univocally_defined.contains(&index) {
            out.indexes_ud.insert(index);
        } else {
            out.indexes.insert(index);
        }
    }

    fn add_group(&self, out: &mut AstInfo, group: IndexGroup, approx: bool) {
        if approx {
            out.approximated_groups += 1;
        }
        if group.iter().any(|i| self.univocally_defined.contains(&i)) {
            out.index_groups_ud.insert(group);
        } else {
            out.index_groups.insert(group);
        }
    }

    /// Record `group == value` patterns found in an ITE condition.
    fn harvest_ite_constant(&mut self, out: &mut AstInfo, cond: &Expr) {
        if let Some((op, group, value, width)) = detect_cmp_shape(cond, self.assignments, self.input_bytes) {
            if let Some(adjusted) = adjust_to_sat_side(op, value, width) {
                out.ite_input_to_state.push(IteConstant {
                    group,
                    value: adjusted,
                });
            }
        }
    }
}
