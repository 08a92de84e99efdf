//! Frontier primitives.
//!
//! The cursor is the ordered sequence of positions whose successor set the
//! next statement extends. Walkers append duplicates freely; a `cont`
//! replaces the whole frontier, an `also_cont` extends it. Self-edges are
//! filtered at insertion, so a position never lists itself as a successor.

use super::pos::{Pos, PosSet};
use super::Successors;

impl Successors {
    /// Add every target to `S[cur]`, skipping the self-edge.
    pub(crate) fn add_succ(&mut self, cur: &Pos, targets: &[Pos]) {
        let set = self.s.entry(cur.clone()).or_default();
        for pos in targets {
            if pos != cur {
                set.insert(pos.clone());
            }
        }
    }

    /// Add every target to `Sq[cur]`, skipping the self-edge.
    pub(crate) fn add_quasi(&mut self, cur: &Pos, targets: &[Pos]) {
        let set = self.sq.entry(cur.clone()).or_default();
        for pos in targets {
            if pos != cur {
                set.insert(pos.clone());
            }
        }
    }

    /// Extend the successor set of every frontier position with `targets`,
    /// then replace the frontier with `targets`.
    pub(crate) fn cont(&mut self, set_group: bool, targets: Vec<Pos>) {
        if set_group {
            self.set_group(&targets);
        }
        let cur = std::mem::take(&mut self.cur);
        for pos in &cur {
            self.add_succ(pos, &targets);
        }
        self.cur = targets;
    }

    /// Same edges as `cont`, but the frontier is extended rather than
    /// replaced.
    pub(crate) fn also_cont(&mut self, set_group: bool, targets: Vec<Pos>) {
        if set_group {
            self.set_group(&targets);
        }
        let cur = std::mem::take(&mut self.cur);
        for pos in &cur {
            self.add_succ(pos, &targets);
        }
        self.cur = cur;
        self.cur.extend(targets);
    }

    /// Record `targets` as quasi-acceptable successors of the frontier.
    /// The frontier itself is unchanged.
    pub(crate) fn quasi_cont(&mut self, targets: &[Pos]) {
        let cur = std::mem::take(&mut self.cur);
        for pos in &cur {
            self.add_quasi(pos, targets);
        }
        self.cur = cur;
    }

    /// Make every frontier position accept any successor. Used for
    /// unconditional transfers whose target is not statically known.
    pub(crate) fn cont_any(&mut self) {
        let cur = std::mem::take(&mut self.cur);
        for pos in &cur {
            self.s.insert(pos.clone(), PosSet::Any);
        }
        self.cur = cur;
    }

    pub(crate) fn save_cursor(&self) -> Vec<Pos> {
        self.cur.clone()
    }

    pub(crate) fn set_cursor(&mut self, cur: Vec<Pos>) {
        self.cur = cur;
    }

    pub(crate) fn extend_cursor(&mut self, more: Vec<Pos>) {
        self.cur.extend(more);
    }

    pub(crate) fn cursor(&self) -> &[Pos] {
        &self.cur
    }

    /// Assign the current group to every target that does not have one yet.
    /// A group, once assigned, is never rewritten through this path.
    pub(crate) fn set_group(&mut self, targets: &[Pos]) {
        for pos in targets {
            self.groups.entry(pos.clone()).or_insert(self.cur_group);
        }
    }

    pub(crate) fn bump_group(&mut self) {
        self.cur_group += 1;
    }
}
