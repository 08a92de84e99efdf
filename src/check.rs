//! Line-transition checking.
//!
//! Walks each function's instruction stream and verifies every attributed
//! line transition against the inferred successor tables. A transition not
//! covered by `S` or `Sq` is a mismatch, graded by how far the target
//! strays: a different line in the expected group costs 1, a different
//! group of the same function 10, anything else 100.

use crate::exe::Function;
use crate::successors::{accepted_file, same_function, Pos, PosSet, Successors};
use serde::Serialize;
use tracing::debug;

/// Moves to a different line in the same group of lines.
pub const OUT_OF_ORDER_PENALTY: u32 = 1;
/// Moves to a different line, not in the group we expected.
pub const OUT_OF_GROUP_PENALTY: u32 = 10;
/// Moves to a different line in a different function.
pub const OUT_OF_FUNCTION_PENALTY: u32 = 100;

/// One implausible transition found in the instruction stream.
#[derive(Debug, Clone, Serialize)]
pub struct Mismatch {
    pub from: Pos,
    pub to: Pos,
    pub pc: u64,
    /// The acceptable successors of `from`, sorted.
    pub expected: Vec<Pos>,
    pub penalty: u32,
}

/// The outcome of checking every matched function.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    pub mismatches: Vec<Mismatch>,
    pub penalty: u64,
    /// Source lines spanned by the checked function declarations.
    pub line_count: i64,
}

impl CheckReport {
    pub fn average_penalty(&self) -> f64 {
        if self.line_count == 0 {
            return 0.0;
        }
        self.penalty as f64 / self.line_count as f64
    }
}

/// Check every function against the successor tables.
pub fn check_functions(functions: &[Function], succs: &Successors) -> CheckReport {
    let mut report = CheckReport::default();
    for func in functions {
        check_function(func, succs, &mut report.mismatches);
        if let Some(decl) = &func.decl {
            report.line_count += decl.end.line - decl.start.line;
        }
    }
    report.penalty = report.mismatches.iter().map(|m| m.penalty as u64).sum();
    report
}

fn check_function(func: &Function, succs: &Successors, mismatches: &mut Vec<Mismatch>) {
    if func.decl.is_none() {
        return;
    }
    debug!("checking {}", func.name);

    let mut curpos = Pos::default();
    for inst in &func.text {
        if curpos.file.is_empty() && curpos.line == 0 {
            curpos = inst.pos.clone();
        }

        if inst.is_trap() {
            // Undefined instruction, assume we can never get here.
            curpos = Pos::function_exit();
            continue;
        }

        if curpos != inst.pos {
            mismatches.extend(check_transition(succs, &curpos, &inst.pos, inst.pc));
            curpos = inst.pos.clone();
        }

        if let Some((target, unconditional)) = inst.branch_target() {
            match func.instruction_index_at(target) {
                Some(idx) => {
                    if func.text[idx].pos != curpos {
                        mismatches.extend(check_transition(
                            succs,
                            &curpos,
                            &func.text[idx].pos,
                            inst.pc,
                        ));
                    }
                    if unconditional {
                        curpos = Pos::default();
                    }
                }
                None => debug!(
                    "could not find destination of jump at {:#x} (destination pc {:#x})",
                    inst.pc, target
                ),
            }
        }

        if inst.is_ret() {
            let exit = Pos::function_exit();
            mismatches.extend(check_transition(succs, &curpos, &exit, inst.pc));
            curpos = exit;
        }
    }

    if (!curpos.file.is_empty() || curpos.line != 0) && !func.text.is_empty() {
        let last_pc = func.text[func.text.len() - 1].pc;
        mismatches.extend(check_transition(
            succs,
            &curpos,
            &Pos::function_exit(),
            last_pc,
        ));
    }
}

/// Grade a single transition. `None` means acceptable.
pub fn check_transition(
    succs: &Successors,
    start: &Pos,
    end: &Pos,
    pc: u64,
) -> Option<Mismatch> {
    if !accepted_file(&start.file) {
        return None;
    }
    if let Some(set) = succs.s.get(start) {
        if set.contains(end) {
            return None;
        }
    }
    // Exit from an if or switch is tolerated.
    if let Some(set) = succs.sq.get(start) {
        if set.contains(end) {
            return None;
        }
    }

    let end_group = succs.groups.get(end).copied().unwrap_or(0);

    let mut penalty = OUT_OF_FUNCTION_PENALTY;
    if end.is_function_exit() {
        penalty = OUT_OF_GROUP_PENALTY;
    }

    let empty = PosSet::default();
    let expected_set = succs.s.get(start).unwrap_or(&empty);
    let mut expected: Vec<Pos> = expected_set.iter().cloned().collect();
    expected.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));

    for pos in &expected {
        let group = succs.groups.get(pos).copied().unwrap_or(0);
        let p = if group == end_group {
            OUT_OF_ORDER_PENALTY
        } else if same_function(group, end_group) {
            OUT_OF_GROUP_PENALTY
        } else {
            OUT_OF_FUNCTION_PENALTY
        };
        penalty = penalty.min(p);
    }

    Some(Mismatch {
        from: start.clone(),
        to: end.clone(),
        pc,
        expected,
        penalty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::successors::PosSet;
    use rustc_hash::FxHashSet;

    fn succs_with(
        s: Vec<(Pos, PosSet)>,
        sq: Vec<(Pos, PosSet)>,
        groups: Vec<(Pos, u64)>,
    ) -> Successors {
        let mut succs = Successors::new();
        succs.s.extend(s);
        succs.sq.extend(sq);
        succs.groups.extend(groups);
        succs
    }

    fn finite(positions: &[Pos]) -> PosSet {
        PosSet::Finite(positions.iter().cloned().collect::<FxHashSet<_>>())
    }

    fn p(line: i64) -> Pos {
        Pos::new("main.go", line)
    }

    #[test]
    fn acceptable_transition_is_free() {
        let succs = succs_with(vec![(p(1), finite(&[p(2)]))], vec![], vec![]);
        assert!(check_transition(&succs, &p(1), &p(2), 0).is_none());
    }

    #[test]
    fn any_accepts_everything() {
        let succs = succs_with(vec![(p(1), PosSet::Any)], vec![], vec![]);
        assert!(check_transition(&succs, &p(1), &p(999), 0).is_none());
        assert!(check_transition(&succs, &p(1), &Pos::function_exit(), 0).is_none());
    }

    #[test]
    fn quasi_acceptable_transition_is_free() {
        let succs = succs_with(
            vec![(p(3), finite(&[p(4)]))],
            vec![(p(3), finite(&[p(2)]))],
            vec![],
        );
        assert!(check_transition(&succs, &p(3), &p(2), 0).is_none());
    }

    #[test]
    fn transitions_from_unanalyzed_files_are_ignored() {
        let succs = Successors::new();
        let from = Pos::new("<autogenerated>", 1);
        assert!(check_transition(&succs, &from, &p(2), 0).is_none());
        assert!(check_transition(&succs, &Pos::default(), &p(2), 0).is_none());
    }

    #[test]
    fn same_group_mismatch_costs_one() {
        let succs = succs_with(
            vec![(p(1), finite(&[p(2)]))],
            vec![],
            vec![(p(2), (1 << 32) | 3), (p(5), (1 << 32) | 3)],
        );
        let m = check_transition(&succs, &p(1), &p(5), 0x40).unwrap();
        assert_eq!(m.penalty, OUT_OF_ORDER_PENALTY);
        assert_eq!(m.expected, vec![p(2)]);
    }

    #[test]
    fn same_function_mismatch_costs_ten() {
        let succs = succs_with(
            vec![(p(1), finite(&[p(2)]))],
            vec![],
            vec![(p(2), (1 << 32) | 3), (p(9), (1 << 32) | 7)],
        );
        let m = check_transition(&succs, &p(1), &p(9), 0).unwrap();
        assert_eq!(m.penalty, OUT_OF_GROUP_PENALTY);
    }

    #[test]
    fn cross_function_mismatch_costs_hundred() {
        let succs = succs_with(
            vec![(p(1), finite(&[p(2)]))],
            vec![],
            vec![(p(2), 1 << 32), (p(40), 2 << 32)],
        );
        let m = check_transition(&succs, &p(1), &p(40), 0).unwrap();
        assert_eq!(m.penalty, OUT_OF_FUNCTION_PENALTY);
    }

    #[test]
    fn unexpected_function_exit_caps_at_group_penalty() {
        let succs = succs_with(
            vec![(p(1), finite(&[p(2)]))],
            vec![],
            vec![(p(2), (1 << 32) | 3)],
        );
        let m = check_transition(&succs, &p(1), &Pos::function_exit(), 0).unwrap();
        assert_eq!(m.penalty, OUT_OF_GROUP_PENALTY);
    }
}
