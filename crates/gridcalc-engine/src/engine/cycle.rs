//! Re-entry guard for recursive formula evaluation.
//!
//! Each top-level evaluation request gets a fresh [`CycleGuard`]. Entering a
//! cell that is already on the active evaluation path means the formula
//! graph has a cycle through it; the caller short-circuits with the cycle
//! sentinel (`0`) instead of recursing, so evaluation always terminates.

use std::collections::HashSet;

use super::CellRef;

/// Why [`CycleGuard::enter`] refused a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The cell is already being evaluated further up the stack.
    Reentry,
    /// The evaluation path is already `max_depth` cells long.
    TooDeep,
}

/// The set of cells currently being evaluated on one call stack.
#[derive(Debug, Default)]
pub struct CycleGuard {
    visiting: HashSet<CellRef>,
    max_depth: usize,
}

impl CycleGuard {
    pub fn new(max_depth: usize) -> CycleGuard {
        CycleGuard {
            visiting: HashSet::new(),
            max_depth,
        }
    }

    /// Mark `cell` as in progress. Must be paired with [`CycleGuard::leave`]
    /// when this returns `Ok`.
    pub fn enter(&mut self, cell: CellRef) -> Result<(), Refusal> {
        if self.visiting.contains(&cell) {
            return Err(Refusal::Reentry);
        }
        if self.visiting.len() >= self.max_depth {
            return Err(Refusal::TooDeep);
        }
        self.visiting.insert(cell);
        Ok(())
    }

    pub fn leave(&mut self, cell: CellRef) {
        self.visiting.remove(&cell);
    }

    pub fn is_visiting(&self, cell: CellRef) -> bool {
        self.visiting.contains(&cell)
    }

    pub fn depth(&self) -> usize {
        self.visiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentry_is_refused() {
        let a1 = CellRef::new(0, 0);
        let mut guard = CycleGuard::new(8);
        assert_eq!(guard.enter(a1), Ok(()));
        assert_eq!(guard.enter(a1), Err(Refusal::Reentry));
        guard.leave(a1);
        assert_eq!(guard.enter(a1), Ok(()));
    }

    #[test]
    fn test_siblings_share_nothing_after_leave() {
        let mut guard = CycleGuard::new(8);
        let (a1, b1) = (CellRef::new(0, 0), CellRef::new(0, 1));
        guard.enter(a1).unwrap();
        guard.leave(a1);
        guard.enter(b1).unwrap();
        assert!(!guard.is_visiting(a1));
        assert!(guard.is_visiting(b1));
        assert_eq!(guard.depth(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let mut guard = CycleGuard::new(2);
        guard.enter(CellRef::new(0, 0)).unwrap();
        guard.enter(CellRef::new(1, 0)).unwrap();
        assert_eq!(guard.enter(CellRef::new(2, 0)), Err(Refusal::TooDeep));
    }
}
