use blockview_core::Address;
use blockview_events::{ObserverList, Subscription};
use blockview_graph::SelectionQuery;
use std::collections::BTreeSet;

/// Which of the two selection sets changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Instructions,
    Operands,
    /// Both sets changed in one operation.
    Both,
}

impl SelectionChange {
    fn of(instructions: bool, operands: bool) -> Option<Self> {
        match (instructions, operands) {
            (true, true) => Some(SelectionChange::Both),
            (true, false) => Some(SelectionChange::Instructions),
            (false, true) => Some(SelectionChange::Operands),
            (false, false) => None,
        }
    }
}

/// Selected instructions and operands, kept independently.
///
/// Each mutation that changes a set notifies observers exactly once; a
/// mutation that changes nothing stays silent.
#[derive(Debug, Default)]
pub struct SelectionModel {
    instructions: BTreeSet<Address>,
    operands: BTreeSet<(Address, usize)>,
    observers: ObserverList<SelectionChange>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl FnMut(&SelectionChange) + 'static) -> Subscription {
        self.observers.subscribe(callback)
    }

    pub fn selected_instructions(&self) -> &BTreeSet<Address> {
        &self.instructions
    }

    pub fn selected_operands(&self) -> &BTreeSet<(Address, usize)> {
        &self.operands
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.operands.is_empty()
    }

    /// With `unique`, the set becomes exactly `{addr}`.
    pub fn select_instruction(&mut self, addr: Address, unique: bool) -> bool {
        let changed = select_in(&mut self.instructions, addr, unique);
        self.emit_if(changed, SelectionChange::Instructions)
    }

    pub fn unselect_instruction(&mut self, addr: Address) -> bool {
        let changed = self.instructions.remove(&addr);
        self.emit_if(changed, SelectionChange::Instructions)
    }

    pub fn unselect_all_instructions(&mut self) -> bool {
        let changed = !self.instructions.is_empty();
        self.instructions.clear();
        self.emit_if(changed, SelectionChange::Instructions)
    }

    pub fn select_operand(&mut self, addr: Address, index: usize, unique: bool) -> bool {
        let changed = select_in(&mut self.operands, (addr, index), unique);
        self.emit_if(changed, SelectionChange::Operands)
    }

    pub fn unselect_operand(&mut self, addr: Address, index: usize) -> bool {
        let changed = self.operands.remove(&(addr, index));
        self.emit_if(changed, SelectionChange::Operands)
    }

    pub fn unselect_all_operands(&mut self) -> bool {
        let changed = !self.operands.is_empty();
        self.operands.clear();
        self.emit_if(changed, SelectionChange::Operands)
    }

    /// Empty both sets with a single notification.
    pub fn clear(&mut self) -> bool {
        let change = SelectionChange::of(!self.instructions.is_empty(), !self.operands.is_empty());
        self.instructions.clear();
        self.operands.clear();
        self.emit(change)
    }

    /// Drop every entry whose instruction fails `keep`. Observers hear about
    /// it at most once. Returns true when anything was dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(Address) -> bool) -> bool {
        let before = (self.instructions.len(), self.operands.len());
        self.instructions.retain(|&addr| keep(addr));
        self.operands.retain(|&(addr, _)| keep(addr));
        let dropped = (before.0 - self.instructions.len(), before.1 - self.operands.len());
        if dropped != (0, 0) {
            tracing::debug!(
                "Dropped {} stale instruction and {} stale operand selections",
                dropped.0,
                dropped.1
            );
        }
        self.emit(SelectionChange::of(dropped.0 > 0, dropped.1 > 0))
    }

    fn emit_if(&self, changed: bool, change: SelectionChange) -> bool {
        self.emit(changed.then_some(change))
    }

    fn emit(&self, change: Option<SelectionChange>) -> bool {
        match change {
            Some(change) => {
                self.observers.notify(&change);
                true
            }
            None => false,
        }
    }
}

fn select_in<T: Ord + Copy>(set: &mut BTreeSet<T>, item: T, unique: bool) -> bool {
    if unique {
        if set.len() == 1 && set.contains(&item) {
            return false;
        }
        set.clear();
        set.insert(item);
        true
    } else {
        set.insert(item)
    }
}

impl SelectionQuery for SelectionModel {
    fn is_instruction_selected(&self, addr: Address) -> bool {
        self.instructions.contains(&addr)
    }

    fn is_operand_selected(&self, addr: Address, index: usize) -> bool {
        self.operands.contains(&(addr, index))
    }
}
