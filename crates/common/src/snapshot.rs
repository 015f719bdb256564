//! Whole-state snapshots for fault rollback and single-step undo.

use crate::memory::{Heap, Stack, Trail};
use crate::register::RegisterFile;

/// Everything a step can change: register values and the data memories.
/// Program memory is immutable during execution and is not captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    registers: Vec<i64>,
    stack: Stack,
    heap: Heap,
    trail: Trail,
}

impl Snapshot {
    pub fn capture(registers: &RegisterFile, stack: &Stack, heap: &Heap, trail: &Trail) -> Self {
        Self {
            registers: registers.values(),
            stack: stack.clone(),
            heap: heap.clone(),
            trail: trail.clone(),
        }
    }

    /// Put the captured state back.
    pub fn restore(
        self,
        registers: &mut RegisterFile,
        stack: &mut Stack,
        heap: &mut Heap,
        trail: &mut Trail,
    ) {
        registers.restore(&self.registers);
        *stack = self.stack;
        *heap = self.heap;
        *trail = self.trail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::HeapObject;
    use crate::register::{RegId, RegisterSpec};

    #[test]
    fn restore_undoes_every_change() {
        let mut regs = RegisterFile::new(&[RegisterSpec::new("sp", -1)]);
        let mut stack = Stack::new();
        let mut heap = Heap::new();
        let mut trail = Trail::new();
        heap.allocate(HeapObject::basic(1));

        let snapshot = Snapshot::capture(&regs, &stack, &heap, &trail);
        regs.set(RegId(0), 0);
        stack.resize_to(0);
        let a = heap.allocate(HeapObject::Nil);
        trail.record(a);

        snapshot.restore(&mut regs, &mut stack, &mut heap, &mut trail);
        assert_eq!(regs.get(RegId(0)), -1);
        assert!(stack.is_empty());
        assert_eq!(heap.len(), 1);
        assert!(trail.is_empty());
    }
}
