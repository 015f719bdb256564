//! Indexed cell stores: the generic [`Memory`] and the machine-facing
//! [`Stack`], [`Heap`] and [`Trail`].

use std::marker::PhantomData;

use crate::address::{Address, HeapAddr, StackAddr, TrailAddr};
use crate::error::Fault;
use crate::object::HeapObject;

/// An append-growable store of cells indexed by one address type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory<A> {
    cells: Vec<HeapObject>,
    _space: PhantomData<A>,
}

impl<A> Default for Memory<A> {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            _space: PhantomData,
        }
    }
}

impl<A: Address> Memory<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, addr: A) -> Option<&HeapObject> {
        self.cells.get(addr.index())
    }

    pub fn get_mut(&mut self, addr: A) -> Option<&mut HeapObject> {
        self.cells.get_mut(addr.index())
    }

    /// Overwrite an existing cell. Returns `false` when `addr` is past the end.
    pub fn set(&mut self, addr: A, object: HeapObject) -> bool {
        match self.cells.get_mut(addr.index()) {
            Some(cell) => {
                *cell = object;
                true
            }
            None => false,
        }
    }

    /// Append a cell and return its address.
    pub fn push(&mut self, object: HeapObject) -> A {
        self.cells.push(object);
        A::from_index(self.cells.len() - 1)
    }

    /// Keep only the first `len` cells.
    pub fn truncate(&mut self, len: usize) {
        self.cells.truncate(len);
    }

    /// Grow or shrink to exactly `len` cells, padding with `fill`.
    pub fn resize(&mut self, len: usize, fill: HeapObject) {
        self.cells.resize(len, fill);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (A, &HeapObject)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (A::from_index(i), cell))
    }

    pub fn cells(&self) -> &[HeapObject] {
        &self.cells
    }
}

/// The machine stack.
///
/// Its length always equals the stack pointer plus one; [`Stack::resize_to`]
/// is the only way the machine changes it. Frame bases are kept for display
/// only and vanish when the stack shrinks below them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    memory: Memory<StackAddr>,
    frames: Vec<StackAddr>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Truncate or grow so that the top cell sits at `sp` (`-1` empties the
    /// stack). New cells are null pointers.
    pub fn resize_to(&mut self, sp: i64) {
        let len = usize::try_from(sp + 1).unwrap_or(0);
        self.memory.resize(len, HeapObject::null());
        self.frames.retain(|base| base.index() < len);
    }

    pub fn get(&self, addr: StackAddr) -> Result<&HeapObject, Fault> {
        self.memory.get(addr).ok_or(Fault::StackOutOfRange {
            index: addr.to_register(),
            sp: self.len() as i64 - 1,
        })
    }

    pub fn set(&mut self, addr: StackAddr, object: HeapObject) -> Result<(), Fault> {
        let sp = self.len() as i64 - 1;
        if self.memory.set(addr, object) {
            Ok(())
        } else {
            Err(Fault::StackOutOfRange {
                index: addr.to_register(),
                sp,
            })
        }
    }

    /// Record that a frame starts at `base`.
    pub fn open_frame(&mut self, base: StackAddr) {
        if self.frames.last().is_none_or(|last| *last < base) {
            self.frames.push(base);
        }
    }

    /// Open frames as inclusive `(start, end)` ranges, innermost last.
    pub fn frames(&self) -> Vec<(StackAddr, StackAddr)> {
        let top = self.len().saturating_sub(1);
        self.frames
            .iter()
            .enumerate()
            .map(|(i, start)| {
                let end = self
                    .frames
                    .get(i + 1)
                    .map_or(top, |next| next.index().saturating_sub(1));
                (*start, StackAddr(end))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.memory.clear();
        self.frames.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (StackAddr, &HeapObject)> {
        self.memory.iter()
    }

    pub fn cells(&self) -> &[HeapObject] {
        self.memory.cells()
    }
}

/// The heap. It only grows, except for the logic machine truncating it back
/// to a choice point's saved heap pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heap {
    memory: Memory<HeapAddr>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn allocate(&mut self, object: HeapObject) -> HeapAddr {
        self.memory.push(object)
    }

    pub fn get(&self, addr: HeapAddr) -> Result<&HeapObject, Fault> {
        self.memory.get(addr).ok_or(Fault::HeapOutOfRange {
            address: addr.index(),
            size: self.len(),
        })
    }

    pub fn set(&mut self, addr: HeapAddr, object: HeapObject) -> Result<(), Fault> {
        let size = self.len();
        if self.memory.set(addr, object) {
            Ok(())
        } else {
            Err(Fault::HeapOutOfRange {
                address: addr.index(),
                size,
            })
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.memory.truncate(len);
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeapAddr, &HeapObject)> {
        self.memory.iter()
    }

    pub fn cells(&self) -> &[HeapObject] {
        self.memory.cells()
    }
}

/// Heap cells whose bindings must be undone on backtracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trail {
    memory: Memory<TrailAddr>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn record(&mut self, addr: HeapAddr) -> TrailAddr {
        self.memory.push(HeapObject::heap_ref(addr))
    }

    pub fn get(&self, addr: TrailAddr) -> Result<HeapAddr, Fault> {
        self.memory
            .get(addr)
            .ok_or(Fault::TrailOutOfRange {
                index: addr.index(),
                size: self.len(),
            })?
            .as_heap_ref()
    }

    pub fn truncate(&mut self, len: usize) {
        self.memory.truncate(len);
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrailAddr, &HeapObject)> {
        self.memory.iter()
    }

    pub fn cells(&self) -> &[HeapObject] {
        self.memory.cells()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_tracks_pointer() {
        let mut stack = Stack::new();
        stack.resize_to(2);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.get(StackAddr(2)), Ok(&HeapObject::null()));
        stack.set(StackAddr(1), HeapObject::basic(9)).unwrap();
        stack.resize_to(0);
        assert_eq!(stack.len(), 1);
        assert!(stack.get(StackAddr(1)).is_err());
        stack.resize_to(-1);
        assert!(stack.is_empty());
    }

    #[test]
    fn stack_frames_follow_truncation() {
        let mut stack = Stack::new();
        stack.resize_to(9);
        stack.open_frame(StackAddr(2));
        stack.open_frame(StackAddr(6));
        assert_eq!(
            stack.frames(),
            vec![(StackAddr(2), StackAddr(5)), (StackAddr(6), StackAddr(9))]
        );
        stack.resize_to(4);
        assert_eq!(stack.frames(), vec![(StackAddr(2), StackAddr(4))]);
    }

    #[test]
    fn heap_allocates_in_order() {
        let mut heap = Heap::new();
        assert_eq!(heap.allocate(HeapObject::Nil), HeapAddr(0));
        assert_eq!(heap.allocate(HeapObject::basic(1)), HeapAddr(1));
        assert_eq!(
            heap.get(HeapAddr(4)),
            Err(Fault::HeapOutOfRange {
                address: 4,
                size: 2
            })
        );
    }

    #[test]
    fn trail_records_heap_addresses() {
        let mut trail = Trail::new();
        let t = trail.record(HeapAddr(3));
        assert_eq!(trail.get(t), Ok(HeapAddr(3)));
        trail.truncate(0);
        assert!(trail.get(t).is_err());
    }
}
