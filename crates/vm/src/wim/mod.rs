//! The WiM: a unification and backtracking machine for logic programs.
//!
//! Terms live on the heap. Integers are basic values, atoms are structures
//! of arity zero, an unbound variable is a cell that points to itself, and
//! a compound term is a structure header followed by one cell per argument.
//!
//! Every predicate call gets a frame of [`ORG`] organisational cells
//! followed by the arguments and the clause's other variables:
//!
//! ```text
//! fp+0  positive continuation (return address)
//! fp+1  caller frame
//! fp+2  negative continuation (next alternative)
//! fp+3  previous choice point
//! fp+4  trail pointer when the choice point was made
//! fp+5  heap pointer when the choice point was made
//! fp+6  stack pointer when the choice point was made
//! fp+7  slot 1 ...
//! ```
//!
//! A frame is a choice point while `btp` points at it. Failure returns to
//! the newest choice point, undoing every binding recorded on the trail
//! since it was made.

mod execute;
mod instruction;
mod unify;

pub use instruction::{ClauseKey, Constant, Functor, WimInstr, MNEMONICS};

use vmlab_common::{ExecError, Heap, HeapAddr, HeapObject, Pointer, RegId};

use crate::machine::Vm;

/// Backtrack pointer: the newest choice point.
pub const BTP: RegId = RegId(4);
/// Heap pointer: the newest heap cell.
pub const HP: RegId = RegId(5);
/// Trail pointer: the newest trail entry.
pub const TP: RegId = RegId(6);
/// Unification mode, [`MODE_READ`] or [`MODE_WRITE`].
pub const MODE: RegId = RegId(7);

pub const MODE_READ: i64 = 0;
pub const MODE_WRITE: i64 = 1;

/// Number of organisational cells at the bottom of every frame.
pub const ORG: i64 = 7;
pub const POS_CONT: i64 = 0;
pub const CALLER_FP: i64 = 1;
pub const NEG_CONT: i64 = 2;
pub const PREV_BTP: i64 = 3;
pub const SAVED_TP: i64 = 4;
pub const SAVED_HP: i64 = 5;
pub const SAVED_SP: i64 = 6;

/// Terms nested deeper than this are cut off when rendered.
const RENDER_LIMIT: usize = 64;

/// Whether any choice point other than the query's own failure
/// continuation is left.
pub fn has_choice_points(vm: &Vm<WimInstr>) -> bool {
    let btp = vm.btp();
    btp >= 0
        && vm
            .stack_get(btp + PREV_BTP)
            .and_then(HeapObject::as_register)
            .is_ok_and(|previous| previous >= 0)
}

/// The rendered term bound to variable slot `i` of the current frame.
pub fn binding(vm: &Vm<WimInstr>, i: usize) -> Option<String> {
    let addr = vm.stack_get(vm.slot(i)).ok()?.as_heap_ref().ok()?;
    Some(render_term(vm.heap(), addr))
}

/// Look for the next answer after a successful `halt` by backtracking into
/// the newest choice point and running on.
pub fn next_solution(vm: &mut Vm<WimInstr>) -> Result<(), ExecError> {
    vm.backtrack().map_err(|cause| ExecError {
        at: vm.pc(),
        instruction: None,
        cause,
    })?;
    vm.resume();
    vm.run()
}

/// Render the term at `addr` in Prolog syntax. Unbound variables print as
/// `_G<address>`, lists with square brackets.
pub fn render_term(heap: &Heap, addr: HeapAddr) -> String {
    render_at(heap, addr, 0)
}

fn deref(heap: &Heap, mut addr: HeapAddr) -> HeapAddr {
    while let Ok(HeapObject::Pointer(Pointer::Heap(next))) = heap.get(addr) {
        if *next == addr {
            break;
        }
        addr = *next;
    }
    addr
}

fn render_at(heap: &Heap, addr: HeapAddr, depth: usize) -> String {
    if depth > RENDER_LIMIT {
        return "...".to_string();
    }
    let addr = deref(heap, addr);
    match heap.get(addr) {
        Ok(HeapObject::Pointer(Pointer::Heap(_))) => format!("_G{}", addr.0),
        Ok(HeapObject::Basic { value, .. }) => value.to_string(),
        Ok(HeapObject::Structure { name, arity: 0 }) => name.clone(),
        Ok(HeapObject::Structure { name, arity: 2 }) if name == "." => {
            render_list(heap, addr, depth)
        }
        Ok(HeapObject::Structure { name, arity }) => {
            let args: Vec<String> = (1..=*arity)
                .map(|i| render_at(heap, HeapAddr(addr.0 + i), depth + 1))
                .collect();
            format!("{name}({})", args.join(", "))
        }
        Ok(other) => other.to_string(),
        Err(_) => "?".to_string(),
    }
}

fn render_list(heap: &Heap, mut cell: HeapAddr, depth: usize) -> String {
    let mut items = Vec::new();
    loop {
        if items.len() >= RENDER_LIMIT {
            return format!("[{}, ...]", items.join(", "));
        }
        items.push(render_at(heap, HeapAddr(cell.0 + 1), depth + 1));
        let tail = deref(heap, HeapAddr(cell.0 + 2));
        match heap.get(tail) {
            Ok(HeapObject::Structure { name, arity: 0 }) if name == "[]" => {
                return format!("[{}]", items.join(", "));
            }
            Ok(HeapObject::Structure { name, arity: 2 }) if name == "." => cell = tail,
            _ => {
                let rest = render_at(heap, tail, depth + 1);
                return format!("[{} | {}]", items.join(", "), rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use vmlab_common::{BufferSink, Fault};

    fn cons(heap: &mut Heap, head: HeapAddr, tail: HeapAddr) -> HeapAddr {
        let s = heap.allocate(HeapObject::Structure {
            name: ".".to_string(),
            arity: 2,
        });
        heap.allocate(HeapObject::heap_ref(head));
        heap.allocate(HeapObject::heap_ref(tail));
        s
    }

    #[test]
    fn render_proper_list() {
        let mut heap = Heap::new();
        let nil = heap.allocate(HeapObject::atom("[]"));
        let two = heap.allocate(HeapObject::basic(2));
        let one = heap.allocate(HeapObject::basic(1));
        let inner = cons(&mut heap, two, nil);
        let list = cons(&mut heap, one, inner);
        assert_eq!(render_term(&heap, list), "[1, 2]");
    }

    #[test]
    fn render_partial_list_and_variables() {
        let mut heap = Heap::new();
        let var = heap.allocate(HeapObject::heap_ref(HeapAddr(0)));
        let one = heap.allocate(HeapObject::basic(1));
        let list = cons(&mut heap, one, var);
        assert_eq!(render_term(&heap, list), "[1 | _G0]");
    }

    #[test]
    fn render_compound() {
        let mut heap = Heap::new();
        let s = heap.allocate(HeapObject::Structure {
            name: "point".to_string(),
            arity: 2,
        });
        heap.allocate(HeapObject::basic(3));
        heap.allocate(HeapObject::atom("origin"));
        assert_eq!(render_term(&heap, s), "point(3, origin)");
    }

    #[test]
    fn next_solution_without_choice_point_stays_stopped() {
        let mut vm = Vm::new(Program::new(vec![WimInstr::No])).unwrap();
        vm.set_output(Box::new(BufferSink::new()));
        vm.run().unwrap();
        assert!(!vm.is_running());

        let err = next_solution(&mut vm).unwrap_err();
        assert_eq!(err.cause, Fault::NoChoicePoint);
        assert!(!vm.is_running());
        assert_eq!(vm.pc(), 1);
    }
}
