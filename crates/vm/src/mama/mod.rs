//! The MaMa: a lazy functional abstract machine.
//!
//! Expressions are evaluated by graph reduction. Arguments and `let`
//! bindings are passed as closures (suspended computations) that `eval`
//! runs on first use; `update` then overwrites the closure with its value so
//! that every later use shares the result. Functions are curried: `targ`
//! turns an under-applied call into a partial application, and `return`
//! feeds surplus arguments to the function a call produced.
//!
//! Registers: `pc`, `status`, `sp`, `fp` and the global pointer `gp`, which
//! references the vector of free variables of the running code.

mod execute;
mod instruction;

pub use instruction::{BinOp, MamaInstr, UnOp, ALL_BIN_OPS, MNEMONICS};

use vmlab_common::{Fault, Heap, HeapAddr, HeapObject, Pointer, RegId};

use crate::machine::Vm;

/// Global pointer.
pub const GP: RegId = RegId(4);

/// Lists longer than this are cut off when rendered.
const RENDER_LIMIT: usize = 64;

/// Render the value referenced by the top of the stack.
pub fn result(vm: &Vm<MamaInstr>) -> Result<String, Fault> {
    match vm.top()? {
        HeapObject::Pointer(Pointer::Heap(addr)) => Ok(render_value(vm.heap(), *addr)),
        HeapObject::Basic { value, .. } => Ok(value.to_string()),
        other => Err(other.unexpected("heap reference")),
    }
}

/// Render a heap value for display.
///
/// Evaluated parts of lists are shown element by element; anything still
/// suspended is shown as `<thunk>`.
pub fn render_value(heap: &Heap, addr: HeapAddr) -> String {
    render_at(heap, addr, 0)
}

fn render_at(heap: &Heap, addr: HeapAddr, depth: usize) -> String {
    if depth > RENDER_LIMIT {
        return "...".to_string();
    }
    match heap.get(addr) {
        Ok(HeapObject::Basic { value, .. }) => value.to_string(),
        Ok(HeapObject::Nil) => "[]".to_string(),
        Ok(HeapObject::Cons { head, tail }) => render_list(heap, *head, *tail, depth),
        Ok(HeapObject::Closure { .. }) => "<thunk>".to_string(),
        Ok(HeapObject::FunVal { .. }) => "<fun>".to_string(),
        Ok(other) => other.to_string(),
        Err(_) => "?".to_string(),
    }
}

fn render_list(heap: &Heap, head: HeapAddr, tail: HeapAddr, depth: usize) -> String {
    let mut items = vec![render_at(heap, head, depth + 1)];
    let mut rest = tail;
    loop {
        if items.len() >= RENDER_LIMIT {
            return format!("[{}, ...]", items.join(", "));
        }
        match heap.get(rest) {
            Ok(HeapObject::Nil) => return format!("[{}]", items.join(", ")),
            Ok(HeapObject::Cons { head, tail }) => {
                items.push(render_at(heap, *head, depth + 1));
                rest = *tail;
            }
            _ => {
                let tail = render_at(heap, rest, depth + 1);
                return format!("[{} | {}]", items.join(", "), tail);
            }
        }
    }
}
