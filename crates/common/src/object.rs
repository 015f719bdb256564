//! The heap object model.
//!
//! Every stack and heap cell of every machine holds one [`HeapObject`]. The
//! variant set is closed: basic values, typed pointers, the functional
//! machine's closures / function values / vectors / list cells, and the
//! logic machine's structure headers.

use std::fmt;

use crate::address::{Address, CodeAddr, HeapAddr, StackAddr};
use crate::error::Fault;

/// A pointer into one of the machine's address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    Program(CodeAddr),
    Stack(StackAddr),
    Heap(HeapAddr),
    /// Points nowhere. Fresh stack cells are null pointers.
    Null,
}

impl Pointer {
    /// Register encoding: the index, or `-1` for [`Pointer::Null`].
    pub fn to_register(self) -> i64 {
        match self {
            Pointer::Program(a) => a.to_register(),
            Pointer::Stack(a) => a.to_register(),
            Pointer::Heap(a) => a.to_register(),
            Pointer::Null => -1,
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Program(a) => write!(f, "{a}"),
            Pointer::Stack(a) => write!(f, "{a}"),
            Pointer::Heap(a) => write!(f, "{a}"),
            Pointer::Null => f.write_str("null"),
        }
    }
}

/// A single memory cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapObject {
    /// An integer, optionally annotated for display.
    Basic { value: i64, note: Option<String> },
    Pointer(Pointer),
    /// A suspended computation. Both fields are `None` for the placeholders
    /// created by `alloc` until `rewrite` fills them in.
    Closure {
        code: Option<CodeAddr>,
        globals: Option<HeapAddr>,
    },
    /// A (possibly partially applied) function.
    FunVal {
        code: CodeAddr,
        args: HeapAddr,
        globals: HeapAddr,
    },
    Cons { head: HeapAddr, tail: HeapAddr },
    Nil,
    Vector(Vec<HeapAddr>),
    /// Header of a compound term, followed on the heap by `arity` argument
    /// cells. Atoms are structures of arity zero.
    Structure { name: String, arity: usize },
}

impl HeapObject {
    /// An unannotated basic value.
    pub fn basic(value: i64) -> Self {
        HeapObject::Basic { value, note: None }
    }

    /// The null pointer used to pad fresh stack cells.
    pub fn null() -> Self {
        HeapObject::Pointer(Pointer::Null)
    }

    pub fn heap_ref(addr: HeapAddr) -> Self {
        HeapObject::Pointer(Pointer::Heap(addr))
    }

    pub fn atom(name: impl Into<String>) -> Self {
        HeapObject::Structure {
            name: name.into(),
            arity: 0,
        }
    }

    /// Save a register holding a code address into a cell.
    pub fn code_cell(value: i64) -> Self {
        match CodeAddr::from_register(value) {
            Ok(a) => HeapObject::Pointer(Pointer::Program(a)),
            Err(_) => HeapObject::null(),
        }
    }

    /// Save a register holding a stack address into a cell.
    pub fn stack_cell(value: i64) -> Self {
        match StackAddr::from_register(value) {
            Ok(a) => HeapObject::Pointer(Pointer::Stack(a)),
            Err(_) => HeapObject::null(),
        }
    }

    /// Save a register holding a heap address into a cell.
    pub fn heap_cell(value: i64) -> Self {
        match HeapAddr::from_register(value) {
            Ok(a) => HeapObject::heap_ref(a),
            Err(_) => HeapObject::null(),
        }
    }

    /// Read a saved register back out of a cell.
    pub fn as_register(&self) -> Result<i64, Fault> {
        match self {
            HeapObject::Basic { value, .. } => Ok(*value),
            HeapObject::Pointer(p) => Ok(p.to_register()),
            other => Err(other.unexpected("saved register")),
        }
    }

    /// The value of a basic object.
    pub fn as_basic(&self) -> Result<i64, Fault> {
        match self {
            HeapObject::Basic { value, .. } => Ok(*value),
            other => Err(other.unexpected("basic value")),
        }
    }

    /// The target of a heap pointer.
    pub fn as_heap_ref(&self) -> Result<HeapAddr, Fault> {
        match self {
            HeapObject::Pointer(Pointer::Heap(a)) => Ok(*a),
            other => Err(other.unexpected("heap reference")),
        }
    }

    /// Short variant name used in fault messages.
    pub fn kind(&self) -> &'static str {
        match self {
            HeapObject::Basic { .. } => "basic value",
            HeapObject::Pointer(Pointer::Null) => "null pointer",
            HeapObject::Pointer(Pointer::Program(_)) => "code pointer",
            HeapObject::Pointer(Pointer::Stack(_)) => "stack pointer",
            HeapObject::Pointer(Pointer::Heap(_)) => "heap reference",
            HeapObject::Closure { .. } => "closure",
            HeapObject::FunVal { .. } => "function value",
            HeapObject::Cons { .. } => "cons cell",
            HeapObject::Nil => "nil",
            HeapObject::Vector(_) => "vector",
            HeapObject::Structure { .. } => "structure",
        }
    }

    /// Build the fault for finding `self` where `expected` was required.
    pub fn unexpected(&self, expected: &'static str) -> Fault {
        Fault::UnexpectedObject {
            expected,
            found: self.kind(),
        }
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapObject::Basic { value, note: None } => write!(f, "B {value}"),
            HeapObject::Basic {
                value,
                note: Some(note),
            } => write!(f, "B {value} ({note})"),
            HeapObject::Pointer(p) => write!(f, "-> {p}"),
            HeapObject::Closure {
                code: Some(code),
                globals: Some(gp),
            } => write!(f, "C {code} {gp}"),
            HeapObject::Closure { .. } => f.write_str("C ?"),
            HeapObject::FunVal {
                code,
                args,
                globals,
            } => write!(f, "F {code} {args} {globals}"),
            HeapObject::Cons { head, tail } => write!(f, "L {head} {tail}"),
            HeapObject::Nil => f.write_str("L []"),
            HeapObject::Vector(items) => {
                f.write_str("V [")?;
                for (i, a) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str("]")
            }
            HeapObject::Structure { name, arity } => write!(f, "S {name}/{arity}"),
        }
    }
}
