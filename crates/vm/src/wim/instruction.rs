//! The WiM instruction set.

use std::fmt;

use vmlab_common::{Fault, HeapObject, Label, RegisterSpec};

use super::{MODE_READ, MODE_WRITE};
use crate::machine::Vm;
use crate::program::Instruction;

/// An atomic term: an integer or a named atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i64),
    Atom(String),
}

impl Constant {
    /// Integers when the text parses as one, atoms otherwise. `'text'` is
    /// always an atom.
    pub fn parse(text: &str) -> Self {
        if let Some(name) = unquote(text) {
            return Constant::Atom(name.to_string());
        }
        text.parse()
            .map(Constant::Int)
            .unwrap_or_else(|_| Constant::Atom(text.to_string()))
    }

    pub fn to_object(&self) -> HeapObject {
        match self {
            Constant::Int(v) => HeapObject::basic(*v),
            Constant::Atom(name) => HeapObject::atom(name.clone()),
        }
    }

    /// Whether a heap cell holds exactly this constant.
    pub fn matches(&self, object: &HeapObject) -> bool {
        match (self, object) {
            (Constant::Int(v), HeapObject::Basic { value, .. }) => v == value,
            (Constant::Atom(name), HeapObject::Structure { name: n, arity: 0 }) => name == n,
            _ => false,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Atom(name) if needs_quotes(name) => write!(f, "'{name}'"),
            Constant::Atom(name) => f.write_str(name),
        }
    }
}

/// Atom names that would read back as something else unless quoted.
fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name == "_"
        || name.starts_with('\'')
        || name.contains('/')
        || name.parse::<i64>().is_ok()
}

fn unquote(text: &str) -> Option<&str> {
    text.strip_prefix('\'')?.strip_suffix('\'')
}

/// A function symbol with its arity, written `name/arity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Functor {
    pub name: String,
    pub arity: usize,
}

impl Functor {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// Parse `name/arity`, splitting at the last slash.
    pub fn parse(text: &str) -> Option<Self> {
        let (name, arity) = text.rsplit_once('/')?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, arity.parse().ok()?))
    }
}

impl fmt::Display for Functor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Principal functor of a clause's first head argument, used to skip
/// alternatives that cannot match the current call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClauseKey {
    /// A variable first argument, or no arguments at all: always viable.
    Any,
    Const(Constant),
    Struct(Functor),
}

impl ClauseKey {
    pub fn parse(text: &str) -> Self {
        if text == "_" {
            return ClauseKey::Any;
        }
        if unquote(text).is_some() {
            return ClauseKey::Const(Constant::parse(text));
        }
        match Functor::parse(text) {
            Some(f) if f.arity > 0 => ClauseKey::Struct(f),
            _ => ClauseKey::Const(Constant::parse(text)),
        }
    }

    /// Whether a clause with this key can match a bound first argument.
    pub fn admits(&self, object: &HeapObject) -> bool {
        match (self, object) {
            (ClauseKey::Any, _) => true,
            (ClauseKey::Const(c), obj) => c.matches(obj),
            (ClauseKey::Struct(f), HeapObject::Structure { name, arity }) => {
                f.name == *name && f.arity == *arity
            }
            _ => false,
        }
    }
}

impl fmt::Display for ClauseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseKey::Any => f.write_str("_"),
            ClauseKey::Const(c) => write!(f, "{c}"),
            ClauseKey::Struct(functor) => write!(f, "{functor}"),
        }
    }
}

/// One WiM instruction. Variable slots are numbered from 1, arguments first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WimInstr {
    /// Build the query frame; the label is where exhausted search ends up.
    Init(Label),
    /// Size the current frame to `m` cells (organisational cells included).
    Pushenv(usize),
    Popenv,
    /// Reserve organisational cells for the next call.
    Enter,
    /// Call the predicate at the label with `n` arguments on the stack.
    Call(Label, usize),
    Putatom(Constant),
    Putvar(usize),
    Putref(usize),
    Putstruct(Functor),
    Uatom(Constant),
    Uvar(usize),
    Uref(usize),
    Ustruct(Functor),
    Down,
    Brother,
    Up,
    Setbtp,
    Nextalt(Label, ClauseKey),
    Delbtp,
    /// Report the named query variables and stop.
    Halt(Vec<String>),
    /// Report failure and stop.
    No,
}

/// Every mnemonic of the instruction set.
pub const MNEMONICS: [&str; 21] = [
    "init", "pushenv", "popenv", "enter", "call", "putatom", "putvar", "putref", "putstruct",
    "uatom", "uvar", "uref", "ustruct", "down", "brother", "up", "setbtp", "nextalt", "delbtp",
    "halt", "no",
];

impl Instruction for WimInstr {
    const EXTRA_REGISTERS: &'static [RegisterSpec] = &[
        RegisterSpec::new("btp", -1),
        RegisterSpec::new("hp", -1),
        RegisterSpec::new("tp", -1),
        RegisterSpec::new("mode", MODE_READ)
            .with_display(&[(MODE_READ, "read"), (MODE_WRITE, "write")]),
    ];

    fn mnemonic(&self) -> &'static str {
        match self {
            WimInstr::Init(_) => "init",
            WimInstr::Pushenv(_) => "pushenv",
            WimInstr::Popenv => "popenv",
            WimInstr::Enter => "enter",
            WimInstr::Call(..) => "call",
            WimInstr::Putatom(_) => "putatom",
            WimInstr::Putvar(_) => "putvar",
            WimInstr::Putref(_) => "putref",
            WimInstr::Putstruct(_) => "putstruct",
            WimInstr::Uatom(_) => "uatom",
            WimInstr::Uvar(_) => "uvar",
            WimInstr::Uref(_) => "uref",
            WimInstr::Ustruct(_) => "ustruct",
            WimInstr::Down => "down",
            WimInstr::Brother => "brother",
            WimInstr::Up => "up",
            WimInstr::Setbtp => "setbtp",
            WimInstr::Nextalt(..) => "nextalt",
            WimInstr::Delbtp => "delbtp",
            WimInstr::Halt(_) => "halt",
            WimInstr::No => "no",
        }
    }

    fn param(&self) -> Option<String> {
        match self {
            WimInstr::Init(l) => Some(l.to_string()),
            WimInstr::Call(l, n) => {
                // `call append/3` when the label already spells out the arity.
                if l.name().ends_with(&format!("/{n}")) {
                    Some(l.to_string())
                } else {
                    Some(format!("{l} {n}"))
                }
            }
            WimInstr::Pushenv(n)
            | WimInstr::Putvar(n)
            | WimInstr::Putref(n)
            | WimInstr::Uvar(n)
            | WimInstr::Uref(n) => Some(n.to_string()),
            WimInstr::Putatom(c) | WimInstr::Uatom(c) => Some(c.to_string()),
            WimInstr::Putstruct(f) | WimInstr::Ustruct(f) => Some(f.to_string()),
            WimInstr::Nextalt(l, key) => Some(format!("{l} {key}")),
            WimInstr::Halt(names) if !names.is_empty() => Some(names.join(" ")),
            _ => None,
        }
    }

    fn labels(&self) -> Vec<&Label> {
        match self {
            WimInstr::Init(l) | WimInstr::Call(l, _) | WimInstr::Nextalt(l, _) => vec![l],
            _ => Vec::new(),
        }
    }

    fn labels_mut(&mut self) -> Vec<&mut Label> {
        match self {
            WimInstr::Init(l) | WimInstr::Call(l, _) | WimInstr::Nextalt(l, _) => vec![l],
            _ => Vec::new(),
        }
    }

    fn execute(&self, vm: &mut Vm<Self>) -> Result<(), Fault> {
        match self {
            // Frames and control
            WimInstr::Init(l) => vm.exec_init(l),
            WimInstr::Pushenv(m) => vm.exec_pushenv(*m),
            WimInstr::Popenv => vm.exec_popenv(),
            WimInstr::Enter => vm.exec_enter(),
            WimInstr::Call(l, n) => vm.exec_call(l, *n),

            // Argument construction
            WimInstr::Putatom(c) => vm.exec_putatom(c),
            WimInstr::Putvar(i) => vm.exec_putvar(*i),
            WimInstr::Putref(i) => vm.exec_putref(*i),
            WimInstr::Putstruct(f) => vm.exec_putstruct(f),

            // Head unification
            WimInstr::Uatom(c) => vm.exec_uatom(c),
            WimInstr::Uvar(i) => vm.exec_uvar(*i),
            WimInstr::Uref(i) => vm.exec_uref(*i),
            WimInstr::Ustruct(f) => vm.exec_ustruct(f),
            WimInstr::Down => vm.exec_down(),
            WimInstr::Brother => vm.exec_brother(),
            WimInstr::Up => vm.exec_up(),

            // Choice points
            WimInstr::Setbtp => vm.exec_setbtp(),
            WimInstr::Nextalt(l, key) => vm.exec_nextalt(l, key),
            WimInstr::Delbtp => vm.exec_delbtp(),

            WimInstr::Halt(names) => vm.exec_halt(names),
            WimInstr::No => vm.exec_no(),
        }
    }
}

impl fmt::Display for WimInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
