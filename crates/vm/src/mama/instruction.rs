//! The MaMa instruction set.

use std::fmt;

use vmlab_common::{Fault, Label, RegisterSpec};

use crate::machine::Vm;
use crate::program::Instruction;

/// Binary operators of `opbin`. Comparisons and connectives yield `1` / `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

/// All binary operators, in declaration order.
pub const ALL_BIN_OPS: [BinOp; 12] = [
    BinOp::Add,
    BinOp::Sub,
    BinOp::Mul,
    BinOp::Div,
    BinOp::Eq,
    BinOp::Neq,
    BinOp::Gt,
    BinOp::Ge,
    BinOp::Lt,
    BinOp::Le,
    BinOp::And,
    BinOp::Or,
];

impl BinOp {
    /// Canonical assembly spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    /// Parse the canonical spelling or its mathematical alternative.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "×" => BinOp::Mul,
            "÷" => BinOp::Div,
            "=" => BinOp::Eq,
            "≠" => BinOp::Neq,
            "≥" => BinOp::Ge,
            "≤" => BinOp::Le,
            "∧" => BinOp::And,
            "∨" => BinOp::Or,
            other => return ALL_BIN_OPS.iter().copied().find(|op| op.symbol() == other),
        };
        Some(op)
    }

    pub fn apply(self, a: i64, b: i64) -> Result<i64, Fault> {
        let truth = |cond: bool| i64::from(cond);
        Ok(match self {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div => {
                if b == 0 {
                    return Err(Fault::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            BinOp::Eq => truth(a == b),
            BinOp::Neq => truth(a != b),
            BinOp::Gt => truth(a > b),
            BinOp::Ge => truth(a >= b),
            BinOp::Lt => truth(a < b),
            BinOp::Le => truth(a <= b),
            BinOp::And => truth(a != 0 && b != 0),
            BinOp::Or => truth(a != 0 || b != 0),
        })
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators of `opun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    Neg,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" | "¬" | "not" => Some(UnOp::Not),
            "-" | "neg" => Some(UnOp::Neg),
            _ => None,
        }
    }

    pub fn apply(self, v: i64) -> i64 {
        match self {
            UnOp::Not => i64::from(v == 0),
            UnOp::Neg => v.wrapping_neg(),
        }
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One MaMa instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MamaInstr {
    /// Push basic value `q`.
    Loadc(i64),
    /// Box the basic value on top into a heap object.
    Mkbasic,
    /// Unbox the heap basic value referenced by the top.
    Getbasic,
    Opbin(BinOp),
    Opun(UnOp),
    Jump(Label),
    /// Pop a basic value, jump when it is zero.
    Jumpz(Label),
    /// Push a copy of the cell `j` below the top.
    Pushloc(usize),
    /// Push element `j` of the current global vector.
    Pushglob(usize),
    /// Drop `m` cells under the top.
    Slide(usize),
    /// Pack the top `n` references into a vector.
    Mkvec(usize),
    Mkclos(Label),
    /// Build a function value; the name is for diagnostics only.
    Mkfunval(Label, String),
    /// Open a call frame returning to the label.
    Mark(Label),
    Apply,
    /// Test for at least `n` arguments, else build a partial application.
    Targ(usize),
    Return(usize),
    Eval,
    Update,
    Rewrite(usize),
    /// Push `n` placeholder closures for `letrec`.
    Alloc(usize),
    Cons,
    Nil,
    Hd,
    Tl,
    Isnil,
    Halt,
}

/// Every mnemonic of the instruction set.
pub const MNEMONICS: [&str; 27] = [
    "loadc", "mkbasic", "getbasic", "opbin", "opun", "jump", "jumpz", "pushloc", "pushglob",
    "slide", "mkvec", "mkclos", "mkfunval", "mark", "apply", "targ", "return", "eval", "update",
    "rewrite", "alloc", "cons", "nil", "hd", "tl", "isnil", "halt",
];

impl Instruction for MamaInstr {
    const EXTRA_REGISTERS: &'static [RegisterSpec] = &[RegisterSpec::new("gp", -1)];

    fn mnemonic(&self) -> &'static str {
        match self {
            MamaInstr::Loadc(_) => "loadc",
            MamaInstr::Mkbasic => "mkbasic",
            MamaInstr::Getbasic => "getbasic",
            MamaInstr::Opbin(_) => "opbin",
            MamaInstr::Opun(_) => "opun",
            MamaInstr::Jump(_) => "jump",
            MamaInstr::Jumpz(_) => "jumpz",
            MamaInstr::Pushloc(_) => "pushloc",
            MamaInstr::Pushglob(_) => "pushglob",
            MamaInstr::Slide(_) => "slide",
            MamaInstr::Mkvec(_) => "mkvec",
            MamaInstr::Mkclos(_) => "mkclos",
            MamaInstr::Mkfunval(..) => "mkfunval",
            MamaInstr::Mark(_) => "mark",
            MamaInstr::Apply => "apply",
            MamaInstr::Targ(_) => "targ",
            MamaInstr::Return(_) => "return",
            MamaInstr::Eval => "eval",
            MamaInstr::Update => "update",
            MamaInstr::Rewrite(_) => "rewrite",
            MamaInstr::Alloc(_) => "alloc",
            MamaInstr::Cons => "cons",
            MamaInstr::Nil => "nil",
            MamaInstr::Hd => "hd",
            MamaInstr::Tl => "tl",
            MamaInstr::Isnil => "isnil",
            MamaInstr::Halt => "halt",
        }
    }

    fn param(&self) -> Option<String> {
        match self {
            MamaInstr::Loadc(q) => Some(q.to_string()),
            MamaInstr::Opbin(op) => Some(op.to_string()),
            MamaInstr::Opun(op) => Some(op.to_string()),
            MamaInstr::Jump(l) | MamaInstr::Jumpz(l) | MamaInstr::Mkclos(l) | MamaInstr::Mark(l) => {
                Some(l.to_string())
            }
            MamaInstr::Mkfunval(l, name) => Some(format!("{l} {name}")),
            MamaInstr::Pushloc(n)
            | MamaInstr::Pushglob(n)
            | MamaInstr::Slide(n)
            | MamaInstr::Mkvec(n)
            | MamaInstr::Targ(n)
            | MamaInstr::Return(n)
            | MamaInstr::Rewrite(n)
            | MamaInstr::Alloc(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn labels(&self) -> Vec<&Label> {
        match self {
            MamaInstr::Jump(l)
            | MamaInstr::Jumpz(l)
            | MamaInstr::Mkclos(l)
            | MamaInstr::Mkfunval(l, _)
            | MamaInstr::Mark(l) => vec![l],
            _ => Vec::new(),
        }
    }

    fn labels_mut(&mut self) -> Vec<&mut Label> {
        match self {
            MamaInstr::Jump(l)
            | MamaInstr::Jumpz(l)
            | MamaInstr::Mkclos(l)
            | MamaInstr::Mkfunval(l, _)
            | MamaInstr::Mark(l) => vec![l],
            _ => Vec::new(),
        }
    }

    fn execute(&self, vm: &mut Vm<Self>) -> Result<(), Fault> {
        match self {
            // Basic values
            MamaInstr::Loadc(q) => vm.exec_loadc(*q),
            MamaInstr::Mkbasic => vm.exec_mkbasic(),
            MamaInstr::Getbasic => vm.exec_getbasic(),
            MamaInstr::Opbin(op) => vm.exec_opbin(*op),
            MamaInstr::Opun(op) => vm.exec_opun(*op),
            MamaInstr::Jump(l) => vm.exec_jump(l),
            MamaInstr::Jumpz(l) => vm.exec_jumpz(l),

            // Variables
            MamaInstr::Pushloc(j) => vm.exec_pushloc(*j),
            MamaInstr::Pushglob(j) => vm.exec_pushglob(*j),
            MamaInstr::Slide(m) => vm.exec_slide(*m),

            // Closures and functions
            MamaInstr::Mkvec(n) => vm.exec_mkvec(*n),
            MamaInstr::Mkclos(l) => vm.exec_mkclos(l),
            MamaInstr::Mkfunval(l, name) => vm.exec_mkfunval(l, name),
            MamaInstr::Mark(l) => vm.exec_mark(l),
            MamaInstr::Apply => vm.exec_apply(),
            MamaInstr::Targ(n) => vm.exec_targ(*n),
            MamaInstr::Return(n) => vm.exec_return(*n),
            MamaInstr::Eval => vm.exec_eval(),
            MamaInstr::Update => vm.exec_update(),
            MamaInstr::Rewrite(m) => vm.exec_rewrite(*m),
            MamaInstr::Alloc(n) => vm.exec_alloc(*n),

            // Lists
            MamaInstr::Cons => vm.exec_cons(),
            MamaInstr::Nil => vm.exec_nil(),
            MamaInstr::Hd => vm.exec_hd(),
            MamaInstr::Tl => vm.exec_tl(),
            MamaInstr::Isnil => vm.exec_isnil(),

            MamaInstr::Halt => {
                vm.stop();
                Ok(())
            }
        }
    }
}

impl fmt::Display for MamaInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
