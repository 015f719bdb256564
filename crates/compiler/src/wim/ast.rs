//! Abstract syntax of the logic source language.

use std::fmt;

use vmlab_vm::wim::{ClauseKey, Constant, Functor};

/// Name of the anonymous variable; every occurrence is a distinct variable.
pub const ANONYMOUS: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Atom(String),
    Int(i64),
    Var(String),
    Struct(String, Vec<Term>),
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn int(value: i64) -> Self {
        Term::Int(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn anonymous() -> Self {
        Term::Var(ANONYMOUS.to_string())
    }

    pub fn structure(name: impl Into<String>, args: impl IntoIterator<Item = Term>) -> Self {
        Term::Struct(name.into(), args.into_iter().collect())
    }

    /// The empty list `[]`.
    pub fn nil() -> Self {
        Term::atom("[]")
    }

    /// `[head | tail]`
    pub fn cons(head: Term, tail: Term) -> Self {
        Term::Struct(".".to_string(), vec![head, tail])
    }

    /// `[t1, ..., tn]`
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Self::list_with_tail(items, Term::nil())
    }

    /// `[t1, ..., tn | tail]`
    pub fn list_with_tail(items: impl IntoIterator<Item = Term>, tail: Term) -> Self {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |tail, head| Term::cons(head, tail))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Term::Var(name) if name == ANONYMOUS)
    }

    /// The atomic value of an atom, an integer or a structure without
    /// arguments.
    pub fn constant(&self) -> Option<Constant> {
        match self {
            Term::Atom(name) => Some(Constant::Atom(name.clone())),
            Term::Int(value) => Some(Constant::Int(*value)),
            Term::Struct(name, args) if args.is_empty() => Some(Constant::Atom(name.clone())),
            _ => None,
        }
    }

    /// Indexing key of a clause whose first head argument is this term.
    pub fn key(&self) -> ClauseKey {
        match self {
            Term::Var(_) => ClauseKey::Any,
            Term::Struct(name, args) if !args.is_empty() => {
                ClauseKey::Struct(Functor::new(name.clone(), args.len()))
            }
            other => other.constant().map_or(ClauseKey::Any, ClauseKey::Const),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) | Term::Var(name) => f.write_str(name),
            Term::Int(value) => write!(f, "{value}"),
            Term::Struct(name, args) if args.is_empty() => f.write_str(name),
            Term::Struct(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A call `p(t1, ..., tn)`; also the shape of a clause head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    pub name: String,
    pub args: Vec<Term>,
}

impl Goal {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = Term>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// The `name/arity` the goal calls.
    pub fn predicate(&self) -> Functor {
        Functor::new(self.name.clone(), self.args.len())
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Term::Struct(self.name.clone(), self.args.clone()))
    }
}

/// `head :- body`, or a fact when the body is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub head: Goal,
    pub body: Vec<Goal>,
}

impl Clause {
    pub fn fact(head: Goal) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }

    pub fn rule(head: Goal, body: impl IntoIterator<Item = Goal>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }
}

/// Clauses in textual order plus the query to answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicProgram {
    pub clauses: Vec<Clause>,
    pub query: Vec<Goal>,
}

impl LogicProgram {
    pub fn new(clauses: Vec<Clause>, query: Vec<Goal>) -> Self {
        Self { clauses, query }
    }
}
