//! Translation of clauses, predicates and the query into WiM code.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use vmlab_common::Label;
use vmlab_vm::wim::{ClauseKey, Functor, WimInstr, ORG};
use vmlab_vm::Program;

use super::ast::{Clause, Goal, LogicProgram, Term, ANONYMOUS};
use crate::emit::Emitter;
use crate::error::CompileError;

/// Slot assignment of one clause or of the query.
///
/// Slots are numbered from 1. The first `reserved` slots belong to the
/// clause's arguments; variables get the following slots in order of first
/// occurrence.
struct VarTable {
    slots: HashMap<String, usize>,
    initialized: HashSet<usize>,
    next: usize,
}

/// How a variable occurrence has to be compiled.
enum Occurrence {
    First(usize),
    Later(usize),
}

impl VarTable {
    fn new(reserved: usize) -> Self {
        Self {
            slots: HashMap::new(),
            initialized: HashSet::new(),
            next: reserved + 1,
        }
    }

    /// A table with `names` pre-assigned to slots `1..=names.len()`.
    fn with_names(names: &[String]) -> Self {
        let mut table = Self::new(0);
        for name in names {
            table.slots.insert(name.clone(), table.next);
            table.next += 1;
        }
        table
    }

    fn fresh(&mut self) -> usize {
        let slot = self.next;
        self.next += 1;
        slot
    }

    fn occurrence(&mut self, name: &str) -> Occurrence {
        let slot = if name == ANONYMOUS {
            self.fresh()
        } else if let Some(slot) = self.slots.get(name) {
            *slot
        } else {
            let slot = self.fresh();
            self.slots.insert(name.to_string(), slot);
            slot
        };
        if self.initialized.insert(slot) {
            Occurrence::First(slot)
        } else {
            Occurrence::Later(slot)
        }
    }

    /// Slots in use, arguments included.
    fn used(&self) -> usize {
        self.next - 1
    }
}

pub(crate) struct Codegen {
    out: Emitter<WimInstr>,
}

impl Codegen {
    pub(crate) fn new() -> Self {
        Self {
            out: Emitter::new(),
        }
    }

    fn emit(&mut self, instruction: WimInstr) {
        self.out.emit(instruction);
    }

    pub(crate) fn program(
        mut self,
        source: &LogicProgram,
    ) -> Result<Program<WimInstr>, CompileError> {
        self.query(&source.query)?;
        for (predicate, clauses) in group_predicates(&source.clauses) {
            debug!(%predicate, clauses = clauses.len(), "compiling predicate");
            self.predicate(&predicate, &clauses)?;
        }
        self.out.finish()
    }

    /// `init fail; pushenv; goals; halt names; fail: no`
    fn query(&mut self, goals: &[Goal]) -> Result<(), CompileError> {
        let names = query_variables(goals);
        let mut vars = VarTable::with_names(&names);
        let fail = self.out.fresh();
        self.emit(WimInstr::Init(fail.clone()));
        let pushenv = self.out.emit(WimInstr::Pushenv(0));
        for goal in goals {
            self.goal(goal, &mut vars);
        }
        self.out.patch(pushenv, WimInstr::Pushenv(ORG as usize + vars.used()));
        self.emit(WimInstr::Halt(names));
        self.out.place(&fail)?;
        self.emit(WimInstr::No);
        Ok(())
    }

    /// All clauses of `name/arity`, chained through choice point
    /// instructions when there is more than one.
    fn predicate(
        &mut self,
        predicate: &Functor,
        clauses: &[&Clause],
    ) -> Result<(), CompileError> {
        self.out.place(&Label::new(predicate.to_string()))?;
        let (first, last) = match clauses {
            [] => return Ok(()),
            [only] => {
                self.clause(only);
                return Ok(());
            }
            [first, .., last] => (first, last),
        };

        self.emit(WimInstr::Setbtp);
        let mut alternative = self.out.fresh();
        self.emit(WimInstr::Nextalt(alternative.clone(), clause_key(clauses[1])));
        self.clause(first);
        for pair in clauses.windows(2).skip(1) {
            self.out.place(&alternative)?;
            alternative = self.out.fresh();
            self.emit(WimInstr::Nextalt(alternative.clone(), clause_key(pair[1])));
            self.clause(pair[0]);
        }
        self.out.place(&alternative)?;
        self.emit(WimInstr::Delbtp);
        self.clause(last);
        Ok(())
    }

    /// `pushenv m; (putref i; code_U t_i)*; goals; popenv`
    fn clause(&mut self, clause: &Clause) {
        let arity = clause.head.args.len();
        let mut vars = VarTable::new(arity);
        let pushenv = self.out.emit(WimInstr::Pushenv(0));
        for (i, arg) in clause.head.args.iter().enumerate() {
            self.emit(WimInstr::Putref(i + 1));
            self.unify(arg, &mut vars);
        }
        for goal in &clause.body {
            self.goal(goal, &mut vars);
        }
        self.emit(WimInstr::Popenv);
        self.out.patch(pushenv, WimInstr::Pushenv(ORG as usize + vars.used()));
    }

    /// `enter; code_A args; call p/n`
    fn goal(&mut self, goal: &Goal, vars: &mut VarTable) {
        self.emit(WimInstr::Enter);
        for arg in &goal.args {
            self.argument(arg, vars);
        }
        let predicate = goal.predicate();
        self.emit(WimInstr::Call(Label::new(predicate.to_string()), predicate.arity));
    }

    /// Build `term` on the heap and push a reference to it.
    fn argument(&mut self, term: &Term, vars: &mut VarTable) {
        if let Some(c) = term.constant() {
            self.emit(WimInstr::Putatom(c));
            return;
        }
        match term {
            Term::Var(name) => match vars.occurrence(name) {
                Occurrence::First(slot) => self.emit(WimInstr::Putvar(slot)),
                Occurrence::Later(slot) => self.emit(WimInstr::Putref(slot)),
            },
            Term::Struct(name, args) => {
                for arg in args {
                    self.argument(arg, vars);
                }
                self.emit(WimInstr::Putstruct(Functor::new(name.clone(), args.len())));
            }
            Term::Atom(_) | Term::Int(_) => {}
        }
    }

    /// Unify the term referenced by the top of the stack with `term`,
    /// consuming the reference.
    fn unify(&mut self, term: &Term, vars: &mut VarTable) {
        if let Some(c) = term.constant() {
            self.emit(WimInstr::Uatom(c));
            return;
        }
        match term {
            Term::Var(name) => match vars.occurrence(name) {
                Occurrence::First(slot) => self.emit(WimInstr::Uvar(slot)),
                Occurrence::Later(slot) => self.emit(WimInstr::Uref(slot)),
            },
            Term::Struct(name, args) => {
                self.emit(WimInstr::Ustruct(Functor::new(name.clone(), args.len())));
                self.emit(WimInstr::Down);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.emit(WimInstr::Brother);
                    }
                    self.unify(arg, vars);
                }
                self.emit(WimInstr::Up);
            }
            Term::Atom(_) | Term::Int(_) => {}
        }
    }
}

fn clause_key(clause: &Clause) -> ClauseKey {
    clause.head.args.first().map_or(ClauseKey::Any, Term::key)
}

/// Clauses grouped by `name/arity`, groups ordered by first appearance.
fn group_predicates(clauses: &[Clause]) -> Vec<(Functor, Vec<&Clause>)> {
    let mut groups: Vec<(Functor, Vec<&Clause>)> = Vec::new();
    for clause in clauses {
        let predicate = clause.head.predicate();
        match groups.iter_mut().find(|(p, _)| *p == predicate) {
            Some((_, members)) => members.push(clause),
            None => groups.push((predicate, vec![clause])),
        }
    }
    groups
}

/// Named variables of the query in order of first occurrence.
fn query_variables(goals: &[Goal]) -> Vec<String> {
    fn visit(term: &Term, names: &mut Vec<String>) {
        match term {
            Term::Var(name) if name != ANONYMOUS => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Term::Struct(_, args) => args.iter().for_each(|arg| visit(arg, names)),
            _ => {}
        }
    }
    let mut names = Vec::new();
    for goal in goals {
        for arg in &goal.args {
            visit(arg, &mut names);
        }
    }
    names
}
