//! Translation schemes for the MaMa.
//!
//! Three mutually recursive schemes produce code for an expression in an
//! address environment `env` at stack distance `sd` (the number of cells
//! the current function or closure has pushed above its base):
//!
//! - `code_v` leaves a reference to the value, in weak head normal form
//! - `code_b` leaves the basic value itself
//! - `code_c` leaves a reference to a closure computing the value, so the
//!   work is done at most once and only when demanded
//!
//! Variables are either locals, addressed relative to the stack distance,
//! or globals, addressed by position in the running code's globals vector.

use std::collections::HashMap;

use tracing::trace;
use vmlab_vm::mama::MamaInstr;
use vmlab_vm::Program;

use super::ast::Expr;
use crate::emit::Emitter;
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Relative stack address; `pushloc (sd - i)` reaches it.
    Local(i64),
    /// Index into the globals vector.
    Global(usize),
}

type Env = HashMap<String, Slot>;

pub(crate) struct Codegen {
    out: Emitter<MamaInstr>,
}

impl Codegen {
    pub(crate) fn new() -> Self {
        Self {
            out: Emitter::new(),
        }
    }

    pub(crate) fn program(mut self, expr: &Expr) -> Result<Program<MamaInstr>, CompileError> {
        self.code_v(expr, &Env::new(), 0)?;
        self.out.emit(MamaInstr::Halt);
        self.out.finish()
    }

    fn emit(&mut self, instruction: MamaInstr) {
        self.out.emit(instruction);
    }

    fn getvar(&mut self, name: &str, env: &Env, sd: i64) -> Result<(), CompileError> {
        match env.get(name) {
            Some(Slot::Local(i)) => self.emit(MamaInstr::Pushloc((sd - i) as usize)),
            Some(Slot::Global(j)) => self.emit(MamaInstr::Pushglob(*j)),
            None => {
                return Err(CompileError::UnboundVariable {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Push the free variables of a closure or function body and pack them
    /// into a globals vector. Returns the environment the body sees.
    fn globals(&mut self, free: &[String], env: &Env, sd: i64) -> Result<Env, CompileError> {
        let mut inner = Env::new();
        for (j, name) in free.iter().enumerate() {
            self.getvar(name, env, sd + j as i64)?;
            inner.insert(name.clone(), Slot::Global(j));
        }
        self.emit(MamaInstr::Mkvec(free.len()));
        Ok(inner)
    }

    // ---- Value scheme ----

    fn code_v(&mut self, expr: &Expr, env: &Env, sd: i64) -> Result<(), CompileError> {
        match expr {
            Expr::Int(value) => {
                self.emit(MamaInstr::Loadc(*value));
                self.emit(MamaInstr::Mkbasic);
            }
            Expr::Unary(..) | Expr::Binary(..) => {
                self.code_b(expr, env, sd)?;
                self.emit(MamaInstr::Mkbasic);
            }
            Expr::Var(name) => {
                self.getvar(name, env, sd)?;
                self.emit(MamaInstr::Eval);
            }
            Expr::If(cond, then, otherwise) => {
                let else_branch = self.out.fresh();
                let done = self.out.fresh();
                self.code_b(cond, env, sd)?;
                self.emit(MamaInstr::Jumpz(else_branch.clone()));
                self.code_v(then, env, sd)?;
                self.emit(MamaInstr::Jump(done.clone()));
                self.out.place(&else_branch)?;
                self.code_v(otherwise, env, sd)?;
                self.out.place(&done)?;
            }
            Expr::Let(name, value, body) => {
                self.code_c_named(value, name, env, sd)?;
                let mut inner = env.clone();
                inner.insert(name.clone(), Slot::Local(sd + 1));
                self.code_v(body, &inner, sd + 1)?;
                self.emit(MamaInstr::Slide(1));
            }
            Expr::LetRec(bindings, body) => {
                let n = bindings.len();
                let mut inner = env.clone();
                for (i, (name, _)) in bindings.iter().enumerate() {
                    inner.insert(name.clone(), Slot::Local(sd + i as i64 + 1));
                }
                self.emit(MamaInstr::Alloc(n));
                let sd = sd + n as i64;
                for (i, (name, value)) in bindings.iter().enumerate() {
                    self.code_c_named(value, name, &inner, sd)?;
                    self.emit(MamaInstr::Rewrite(n - i));
                }
                self.code_v(body, &inner, sd)?;
                self.emit(MamaInstr::Slide(n));
            }
            Expr::Fun(params, body) => self.function("fun", params, body, expr, env, sd)?,
            Expr::App(function, args) => self.application(function, args, env, sd)?,
            Expr::Nil => self.emit(MamaInstr::Nil),
            Expr::Cons(head, tail) => {
                self.code_c(head, env, sd)?;
                self.code_c(tail, env, sd + 1)?;
                self.emit(MamaInstr::Cons);
            }
            Expr::Match {
                scrutinee,
                nil,
                head,
                tail,
                cons,
            } => {
                let cons_branch = self.out.fresh();
                let done = self.out.fresh();
                self.code_v(scrutinee, env, sd)?;
                self.emit(MamaInstr::Pushloc(0));
                self.emit(MamaInstr::Isnil);
                self.emit(MamaInstr::Jumpz(cons_branch.clone()));
                self.code_v(nil, env, sd + 1)?;
                self.emit(MamaInstr::Slide(1));
                self.emit(MamaInstr::Jump(done.clone()));

                self.out.place(&cons_branch)?;
                self.emit(MamaInstr::Pushloc(0));
                self.emit(MamaInstr::Hd);
                self.emit(MamaInstr::Pushloc(1));
                self.emit(MamaInstr::Tl);
                let mut inner = env.clone();
                inner.insert(head.clone(), Slot::Local(sd + 2));
                inner.insert(tail.clone(), Slot::Local(sd + 3));
                self.code_v(cons, &inner, sd + 3)?;
                self.emit(MamaInstr::Slide(3));
                self.out.place(&done)?;
            }
        }
        Ok(())
    }

    fn function(
        &mut self,
        name: &str,
        params: &[String],
        body: &Expr,
        whole: &Expr,
        env: &Env,
        sd: i64,
    ) -> Result<(), CompileError> {
        let entry = self.out.fresh();
        let after = self.out.fresh();
        let mut inner = self.globals(&whole.free_vars(), env, sd)?;
        self.emit(MamaInstr::Mkfunval(entry.clone(), name.to_string()));
        self.emit(MamaInstr::Jump(after.clone()));

        self.out.place(&entry)?;
        let k = params.len();
        for (i, param) in params.iter().enumerate() {
            inner.insert(param.clone(), Slot::Local(-(i as i64)));
        }
        trace!(function = name, arity = k, "compiling function body");
        self.emit(MamaInstr::Targ(k));
        self.code_v(body, &inner, 0)?;
        self.emit(MamaInstr::Return(k));
        self.out.place(&after)
    }

    fn application(
        &mut self,
        function: &Expr,
        args: &[Expr],
        env: &Env,
        sd: i64,
    ) -> Result<(), CompileError> {
        if args.is_empty() {
            return self.code_v(function, env, sd);
        }
        let ret = self.out.fresh();
        self.emit(MamaInstr::Mark(ret.clone()));
        let mut depth = sd + 3;
        for arg in args.iter().rev() {
            self.code_c(arg, env, depth)?;
            depth += 1;
        }
        self.code_v(function, env, depth)?;
        self.emit(MamaInstr::Apply);
        self.out.place(&ret)
    }

    // ---- Basic scheme ----

    fn code_b(&mut self, expr: &Expr, env: &Env, sd: i64) -> Result<(), CompileError> {
        match expr {
            Expr::Int(value) => self.emit(MamaInstr::Loadc(*value)),
            Expr::Unary(op, operand) => {
                self.code_b(operand, env, sd)?;
                self.emit(MamaInstr::Opun(*op));
            }
            Expr::Binary(op, left, right) => {
                self.code_b(left, env, sd)?;
                self.code_b(right, env, sd + 1)?;
                self.emit(MamaInstr::Opbin(*op));
            }
            Expr::If(cond, then, otherwise) => {
                let else_branch = self.out.fresh();
                let done = self.out.fresh();
                self.code_b(cond, env, sd)?;
                self.emit(MamaInstr::Jumpz(else_branch.clone()));
                self.code_b(then, env, sd)?;
                self.emit(MamaInstr::Jump(done.clone()));
                self.out.place(&else_branch)?;
                self.code_b(otherwise, env, sd)?;
                self.out.place(&done)?;
            }
            _ => {
                self.code_v(expr, env, sd)?;
                self.emit(MamaInstr::Getbasic);
            }
        }
        Ok(())
    }

    // ---- Closure scheme ----

    fn code_c(&mut self, expr: &Expr, env: &Env, sd: i64) -> Result<(), CompileError> {
        self.code_c_named(expr, "fun", env, sd)
    }

    /// `code_c`, naming a function value after the variable it is bound to.
    fn code_c_named(
        &mut self,
        expr: &Expr,
        name: &str,
        env: &Env,
        sd: i64,
    ) -> Result<(), CompileError> {
        match expr {
            Expr::Int(value) => {
                self.emit(MamaInstr::Loadc(*value));
                self.emit(MamaInstr::Mkbasic);
                Ok(())
            }
            Expr::Var(var) => self.getvar(var, env, sd),
            Expr::Fun(params, body) => self.function(name, params, body, expr, env, sd),
            Expr::Nil => {
                self.emit(MamaInstr::Nil);
                Ok(())
            }
            _ => {
                let entry = self.out.fresh();
                let after = self.out.fresh();
                let inner = self.globals(&expr.free_vars(), env, sd)?;
                self.emit(MamaInstr::Mkclos(entry.clone()));
                self.emit(MamaInstr::Jump(after.clone()));
                self.out.place(&entry)?;
                self.code_v(expr, &inner, 0)?;
                self.emit(MamaInstr::Update);
                self.out.place(&after)
            }
        }
    }
}
