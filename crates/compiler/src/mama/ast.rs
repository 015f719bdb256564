//! Abstract syntax of the functional source language.

use vmlab_vm::mama::{BinOp, UnOp};

/// An expression. Functions are curried and every binding is lazy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Var(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `let x = e1 in e0`
    Let(String, Box<Expr>, Box<Expr>),
    /// `letrec x1 = e1 and ... and xn = en in e0`; every `xi` is visible in
    /// every `ei`.
    LetRec(Vec<(String, Expr)>, Box<Expr>),
    /// `fun x1 ... xk -> body`
    Fun(Vec<String>, Box<Expr>),
    /// `f e1 ... em`
    App(Box<Expr>, Vec<Expr>),
    Nil,
    Cons(Box<Expr>, Box<Expr>),
    /// `match e with [] -> nil | head :: tail -> cons`
    Match {
        scrutinee: Box<Expr>,
        nil: Box<Expr>,
        head: String,
        tail: String,
        cons: Box<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn unary(op: UnOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn if_then_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::If(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Expr::Let(name.into(), Box::new(value), Box::new(body))
    }

    pub fn letrec<N: Into<String>>(
        bindings: impl IntoIterator<Item = (N, Expr)>,
        body: Expr,
    ) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Expr::LetRec(bindings, Box::new(body))
    }

    pub fn fun<N: Into<String>>(params: impl IntoIterator<Item = N>, body: Expr) -> Self {
        Expr::Fun(params.into_iter().map(Into::into).collect(), Box::new(body))
    }

    pub fn app(function: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::App(Box::new(function), args.into_iter().collect())
    }

    pub fn cons(head: Expr, tail: Expr) -> Self {
        Expr::Cons(Box::new(head), Box::new(tail))
    }

    /// A proper list of the given elements.
    pub fn list(items: impl IntoIterator<Item = Expr>) -> Self {
        let items: Vec<Expr> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Expr::Nil, |tail, head| Expr::cons(head, tail))
    }

    pub fn match_list(
        scrutinee: Expr,
        nil: Expr,
        head: impl Into<String>,
        tail: impl Into<String>,
        cons: Expr,
    ) -> Self {
        Expr::Match {
            scrutinee: Box::new(scrutinee),
            nil: Box::new(nil),
            head: head.into(),
            tail: tail.into(),
            cons: Box::new(cons),
        }
    }

    /// Free variables in order of first occurrence.
    pub fn free_vars(&self) -> Vec<String> {
        let mut free = Vec::new();
        self.collect_free(&mut Vec::new(), &mut free);
        free
    }

    fn collect_free(&self, bound: &mut Vec<String>, free: &mut Vec<String>) {
        match self {
            Expr::Int(_) | Expr::Nil => {}
            Expr::Var(name) => {
                if !bound.contains(name) && !free.contains(name) {
                    free.push(name.clone());
                }
            }
            Expr::Unary(_, e) => e.collect_free(bound, free),
            Expr::Binary(_, a, b) | Expr::Cons(a, b) => {
                a.collect_free(bound, free);
                b.collect_free(bound, free);
            }
            Expr::If(c, t, e) => {
                c.collect_free(bound, free);
                t.collect_free(bound, free);
                e.collect_free(bound, free);
            }
            Expr::Let(name, value, body) => {
                value.collect_free(bound, free);
                with_bound(bound, [name], |bound| body.collect_free(bound, free));
            }
            Expr::LetRec(bindings, body) => {
                with_bound(bound, bindings.iter().map(|(n, _)| n), |bound| {
                    for (_, value) in bindings {
                        value.collect_free(bound, free);
                    }
                    body.collect_free(bound, free);
                });
            }
            Expr::Fun(params, body) => {
                with_bound(bound, params, |bound| body.collect_free(bound, free));
            }
            Expr::App(f, args) => {
                f.collect_free(bound, free);
                for arg in args {
                    arg.collect_free(bound, free);
                }
            }
            Expr::Match {
                scrutinee,
                nil,
                head,
                tail,
                cons,
            } => {
                scrutinee.collect_free(bound, free);
                nil.collect_free(bound, free);
                with_bound(bound, [head, tail], |bound| cons.collect_free(bound, free));
            }
        }
    }
}

/// Run `f` with `names` pushed onto the bound-variable stack.
fn with_bound<'a>(
    bound: &mut Vec<String>,
    names: impl IntoIterator<Item = &'a String>,
    f: impl FnOnce(&mut Vec<String>),
) {
    let depth = bound.len();
    bound.extend(names.into_iter().cloned());
    f(bound);
    bound.truncate(depth);
}
