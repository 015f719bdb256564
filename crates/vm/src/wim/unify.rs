//! Dereferencing, binding, unification and backtracking.

use tracing::debug;
use vmlab_common::{Address, Fault, HeapAddr, HeapObject, Pointer, TrailAddr};

use super::{
    WimInstr, BTP, HP, MODE, MODE_READ, NEG_CONT, SAVED_HP, SAVED_SP, SAVED_TP, TP,
};
use crate::machine::{Vm, FP, PC};

impl Vm<WimInstr> {
    pub fn btp(&self) -> i64 {
        self.reg(BTP)
    }

    pub fn mode(&self) -> i64 {
        self.reg(MODE)
    }

    /// Allocate a heap cell and move `hp` to it.
    pub(crate) fn new_cell(&mut self, object: HeapObject) -> HeapAddr {
        let addr = self.allocate(object);
        self.set_reg(HP, addr.to_register());
        addr
    }

    /// Allocate an unbound variable (a cell pointing to itself).
    pub(crate) fn new_var(&mut self) -> HeapAddr {
        let addr = HeapAddr(self.heap().len());
        self.new_cell(HeapObject::heap_ref(addr))
    }

    pub fn is_unbound(&self, addr: HeapAddr) -> Result<bool, Fault> {
        Ok(matches!(
            self.heap_get(addr)?,
            HeapObject::Pointer(Pointer::Heap(target)) if *target == addr
        ))
    }

    /// Follow reference chains to the representative cell.
    pub fn deref(&self, mut addr: HeapAddr) -> Result<HeapAddr, Fault> {
        loop {
            match self.heap_get(addr)? {
                HeapObject::Pointer(Pointer::Heap(next)) if *next != addr => addr = *next,
                _ => return Ok(addr),
            }
        }
    }

    /// Bind the unbound variable at `var` to `value`, trailing if needed.
    pub(crate) fn bind(&mut self, var: HeapAddr, value: HeapAddr) -> Result<(), Fault> {
        self.heap_set(var, HeapObject::heap_ref(value))?;
        self.trail_binding(var)
    }

    /// Record `var` on the trail if it is older than the newest choice point.
    fn trail_binding(&mut self, var: HeapAddr) -> Result<(), Fault> {
        let btp = self.btp();
        if btp < 0 {
            return Ok(());
        }
        let hp_at_choice = self.stack_get(btp + SAVED_HP)?.as_register()?;
        if var.to_register() <= hp_at_choice {
            let t = self.trail.record(var);
            self.set_reg(TP, t.to_register());
        }
        Ok(())
    }

    /// Unify the terms at `a` and `b`. Returns `false` on a clash; bindings
    /// made before the clash stay until the next backtrack undoes them.
    pub fn unify(&mut self, a: HeapAddr, b: HeapAddr) -> Result<bool, Fault> {
        let mut pending = vec![(a, b)];
        while let Some((u, v)) = pending.pop() {
            let u = self.deref(u)?;
            let v = self.deref(v)?;
            if u == v {
                continue;
            }
            match (self.is_unbound(u)?, self.is_unbound(v)?) {
                // Younger variable points to the older one.
                (true, true) if u > v => self.bind(u, v)?,
                (true, true) => self.bind(v, u)?,
                (true, false) => self.bind(u, v)?,
                (false, true) => self.bind(v, u)?,
                (false, false) => match (self.heap_get(u)?, self.heap_get(v)?) {
                    (HeapObject::Basic { value: x, .. }, HeapObject::Basic { value: y, .. }) => {
                        if x != y {
                            return Ok(false);
                        }
                    }
                    (
                        HeapObject::Structure { name: f, arity: n },
                        HeapObject::Structure { name: g, arity: m },
                    ) => {
                        if f != g || n != m {
                            return Ok(false);
                        }
                        let n = *n;
                        for i in 1..=n {
                            pending.push((u.offset(i), v.offset(i)));
                        }
                    }
                    _ => return Ok(false),
                },
            }
        }
        Ok(true)
    }

    /// Resume at the newest choice point: undo trailed bindings, drop heap
    /// cells and stack cells created since, and jump to its next alternative.
    pub fn backtrack(&mut self) -> Result<(), Fault> {
        let btp = self.btp();
        if btp < 0 {
            return Err(Fault::NoChoicePoint);
        }
        let saved_tp = self.stack_get(btp + SAVED_TP)?.as_register()?;
        let saved_hp = self.stack_get(btp + SAVED_HP)?.as_register()?;
        let saved_sp = self.stack_get(btp + SAVED_SP)?.as_register()?;
        let next = self.stack_get(btp + NEG_CONT)?.as_register()?;

        let tp = self.reg(TP);
        for t in (saved_tp + 1..=tp).rev() {
            let var = self.trail.get(TrailAddr::from_register(t)?)?;
            if var.index() < self.heap().len() {
                self.heap_set(var, HeapObject::heap_ref(var))?;
            }
        }
        self.trail.truncate(to_len(saved_tp));
        self.set_reg(TP, saved_tp);
        self.heap.truncate(to_len(saved_hp));
        self.set_reg(HP, saved_hp);

        self.set_reg(FP, btp);
        self.set_sp(saved_sp)?;
        self.set_reg(MODE, MODE_READ);
        self.set_reg(PC, next);
        debug!(btp, next, "backtrack");
        Ok(())
    }
}

/// Length of a memory whose top index is `top` (`-1` when empty).
fn to_len(top: i64) -> usize {
    usize::try_from(top + 1).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;

    fn machine() -> Vm<WimInstr> {
        Vm::new(Program::new(vec![WimInstr::No])).unwrap()
    }

    /// `f(args...)` built from already allocated argument cells.
    fn structure(vm: &mut Vm<WimInstr>, name: &str, args: &[HeapAddr]) -> HeapAddr {
        let s = vm.new_cell(HeapObject::Structure {
            name: name.to_string(),
            arity: args.len(),
        });
        for a in args {
            vm.new_cell(HeapObject::heap_ref(*a));
        }
        s
    }

    #[test]
    fn unify_binds_both_ways() {
        // f(X, 1) = f(2, Y)
        let mut vm = machine();
        let x = vm.new_var();
        let one = vm.new_cell(HeapObject::basic(1));
        let left = structure(&mut vm, "f", &[x, one]);
        let two = vm.new_cell(HeapObject::basic(2));
        let y = vm.new_var();
        let right = structure(&mut vm, "f", &[two, y]);

        assert_eq!(vm.unify(left, right), Ok(true));
        let xv = vm.deref(x).unwrap();
        let yv = vm.deref(y).unwrap();
        assert_eq!(vm.heap_get(xv), Ok(&HeapObject::basic(2)));
        assert_eq!(vm.heap_get(yv), Ok(&HeapObject::basic(1)));
    }

    #[test]
    fn functor_clash_leaves_variable_unbound() {
        // f(X) = g(X)
        let mut vm = machine();
        let x = vm.new_var();
        let left = structure(&mut vm, "f", &[x]);
        let right = structure(&mut vm, "g", &[x]);
        assert_eq!(vm.unify(left, right), Ok(false));
        assert_eq!(vm.is_unbound(x), Ok(true));
    }

    #[test]
    fn younger_variable_binds_to_older() {
        let mut vm = machine();
        let old = vm.new_var();
        let young = vm.new_var();
        assert_eq!(vm.unify(old, young), Ok(true));
        assert_eq!(vm.is_unbound(old), Ok(true));
        assert_eq!(vm.deref(young), Ok(old));
    }

    #[test]
    fn backtrack_without_choice_point_faults() {
        let mut vm = machine();
        assert_eq!(vm.backtrack(), Err(Fault::NoChoicePoint));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn integer_arguments_bind_crosswise(k1 in -1000i64..1000, k2 in -1000i64..1000) {
                // f(X, k1) = f(k2, Y)
                let mut vm = machine();
                let x = vm.new_var();
                let c1 = vm.new_cell(HeapObject::basic(k1));
                let left = structure(&mut vm, "f", &[x, c1]);
                let c2 = vm.new_cell(HeapObject::basic(k2));
                let y = vm.new_var();
                let right = structure(&mut vm, "f", &[c2, y]);

                prop_assert_eq!(vm.unify(left, right), Ok(true));
                let xv = vm.deref(x).unwrap();
                let yv = vm.deref(y).unwrap();
                prop_assert_eq!(vm.heap_get(xv), Ok(&HeapObject::basic(k2)));
                prop_assert_eq!(vm.heap_get(yv), Ok(&HeapObject::basic(k1)));
            }

            #[test]
            fn integer_clash_fails(a in -1000i64..1000, b in -1000i64..1000, same_functor in any::<bool>()) {
                prop_assume!(a != b || !same_functor);
                // f(X, a) = f(X, b), or f(X, a) = g(X, a) when the functors differ
                let mut vm = machine();
                let x = vm.new_var();
                let ca = vm.new_cell(HeapObject::basic(a));
                let left = structure(&mut vm, "f", &[x, ca]);
                let (name, value) = if same_functor { ("f", b) } else { ("g", a) };
                let cb = vm.new_cell(HeapObject::basic(value));
                let right = structure(&mut vm, name, &[x, cb]);

                prop_assert_eq!(vm.unify(left, right), Ok(false));
                prop_assert_eq!(vm.is_unbound(x), Ok(true));
            }

            #[test]
            fn variable_against_integer_binds(k in -1000i64..1000) {
                // f(X) = f(k) binds X; f(X) = f(k) then f(X) = f(k + 1) clashes
                let mut vm = machine();
                let x = vm.new_var();
                let left = structure(&mut vm, "f", &[x]);
                let c = vm.new_cell(HeapObject::basic(k));
                let right = structure(&mut vm, "f", &[c]);
                prop_assert_eq!(vm.unify(left, right), Ok(true));
                prop_assert_eq!(vm.is_unbound(x), Ok(false));

                let other = vm.new_cell(HeapObject::basic(k + 1));
                let again = structure(&mut vm, "f", &[other]);
                prop_assert_eq!(vm.unify(left, again), Ok(false));
            }
        }
    }
}
