//! Instruction semantics of the WiM.

use vmlab_common::{Address, Fault, HeapAddr, HeapObject, Label};

use super::instruction::{ClauseKey, Constant, Functor, WimInstr};
use super::{
    render_term, BTP, CALLER_FP, HP, MODE, MODE_READ, MODE_WRITE, NEG_CONT, ORG, POS_CONT,
    PREV_BTP, SAVED_HP, SAVED_SP, SAVED_TP, TP,
};
use crate::machine::{Vm, FP, PC};

impl Vm<WimInstr> {
    /// Stack index of variable slot `i` (1-based) of the current frame.
    pub fn slot(&self, i: usize) -> i64 {
        self.fp() + ORG - 1 + i as i64
    }

    fn pop_ref(&mut self) -> Result<HeapAddr, Fault> {
        self.pop()?.as_heap_ref()
    }

    fn slot_ref(&self, i: usize) -> Result<HeapAddr, Fault> {
        self.stack_get(self.slot(i))?.as_heap_ref()
    }

    /// A structure header followed by `arity` fresh variables.
    fn fresh_struct(&mut self, functor: &Functor) -> HeapAddr {
        let s = self.new_cell(HeapObject::Structure {
            name: functor.name.clone(),
            arity: functor.arity,
        });
        for _ in 0..functor.arity {
            self.new_var();
        }
        s
    }

    // ---- Frames and control ----

    pub(crate) fn exec_init(&mut self, fail: &Label) -> Result<(), Fault> {
        let fail = fail.address()?;
        let base = self.sp() + 1;
        self.set_sp(self.sp() + ORG)?;
        self.stack_set(base + NEG_CONT, HeapObject::code_cell(fail.to_register()))?;
        self.stack_set(base + PREV_BTP, HeapObject::stack_cell(-1))?;
        self.stack_set(base + SAVED_TP, HeapObject::basic(self.reg(TP)))?;
        self.stack_set(base + SAVED_HP, HeapObject::heap_cell(self.reg(HP)))?;
        self.stack_set(base + SAVED_SP, HeapObject::stack_cell(self.sp()))?;
        self.set_reg(FP, base);
        self.set_reg(BTP, base);
        self.open_frame(base);
        Ok(())
    }

    pub(crate) fn exec_pushenv(&mut self, m: usize) -> Result<(), Fault> {
        self.set_sp(self.fp() + m as i64 - 1)
    }

    pub(crate) fn exec_enter(&mut self) -> Result<(), Fault> {
        let base = self.sp() + 1;
        self.set_sp(self.sp() + ORG)?;
        self.stack_set(base + CALLER_FP, HeapObject::stack_cell(self.fp()))?;
        self.open_frame(base);
        Ok(())
    }

    pub(crate) fn exec_call(&mut self, target: &Label, n: usize) -> Result<(), Fault> {
        let target = target.address()?;
        let fp = self.sp() - n as i64 - ORG + 1;
        self.stack_set(fp + POS_CONT, HeapObject::code_cell(self.pc()))?;
        self.set_reg(FP, fp);
        self.jump(target);
        Ok(())
    }

    pub(crate) fn exec_popenv(&mut self) -> Result<(), Fault> {
        let fp = self.fp();
        let ret = self.stack_get(fp + POS_CONT)?.as_register()?;
        let caller = self.stack_get(fp + CALLER_FP)?.as_register()?;
        // A frame that is also a choice point must survive for backtracking.
        if fp > self.btp() {
            self.set_sp(fp - 1)?;
        }
        self.set_reg(FP, caller);
        self.set_reg(PC, ret);
        Ok(())
    }

    // ---- Argument construction ----

    pub(crate) fn exec_putatom(&mut self, c: &Constant) -> Result<(), Fault> {
        let addr = self.new_cell(c.to_object());
        self.push(HeapObject::heap_ref(addr))
    }

    pub(crate) fn exec_putvar(&mut self, i: usize) -> Result<(), Fault> {
        let var = self.new_var();
        self.stack_set(self.slot(i), HeapObject::heap_ref(var))?;
        self.push(HeapObject::heap_ref(var))
    }

    pub(crate) fn exec_putref(&mut self, i: usize) -> Result<(), Fault> {
        let term = self.deref(self.slot_ref(i)?)?;
        self.push(HeapObject::heap_ref(term))
    }

    pub(crate) fn exec_putstruct(&mut self, functor: &Functor) -> Result<(), Fault> {
        let first = self.sp() - functor.arity as i64 + 1;
        let args = (first..=self.sp())
            .map(|i| self.stack_get(i)?.as_heap_ref())
            .collect::<Result<Vec<_>, _>>()?;
        self.set_sp(first - 1)?;
        let s = self.new_cell(HeapObject::Structure {
            name: functor.name.clone(),
            arity: functor.arity,
        });
        for arg in args {
            self.new_cell(HeapObject::heap_ref(arg));
        }
        self.push(HeapObject::heap_ref(s))
    }

    // ---- Head unification ----

    fn writing(&self) -> bool {
        self.mode() == MODE_WRITE
    }

    pub(crate) fn exec_uatom(&mut self, c: &Constant) -> Result<(), Fault> {
        let cell = self.pop_ref()?;
        if self.writing() {
            return self.heap_set(cell, c.to_object());
        }
        let term = self.deref(cell)?;
        if self.is_unbound(term)? {
            let value = self.new_cell(c.to_object());
            self.bind(term, value)
        } else if c.matches(self.heap_get(term)?) {
            Ok(())
        } else {
            self.backtrack()
        }
    }

    pub(crate) fn exec_uvar(&mut self, i: usize) -> Result<(), Fault> {
        let cell = self.pop_ref()?;
        self.stack_set(self.slot(i), HeapObject::heap_ref(cell))
    }

    pub(crate) fn exec_uref(&mut self, i: usize) -> Result<(), Fault> {
        let cell = self.pop_ref()?;
        let known = self.slot_ref(i)?;
        if self.writing() {
            let value = self.deref(known)?;
            return self.heap_set(cell, HeapObject::heap_ref(value));
        }
        if self.unify(known, cell)? {
            Ok(())
        } else {
            self.backtrack()
        }
    }

    pub(crate) fn exec_ustruct(&mut self, functor: &Functor) -> Result<(), Fault> {
        let cell = self.top()?.as_heap_ref()?;
        if self.writing() {
            let s = self.fresh_struct(functor);
            self.heap_set(cell, HeapObject::heap_ref(s))?;
            self.set_top(HeapObject::heap_ref(s))?;
            return self.push(HeapObject::basic(MODE_WRITE));
        }
        let term = self.deref(cell)?;
        if self.is_unbound(term)? {
            let s = self.fresh_struct(functor);
            self.bind(term, s)?;
            self.set_top(HeapObject::heap_ref(s))?;
            self.push(HeapObject::basic(MODE_READ))?;
            self.set_reg(MODE, MODE_WRITE);
            return Ok(());
        }
        let same_functor = matches!(
            self.heap_get(term)?,
            HeapObject::Structure { name, arity }
                if *name == functor.name && *arity == functor.arity
        );
        if same_functor {
            self.set_top(HeapObject::heap_ref(term))?;
            self.push(HeapObject::basic(MODE_READ))
        } else {
            self.backtrack()
        }
    }

    pub(crate) fn exec_down(&mut self) -> Result<(), Fault> {
        let s = self.stack_get(self.sp() - 1)?.as_heap_ref()?;
        let first = s.offset(1);
        self.push(HeapObject::heap_ref(first))?;
        self.push(HeapObject::heap_ref(first))
    }

    pub(crate) fn exec_brother(&mut self) -> Result<(), Fault> {
        let next = self.top()?.as_heap_ref()?.offset(1);
        self.set_top(HeapObject::heap_ref(next))?;
        self.push(HeapObject::heap_ref(next))
    }

    pub(crate) fn exec_up(&mut self) -> Result<(), Fault> {
        self.pop_ref()?;
        let mode = self.pop()?.as_basic()?;
        self.pop_ref()?;
        self.set_reg(MODE, mode);
        Ok(())
    }

    // ---- Choice points ----

    pub(crate) fn exec_setbtp(&mut self) -> Result<(), Fault> {
        let fp = self.fp();
        self.stack_set(fp + PREV_BTP, HeapObject::stack_cell(self.btp()))?;
        self.stack_set(fp + SAVED_TP, HeapObject::basic(self.reg(TP)))?;
        self.stack_set(fp + SAVED_HP, HeapObject::heap_cell(self.reg(HP)))?;
        self.stack_set(fp + SAVED_SP, HeapObject::stack_cell(self.sp()))?;
        self.set_reg(BTP, fp);
        Ok(())
    }

    /// Whether a clause keyed `key` can match the first argument of the
    /// current frame.
    fn first_arg_admits(&self, key: &ClauseKey) -> Result<bool, Fault> {
        if *key == ClauseKey::Any {
            return Ok(true);
        }
        let arg = self.deref(self.slot_ref(1)?)?;
        if self.is_unbound(arg)? {
            return Ok(true);
        }
        Ok(key.admits(self.heap_get(arg)?))
    }

    pub(crate) fn exec_nextalt(&mut self, next: &Label, key: &ClauseKey) -> Result<(), Fault> {
        let fp = self.fp();
        let mut target = next.address()?;
        let mut key = key.clone();
        // Skip alternatives whose first argument cannot match. The chain is
        // at most as long as the program.
        for _ in 0..=self.program().len() {
            if self.first_arg_admits(&key)? {
                break;
            }
            match self.instruction_at(target) {
                Some(WimInstr::Nextalt(after, after_key)) => {
                    target = after.address()?;
                    key = after_key.clone();
                }
                Some(WimInstr::Delbtp) => {
                    // Nothing after this clause can match: drop the choice point.
                    return self.exec_delbtp();
                }
                _ => break,
            }
        }
        self.stack_set(fp + NEG_CONT, HeapObject::code_cell(target.to_register()))
    }

    pub(crate) fn exec_delbtp(&mut self) -> Result<(), Fault> {
        let previous = self.stack_get(self.fp() + PREV_BTP)?.as_register()?;
        self.set_reg(BTP, previous);
        Ok(())
    }

    // ---- Results ----

    pub(crate) fn exec_halt(&mut self, names: &[String]) -> Result<(), Fault> {
        let mut text = String::new();
        for (i, name) in names.iter().enumerate() {
            let term = self.slot_ref(i + 1)?;
            text.push_str(&format!("{name} = {}\n", render_term(self.heap(), term)));
        }
        if names.is_empty() {
            text.push_str("yes\n");
        }
        self.write_output(&text);
        self.stop();
        Ok(())
    }

    pub(crate) fn exec_no(&mut self) -> Result<(), Fault> {
        self.write_output("no\n");
        self.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use vmlab_common::{BufferSink, CodeAddr};

    fn at(name: &str, addr: usize) -> Label {
        Label::resolved(name, CodeAddr(addr))
    }

    fn atom(name: &str) -> Constant {
        Constant::Atom(name.to_string())
    }

    #[test]
    fn init_builds_query_frame() {
        let mut vm = Vm::new(Program::new(vec![WimInstr::Init(at("fail", 1)), WimInstr::No]))
            .unwrap();
        vm.step().unwrap();
        assert_eq!(vm.fp(), 0);
        assert_eq!(vm.btp(), 0);
        assert_eq!(vm.sp(), ORG - 1);
        assert_eq!(vm.stack_get(NEG_CONT).unwrap().as_register(), Ok(1));
        assert_eq!(vm.stack_get(PREV_BTP).unwrap().as_register(), Ok(-1));
    }

    #[test]
    fn clash_with_only_query_choice_point_prints_no() {
        // X is bound to a, then matched against b.
        let program = Program::new(vec![
            WimInstr::Init(at("fail", 7)),
            WimInstr::Pushenv(ORG as usize + 1),
            WimInstr::Putatom(atom("a")),
            WimInstr::Uvar(1),
            WimInstr::Putref(1),
            WimInstr::Uatom(atom("b")),
            WimInstr::Halt(vec!["X".to_string()]),
            WimInstr::No,
        ]);
        let mut vm = Vm::new(program).unwrap();
        let out = BufferSink::new();
        vm.set_output(Box::new(out.clone()));
        vm.run().unwrap();
        assert_eq!(out.lines(), vec!["no"]);
        assert!(vm.heap().is_empty());
    }

    #[test]
    fn write_mode_builds_structure_in_place() {
        // Unify an unbound X with f(1, Y).
        let program = Program::new(vec![
            WimInstr::Init(at("fail", 10)),
            WimInstr::Pushenv(ORG as usize + 2),
            WimInstr::Putvar(1),
            WimInstr::Ustruct(Functor::new("f", 2)),
            WimInstr::Down,
            WimInstr::Uatom(Constant::Int(1)),
            WimInstr::Brother,
            WimInstr::Uvar(2),
            WimInstr::Up,
            WimInstr::Halt(vec!["X".to_string(), "Y".to_string()]),
            WimInstr::No,
        ]);
        let mut vm = Vm::new(program).unwrap();
        let out = BufferSink::new();
        vm.set_output(Box::new(out.clone()));
        vm.run().unwrap();
        assert_eq!(vm.mode(), MODE_READ);
        let lines = out.lines();
        assert_eq!(lines[0], "X = f(1, _G3)");
        assert_eq!(lines[1], "Y = _G3");
    }
}
