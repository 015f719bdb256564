//! Instruction semantics of the MaMa.
//!
//! Stack frames built by `mark` (and by `eval`) look like this, with `fp`
//! pointing at the saved program counter:
//!
//! ```text
//! fp-2  saved gp
//! fp-1  saved fp
//! fp    continuation address
//! fp+1  last argument ... first argument   <- sp
//! ```

use tracing::trace;
use vmlab_common::{Address, CodeAddr, Fault, HeapAddr, HeapObject, Label};

use super::instruction::{BinOp, MamaInstr, UnOp};
use super::GP;
use crate::machine::{Vm, FP, PC};

impl Vm<MamaInstr> {
    pub fn gp(&self) -> i64 {
        self.reg(GP)
    }

    fn top_ref(&self) -> Result<HeapAddr, Fault> {
        self.top()?.as_heap_ref()
    }

    fn globals(&self) -> Result<HeapAddr, Fault> {
        HeapAddr::from_register(self.gp())
    }

    /// Push `gp`, `fp` and `ret`, then make the new frame current.
    fn push_frame(&mut self, ret: i64) -> Result<(), Fault> {
        let base = self.sp() + 1;
        self.push(HeapObject::heap_cell(self.gp()))?;
        self.push(HeapObject::stack_cell(self.fp()))?;
        self.push(HeapObject::code_cell(ret))?;
        self.set_reg(FP, self.sp());
        self.open_frame(base);
        Ok(())
    }

    /// Leave the current frame, moving the top cell into the slot of the
    /// saved `gp`.
    fn pop_frame(&mut self) -> Result<(), Fault> {
        let fp = self.fp();
        let saved_gp = self.stack_get(fp - 2)?.as_register()?;
        let saved_fp = self.stack_get(fp - 1)?.as_register()?;
        let saved_pc = self.stack_get(fp)?.as_register()?;
        let result = self.top()?.clone();
        self.stack_set(fp - 2, result)?;
        self.set_sp(fp - 2)?;
        self.set_reg(FP, saved_fp);
        self.set_reg(PC, saved_pc);
        self.set_reg(GP, saved_gp);
        Ok(())
    }

    // ---- Basic values ----

    pub(crate) fn exec_loadc(&mut self, q: i64) -> Result<(), Fault> {
        self.push(HeapObject::basic(q))
    }

    pub(crate) fn exec_mkbasic(&mut self) -> Result<(), Fault> {
        let value = self.top()?.as_basic()?;
        let addr = self.allocate(HeapObject::basic(value));
        self.set_top(HeapObject::heap_ref(addr))
    }

    pub(crate) fn exec_getbasic(&mut self) -> Result<(), Fault> {
        let value = self.heap_get(self.top_ref()?)?.as_basic()?;
        self.set_top(HeapObject::basic(value))
    }

    pub(crate) fn exec_opbin(&mut self, op: BinOp) -> Result<(), Fault> {
        let b = self.pop()?.as_basic()?;
        let a = self.top()?.as_basic()?;
        self.set_top(HeapObject::basic(op.apply(a, b)?))
    }

    pub(crate) fn exec_opun(&mut self, op: UnOp) -> Result<(), Fault> {
        let v = self.top()?.as_basic()?;
        self.set_top(HeapObject::basic(op.apply(v)))
    }

    pub(crate) fn exec_jump(&mut self, target: &Label) -> Result<(), Fault> {
        self.jump(target.address()?);
        Ok(())
    }

    pub(crate) fn exec_jumpz(&mut self, target: &Label) -> Result<(), Fault> {
        let address = target.address()?;
        if self.pop()?.as_basic()? == 0 {
            self.jump(address);
        }
        Ok(())
    }

    // ---- Variables ----

    pub(crate) fn exec_pushloc(&mut self, j: usize) -> Result<(), Fault> {
        let cell = self.stack_get(self.sp() - j as i64)?.clone();
        self.push(cell)
    }

    pub(crate) fn exec_pushglob(&mut self, j: usize) -> Result<(), Fault> {
        let items = self.vector_items(self.globals()?)?;
        let addr = items.get(j).copied().ok_or(Fault::VectorIndex {
            index: j,
            len: items.len(),
        })?;
        self.push(HeapObject::heap_ref(addr))
    }

    pub(crate) fn exec_slide(&mut self, m: usize) -> Result<(), Fault> {
        if m == 0 {
            return Ok(());
        }
        let top = self.top()?.clone();
        self.set_sp(self.sp() - m as i64)?;
        self.set_top(top)
    }

    // ---- Closures and functions ----

    /// References in `S[from..=sp]`, bottom first.
    fn collect_refs(&self, from: i64) -> Result<Vec<HeapAddr>, Fault> {
        (from..=self.sp())
            .map(|i| self.stack_get(i)?.as_heap_ref())
            .collect()
    }

    pub(crate) fn exec_mkvec(&mut self, n: usize) -> Result<(), Fault> {
        let from = self.sp() - n as i64 + 1;
        let items = self.collect_refs(from)?;
        self.set_sp(from - 1)?;
        let addr = self.allocate(HeapObject::Vector(items));
        self.push(HeapObject::heap_ref(addr))
    }

    pub(crate) fn exec_mkclos(&mut self, code: &Label) -> Result<(), Fault> {
        let code = code.address()?;
        let globals = self.top_ref()?;
        self.vector_items(globals)?;
        let addr = self.allocate(HeapObject::Closure {
            code: Some(code),
            globals: Some(globals),
        });
        self.set_top(HeapObject::heap_ref(addr))
    }

    pub(crate) fn exec_mkfunval(&mut self, code: &Label, name: &str) -> Result<(), Fault> {
        let code = code.address()?;
        let globals = self.top_ref()?;
        self.vector_items(globals)?;
        let args = self.allocate(HeapObject::Vector(Vec::new()));
        let addr = self.allocate(HeapObject::FunVal {
            code,
            args,
            globals,
        });
        trace!(function = name, %addr, "function value");
        self.set_top(HeapObject::heap_ref(addr))
    }

    pub(crate) fn exec_mark(&mut self, ret: &Label) -> Result<(), Fault> {
        let ret = ret.address()?;
        self.push_frame(ret.to_register())
    }

    pub(crate) fn exec_apply(&mut self) -> Result<(), Fault> {
        let target = self.top_ref()?;
        let (code, args, globals) = match self.heap_get(target)? {
            HeapObject::FunVal {
                code,
                args,
                globals,
            } => (*code, *args, *globals),
            other => return Err(other.unexpected("function value")),
        };
        let args = self.vector_items(args)?;
        self.pop()?;
        for arg in args {
            self.push(HeapObject::heap_ref(arg))?;
        }
        self.set_reg(GP, globals.to_register());
        self.jump(code);
        Ok(())
    }

    pub(crate) fn exec_targ(&mut self, n: usize) -> Result<(), Fault> {
        if self.sp() - self.fp() >= n as i64 {
            return Ok(());
        }
        // Too few arguments: package them with the current globals into a
        // function value that re-enters this `targ`, and return it.
        let fp = self.fp();
        let supplied = self.collect_refs(fp + 1)?;
        self.set_sp(fp + 1)?;
        let args = self.allocate(HeapObject::Vector(supplied));
        let code = CodeAddr::from_register(self.pc() - 1)?;
        let globals = self.globals()?;
        let partial = self.allocate(HeapObject::FunVal {
            code,
            args,
            globals,
        });
        self.set_top(HeapObject::heap_ref(partial))?;
        self.pop_frame()
    }

    pub(crate) fn exec_return(&mut self, n: usize) -> Result<(), Fault> {
        if self.sp() - self.fp() - 1 <= n as i64 {
            self.pop_frame()
        } else {
            // Over-application: the result is a function consuming the rest.
            self.exec_slide(n)?;
            self.exec_apply()
        }
    }

    pub(crate) fn exec_eval(&mut self) -> Result<(), Fault> {
        let target = self.top_ref()?;
        match self.heap_get(target)? {
            HeapObject::Closure {
                code: Some(code),
                globals: Some(globals),
            } => {
                let (code, globals) = (*code, *globals);
                self.push_frame(self.pc())?;
                self.set_reg(GP, globals.to_register());
                self.jump(code);
                Ok(())
            }
            HeapObject::Closure { .. } => Err(Fault::UninitializedClosure),
            _ => Ok(()),
        }
    }

    pub(crate) fn exec_update(&mut self) -> Result<(), Fault> {
        self.pop_frame()?;
        self.exec_rewrite(1)
    }

    pub(crate) fn exec_rewrite(&mut self, m: usize) -> Result<(), Fault> {
        let source = self.top_ref()?;
        let target = self.stack_get(self.sp() - m as i64)?.as_heap_ref()?;
        let value = self.heap_get(source)?.clone();
        self.heap_set(target, value)?;
        self.set_sp(self.sp() - 1)
    }

    pub(crate) fn exec_alloc(&mut self, n: usize) -> Result<(), Fault> {
        for _ in 0..n {
            let addr = self.allocate(HeapObject::Closure {
                code: None,
                globals: None,
            });
            self.push(HeapObject::heap_ref(addr))?;
        }
        Ok(())
    }

    // ---- Lists ----

    pub(crate) fn exec_cons(&mut self) -> Result<(), Fault> {
        let tail = self.top_ref()?;
        match self.heap_get(tail)? {
            HeapObject::Cons { .. } | HeapObject::Nil | HeapObject::Closure { .. } => {}
            other => {
                return Err(Fault::IllFormedList {
                    found: other.kind(),
                })
            }
        }
        let head = self.stack_get(self.sp() - 1)?.as_heap_ref()?;
        let cell = self.allocate(HeapObject::Cons { head, tail });
        self.set_sp(self.sp() - 1)?;
        self.set_top(HeapObject::heap_ref(cell))
    }

    pub(crate) fn exec_nil(&mut self) -> Result<(), Fault> {
        let addr = self.allocate(HeapObject::Nil);
        self.push(HeapObject::heap_ref(addr))
    }

    fn cons_parts(&self) -> Result<(HeapAddr, HeapAddr), Fault> {
        match self.heap_get(self.top_ref()?)? {
            HeapObject::Cons { head, tail } => Ok((*head, *tail)),
            other => Err(other.unexpected("cons cell")),
        }
    }

    pub(crate) fn exec_hd(&mut self) -> Result<(), Fault> {
        let (head, _) = self.cons_parts()?;
        self.set_top(HeapObject::heap_ref(head))
    }

    pub(crate) fn exec_tl(&mut self) -> Result<(), Fault> {
        let (_, tail) = self.cons_parts()?;
        self.set_top(HeapObject::heap_ref(tail))
    }

    pub(crate) fn exec_isnil(&mut self) -> Result<(), Fault> {
        let empty = match self.heap_get(self.top_ref()?)? {
            HeapObject::Nil => 1,
            HeapObject::Cons { .. } => 0,
            other => return Err(other.unexpected("evaluated list")),
        };
        self.set_top(HeapObject::basic(empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use vmlab_common::Pointer;

    fn run(instructions: Vec<MamaInstr>) -> Vm<MamaInstr> {
        let mut vm = Vm::new(Program::new(instructions)).unwrap();
        vm.run().unwrap();
        vm
    }

    fn at(name: &str, addr: usize) -> Label {
        Label::resolved(name, CodeAddr(addr))
    }

    #[test]
    fn boxing_roundtrip() {
        let vm = run(vec![
            MamaInstr::Loadc(42),
            MamaInstr::Mkbasic,
            MamaInstr::Getbasic,
            MamaInstr::Halt,
        ]);
        assert_eq!(vm.top(), Ok(&HeapObject::basic(42)));
        assert_eq!(vm.heap().len(), 1);
    }

    #[test]
    fn jumpz_takes_branch_on_zero() {
        let vm = run(vec![
            MamaInstr::Loadc(0),
            MamaInstr::Jumpz(at("else", 4)),
            MamaInstr::Loadc(1),
            MamaInstr::Halt,
            MamaInstr::Loadc(2),
            MamaInstr::Halt,
        ]);
        assert_eq!(vm.top(), Ok(&HeapObject::basic(2)));
        assert_eq!(vm.sp(), 0);
    }

    #[test]
    fn slide_keeps_top() {
        let vm = run(vec![
            MamaInstr::Loadc(1),
            MamaInstr::Loadc(2),
            MamaInstr::Loadc(3),
            MamaInstr::Slide(2),
            MamaInstr::Halt,
        ]);
        assert_eq!(vm.sp(), 0);
        assert_eq!(vm.top(), Ok(&HeapObject::basic(3)));
    }

    #[test]
    fn pushloc_counts_from_top() {
        let vm = run(vec![
            MamaInstr::Loadc(10),
            MamaInstr::Loadc(20),
            MamaInstr::Pushloc(1),
            MamaInstr::Halt,
        ]);
        assert_eq!(vm.top(), Ok(&HeapObject::basic(10)));
    }

    #[test]
    fn eval_on_value_is_noop() {
        let mut vm = Vm::new(Program::new(vec![
            MamaInstr::Loadc(5),
            MamaInstr::Mkbasic,
            MamaInstr::Eval,
            MamaInstr::Halt,
        ]))
        .unwrap();
        vm.step().unwrap();
        vm.step().unwrap();
        let before = vm.stack().clone();
        vm.step().unwrap();
        assert_eq!(vm.stack(), &before);
        assert_eq!(vm.pc(), 3);
    }

    #[test]
    fn apply_requires_function_value() {
        let mut vm = Vm::new(Program::new(vec![
            MamaInstr::Loadc(5),
            MamaInstr::Mkbasic,
            MamaInstr::Apply,
        ]))
        .unwrap();
        vm.step().unwrap();
        vm.step().unwrap();
        let err = vm.step().unwrap_err();
        assert_eq!(
            err.cause,
            Fault::UnexpectedObject {
                expected: "function value",
                found: "basic value"
            }
        );
        assert_eq!(vm.pc(), 2);
    }

    #[test]
    fn cons_rejects_basic_tail() {
        let mut vm = Vm::new(Program::new(vec![
            MamaInstr::Loadc(1),
            MamaInstr::Mkbasic,
            MamaInstr::Loadc(2),
            MamaInstr::Mkbasic,
            MamaInstr::Cons,
        ]))
        .unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(
            err.cause,
            Fault::IllFormedList {
                found: "basic value"
            }
        );
        assert_eq!(vm.heap().len(), 2);
    }

    #[test]
    fn list_cells_and_accessors() {
        // [7] then hd, tl, isnil
        let vm = run(vec![
            MamaInstr::Loadc(7),
            MamaInstr::Mkbasic,
            MamaInstr::Nil,
            MamaInstr::Cons,
            MamaInstr::Pushloc(0),
            MamaInstr::Tl,
            MamaInstr::Isnil,
            MamaInstr::Pushloc(1),
            MamaInstr::Hd,
            MamaInstr::Getbasic,
            MamaInstr::Halt,
        ]);
        assert_eq!(vm.top(), Ok(&HeapObject::basic(7)));
        assert_eq!(vm.stack_get(1), Ok(&HeapObject::basic(1)));
    }

    #[test]
    fn alloc_then_rewrite_fills_placeholder() {
        let vm = run(vec![
            MamaInstr::Alloc(1),
            MamaInstr::Loadc(9),
            MamaInstr::Mkbasic,
            MamaInstr::Rewrite(1),
            MamaInstr::Halt,
        ]);
        let cell = vm.top().unwrap().as_heap_ref().unwrap();
        assert_eq!(vm.heap_get(cell), Ok(&HeapObject::basic(9)));
    }

    #[test]
    fn evaluating_placeholder_faults() {
        let mut vm = Vm::new(Program::new(vec![MamaInstr::Alloc(1), MamaInstr::Eval])).unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err.cause, Fault::UninitializedClosure);
    }

    #[test]
    fn mark_saves_registers() {
        let mut vm = Vm::new(Program::new(vec![MamaInstr::Mark(at("ret", 0))])).unwrap();
        vm.step().unwrap();
        assert_eq!(vm.fp(), 2);
        assert_eq!(vm.stack_get(0), Ok(&HeapObject::null()));
        assert_eq!(vm.stack_get(1), Ok(&HeapObject::null()));
        assert_eq!(
            vm.stack_get(2),
            Ok(&HeapObject::Pointer(Pointer::Program(CodeAddr(0))))
        );
        assert_eq!(vm.stack().frames().len(), 1);
    }
}
