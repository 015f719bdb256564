//! Machine state and the generic step loop.

use std::collections::VecDeque;

use tracing::{debug, trace};
use vmlab_common::{
    Address, CodeAddr, ExecError, Fault, Heap, HeapAddr, HeapObject, LinkError, RegId,
    RegisterFile, RegisterSpec, Sink, Snapshot, Stack, StackAddr, StdoutSink, Trail, VmConfig,
};

use crate::program::{Instruction, Program};

/// Program counter.
pub const PC: RegId = RegId(0);
/// Run status, see [`STATUS_OK`] and [`STATUS_STOPPED`].
pub const STATUS: RegId = RegId(1);
/// Index of the top stack cell, `-1` when the stack is empty.
pub const SP: RegId = RegId(2);
/// Frame pointer.
pub const FP: RegId = RegId(3);

pub const STATUS_OK: i64 = 0;
pub const STATUS_STOPPED: i64 = 1;

/// Registers every machine has, in [`RegId`] order.
pub const COMMON_REGISTERS: [RegisterSpec; 4] = [
    RegisterSpec::new("pc", 0),
    RegisterSpec::new("status", STATUS_OK)
        .with_display(&[(STATUS_OK, "OK"), (STATUS_STOPPED, "STOPPED")]),
    RegisterSpec::new("sp", -1),
    RegisterSpec::new("fp", -1),
];

/// An abstract machine executing instructions of type `I`.
pub struct Vm<I: Instruction> {
    program: Program<I>,
    pub(crate) registers: RegisterFile,
    pub(crate) stack: Stack,
    pub(crate) heap: Heap,
    pub(crate) trail: Trail,
    output: Box<dyn Sink>,
    config: VmConfig,
    history: VecDeque<Snapshot>,
    steps: u64,
}

impl<I: Instruction> Vm<I> {
    /// Load `program` into a fresh machine with the default configuration.
    pub fn new(program: Program<I>) -> Result<Self, LinkError> {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: Program<I>, config: VmConfig) -> Result<Self, LinkError> {
        program.validate()?;
        Ok(Self {
            program,
            registers: RegisterFile::new(COMMON_REGISTERS.iter().chain(I::EXTRA_REGISTERS)),
            stack: Stack::new(),
            heap: Heap::new(),
            trail: Trail::new(),
            output: Box::new(StdoutSink),
            config,
            history: VecDeque::new(),
            steps: 0,
        })
    }

    /// Replace the program and reset the machine.
    pub fn load(&mut self, program: Program<I>) -> Result<(), LinkError> {
        program.validate()?;
        self.program = program;
        self.reset();
        Ok(())
    }

    /// Registers back to their defaults, every data memory emptied.
    /// Program memory is kept.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.stack.clear();
        self.heap.clear();
        self.trail.clear();
        self.history.clear();
        self.steps = 0;
        debug!(instructions = self.program.len(), "machine reset");
    }

    /// Redirect output (the default is standard output).
    pub fn set_output(&mut self, output: Box<dyn Sink>) {
        self.output = output;
    }

    pub fn write_output(&mut self, text: &str) {
        self.output.write_str(text);
    }

    pub fn program(&self) -> &Program<I> {
        &self.program
    }

    pub fn instruction_at(&self, addr: CodeAddr) -> Option<&I> {
        self.program.instructions.get(addr.index())
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Steps executed since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn reg(&self, id: RegId) -> i64 {
        self.registers.get(id)
    }

    pub fn set_reg(&mut self, id: RegId, value: i64) {
        self.registers.set(id, value);
    }

    pub fn pc(&self) -> i64 {
        self.reg(PC)
    }

    pub fn sp(&self) -> i64 {
        self.reg(SP)
    }

    pub fn fp(&self) -> i64 {
        self.reg(FP)
    }

    pub fn is_running(&self) -> bool {
        self.reg(STATUS) == STATUS_OK
    }

    pub fn stop(&mut self) {
        self.set_reg(STATUS, STATUS_STOPPED);
    }

    /// Clear a previous stop so execution can continue.
    pub fn resume(&mut self) {
        self.set_reg(STATUS, STATUS_OK);
    }

    pub fn jump(&mut self, addr: CodeAddr) {
        self.set_reg(PC, addr.to_register());
    }

    // ---- Stack ----

    /// Move the stack pointer, truncating or padding the stack to match.
    pub fn set_sp(&mut self, sp: i64) -> Result<(), Fault> {
        if sp < -1 {
            return Err(Fault::StackOutOfRange {
                index: sp,
                sp: self.sp(),
            });
        }
        self.registers.set(SP, sp);
        self.stack.resize_to(sp);
        Ok(())
    }

    pub fn push(&mut self, object: HeapObject) -> Result<(), Fault> {
        let sp = self.sp() + 1;
        self.set_sp(sp)?;
        self.stack_set(sp, object)
    }

    pub fn pop(&mut self) -> Result<HeapObject, Fault> {
        let top = self.top()?.clone();
        self.set_sp(self.sp() - 1)?;
        Ok(top)
    }

    pub fn top(&self) -> Result<&HeapObject, Fault> {
        self.stack_get(self.sp())
    }

    pub fn set_top(&mut self, object: HeapObject) -> Result<(), Fault> {
        self.stack_set(self.sp(), object)
    }

    pub fn stack_get(&self, index: i64) -> Result<&HeapObject, Fault> {
        self.stack.get(self.stack_addr(index)?)
    }

    pub fn stack_set(&mut self, index: i64, object: HeapObject) -> Result<(), Fault> {
        let addr = self.stack_addr(index)?;
        self.stack.set(addr, object)
    }

    /// Mark a frame starting at `base` for display.
    pub fn open_frame(&mut self, base: i64) {
        if let Ok(addr) = StackAddr::from_register(base) {
            self.stack.open_frame(addr);
        }
    }

    fn stack_addr(&self, index: i64) -> Result<StackAddr, Fault> {
        StackAddr::from_register(index).map_err(|_| Fault::StackOutOfRange {
            index,
            sp: self.sp(),
        })
    }

    // ---- Heap ----

    pub fn allocate(&mut self, object: HeapObject) -> HeapAddr {
        self.heap.allocate(object)
    }

    pub fn heap_get(&self, addr: HeapAddr) -> Result<&HeapObject, Fault> {
        self.heap.get(addr)
    }

    pub fn heap_set(&mut self, addr: HeapAddr, object: HeapObject) -> Result<(), Fault> {
        self.heap.set(addr, object)
    }

    /// Elements of the vector object at `addr`.
    pub fn vector_items(&self, addr: HeapAddr) -> Result<Vec<HeapAddr>, Fault> {
        match self.heap_get(addr)? {
            HeapObject::Vector(items) => Ok(items.clone()),
            other => Err(other.unexpected("vector")),
        }
    }

    // ---- Execution ----

    fn fetch(&self) -> Result<&I, Fault> {
        let pc = self.pc();
        let size = self.program.len();
        usize::try_from(pc)
            .ok()
            .and_then(|i| self.program.instructions.get(i))
            .ok_or(Fault::PcOutOfRange { pc, size })
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.registers, &self.stack, &self.heap, &self.trail)
    }

    fn restore(&mut self, snapshot: Snapshot) {
        snapshot.restore(
            &mut self.registers,
            &mut self.stack,
            &mut self.heap,
            &mut self.trail,
        );
    }

    /// Execute one instruction.
    ///
    /// Does nothing once the machine has stopped. If the instruction faults,
    /// every register and memory is restored to its pre-step state before
    /// the error is returned.
    pub fn step(&mut self) -> Result<(), ExecError> {
        if !self.is_running() {
            return Ok(());
        }
        let at = self.pc();
        let instr = self
            .fetch()
            .map_err(|cause| ExecError {
                at,
                instruction: None,
                cause,
            })?
            .clone();

        let snapshot = self.snapshot();
        self.set_reg(PC, at + 1);
        trace!(pc = at, instruction = instr.mnemonic(), "step");

        if let Err(cause) = instr.execute(self) {
            self.restore(snapshot);
            let instruction = instr.render();
            debug!(pc = at, %instruction, %cause, "fault, step rolled back");
            return Err(ExecError {
                at,
                instruction: Some(instruction),
                cause,
            });
        }

        if self.config.history_limit > 0 {
            if self.history.len() == self.config.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(snapshot);
        }
        self.steps += 1;
        Ok(())
    }

    /// Step until the machine stops or faults.
    pub fn run(&mut self) -> Result<(), ExecError> {
        let start = self.steps;
        while self.is_running() {
            if let Some(limit) = self.config.max_steps {
                if self.steps - start >= limit {
                    return Err(ExecError {
                        at: self.pc(),
                        instruction: None,
                        cause: Fault::StepLimit { limit },
                    });
                }
            }
            self.step()?;
        }
        debug!(steps = self.steps, "machine stopped");
        Ok(())
    }

    /// Undo the most recent step. Returns `false` when there is no history.
    pub fn step_back(&mut self) -> bool {
        match self.history.pop_back() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.steps = self.steps.saturating_sub(1);
                debug!(pc = self.pc(), "stepped back");
                true
            }
            None => false,
        }
    }
}
