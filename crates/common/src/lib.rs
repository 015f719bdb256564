//! Shared building blocks for the vmlab abstract machines.
//!
//! Both machines (the lazy functional one and the logic one) are built from
//! the same substrate:
//!
//! - [`address`]: typed indices for program, stack, heap and trail memory
//! - [`HeapObject`]: the closed set of cell contents
//! - [`RegisterFile`]: named integer registers with defaults
//! - [`Stack`], [`Heap`], [`Trail`]: the data memories
//! - [`Label`]: symbolic jump targets resolved at link time
//! - [`Snapshot`]: whole-state capture for rollback and undo
//! - [`Fault`], [`ExecError`], [`LinkError`]: typed errors
//! - [`VmConfig`]: per-instance tunables
//! - [`Sink`]: the replaceable output channel

pub mod address;
pub mod config;
pub mod error;
pub mod label;
pub mod memory;
pub mod object;
pub mod register;
pub mod sink;
pub mod snapshot;

pub use address::{Address, CodeAddr, HeapAddr, StackAddr, TrailAddr};
pub use config::VmConfig;
pub use error::{ExecError, Fault, LinkError};
pub use label::Label;
pub use memory::{Heap, Memory, Stack, Trail};
pub use object::{HeapObject, Pointer};
pub use register::{RegId, Register, RegisterFile, RegisterSpec};
pub use sink::{BufferSink, Sink, StdoutSink};
pub use snapshot::Snapshot;
