//! Typed addresses for the four address spaces of a machine.
//!
//! Program, stack, heap and trail memories are indexed by distinct newtypes
//! so an index into one can never be used against another. Registers store
//! plain `i64` values where `-1` means "no address"; [`Address::from_register`]
//! is the checked way back into a typed address.

use std::fmt;

use crate::error::Fault;

/// Common behaviour of every address newtype.
pub trait Address: Copy + Eq + Ord + fmt::Debug + fmt::Display {
    /// Human-readable name of the address space (used in fault messages).
    const SPACE: &'static str;

    /// Construct from a raw index.
    fn from_index(index: usize) -> Self;

    /// The raw index.
    fn index(self) -> usize;

    /// Convert a register value into an address. Negative values fault.
    fn from_register(value: i64) -> Result<Self, Fault> {
        usize::try_from(value)
            .map(Self::from_index)
            .map_err(|_| Fault::NegativeAddress {
                space: Self::SPACE,
                value,
            })
    }

    /// The register encoding of this address.
    fn to_register(self) -> i64 {
        self.index() as i64
    }

    /// The address `offset` cells further on.
    fn offset(self, offset: usize) -> Self {
        Self::from_index(self.index() + offset)
    }
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, $space:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);

        impl Address for $name {
            const SPACE: &'static str = $space;

            fn from_index(index: usize) -> Self {
                Self(index)
            }

            fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

address_type!(
    /// Index into program memory.
    CodeAddr,
    "program",
    "#"
);
address_type!(
    /// Index into the stack.
    StackAddr,
    "stack",
    "S"
);
address_type!(
    /// Index into the heap.
    HeapAddr,
    "heap",
    "@"
);
address_type!(
    /// Index into the trail (logic machine only).
    TrailAddr,
    "trail",
    "T"
);
