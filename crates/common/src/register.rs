//! Named integer registers.

use std::fmt;

/// Static description of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub default: i64,
    /// Optional symbolic names for particular values (e.g. `0 -> "read"`).
    pub display: &'static [(i64, &'static str)],
}

impl RegisterSpec {
    pub const fn new(name: &'static str, default: i64) -> Self {
        Self {
            name,
            default,
            display: &[],
        }
    }

    pub const fn with_display(mut self, display: &'static [(i64, &'static str)]) -> Self {
        self.display = display;
        self
    }
}

/// Position of a register inside a [`RegisterFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegId(pub usize);

/// A named mutable integer cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    spec: RegisterSpec,
    value: i64,
}

impl Register {
    pub fn new(spec: RegisterSpec) -> Self {
        Self {
            spec,
            value: spec.default,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn set(&mut self, value: i64) {
        self.value = value;
    }

    pub fn reset(&mut self) {
        self.value = self.spec.default;
    }

    /// The symbolic name of the current value, if the register has one.
    pub fn symbolic(&self) -> Option<&'static str> {
        self.spec
            .display
            .iter()
            .find(|(v, _)| *v == self.value)
            .map(|(_, label)| *label)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbolic() {
            Some(label) => write!(f, "{}={}", self.spec.name, label),
            None => write!(f, "{}={}", self.spec.name, self.value),
        }
    }
}

/// The ordered register set of a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    registers: Vec<Register>,
}

impl RegisterFile {
    pub fn new<'a>(specs: impl IntoIterator<Item = &'a RegisterSpec>) -> Self {
        Self {
            registers: specs.into_iter().copied().map(Register::new).collect(),
        }
    }

    /// Current value.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this file; register ids are
    /// compile-time constants of each machine.
    pub fn get(&self, id: RegId) -> i64 {
        self.registers[id.0].value
    }

    pub fn set(&mut self, id: RegId, value: i64) {
        self.registers[id.0].set(value);
    }

    /// Every register back to its default.
    pub fn reset(&mut self) {
        self.registers.iter_mut().for_each(Register::reset);
    }

    pub fn values(&self) -> Vec<i64> {
        self.registers.iter().map(Register::value).collect()
    }

    /// Restore values captured by [`RegisterFile::values`].
    pub fn restore(&mut self, values: &[i64]) {
        for (reg, value) in self.registers.iter_mut().zip(values) {
            reg.set(*value);
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.iter()
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reg) in self.registers.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{reg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: [RegisterSpec; 2] = [
        RegisterSpec::new("sp", -1),
        RegisterSpec::new("mode", 0).with_display(&[(0, "read"), (1, "write")]),
    ];

    #[test]
    fn defaults_and_reset() {
        let mut regs = RegisterFile::new(&SPECS);
        assert_eq!(regs.get(RegId(0)), -1);
        regs.set(RegId(0), 10);
        regs.set(RegId(1), 1);
        regs.reset();
        assert_eq!(regs.values(), vec![-1, 0]);
    }

    #[test]
    fn symbolic_display() {
        let mut regs = RegisterFile::new(&SPECS);
        assert_eq!(regs.to_string(), "sp=-1 mode=read");
        regs.set(RegId(1), 1);
        assert_eq!(regs.by_name("mode").unwrap().symbolic(), Some("write"));
        regs.set(RegId(1), 7);
        assert_eq!(regs.to_string(), "sp=-1 mode=7");
    }

    #[test]
    fn restore_values() {
        let mut regs = RegisterFile::new(&SPECS);
        let saved = regs.values();
        regs.set(RegId(0), 4);
        regs.restore(&saved);
        assert_eq!(regs.get(RegId(0)), -1);
    }
}
