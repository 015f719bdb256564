//! Disassembler: instruction stream -> assembly text.
//!
//! Canonical output comes from the program's `Display`: flat text, one
//! instruction per line, label definitions on their own lines, no comments.
//! The listing form adds code addresses and is meant for people, not for
//! reassembly.

use vmlab_common::CodeAddr;
use vmlab_vm::{Instruction, Program};

/// Canonical assembly text. Reassembling it yields an identical program.
pub fn disassemble<I: Instruction>(program: &Program<I>) -> String {
    program.to_string()
}

/// Human-readable listing with code addresses.
///
/// ```text
/// L0:
///      0  mark L1
/// ```
pub fn listing<I: Instruction>(program: &Program<I>) -> String {
    let width = program.len().saturating_sub(1).to_string().len().max(4);
    let mut out = String::new();
    for (i, instr) in program.instructions.iter().enumerate() {
        for name in program.labels_at(CodeAddr(i)) {
            out.push_str(&format!("{name}:\n"));
        }
        out.push_str(&format!(" {i:>width$}  {}\n", instr.render()));
    }
    for name in program.labels_at(CodeAddr(program.len())) {
        out.push_str(&format!("{name}:\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmlab_common::Label;
    use vmlab_vm::mama::MamaInstr;
    use vmlab_vm::wim::WimInstr;

    #[test]
    fn canonical_text_is_flat() {
        let mut program = Program::new(vec![MamaInstr::Loadc(1)]);
        program.define_label_here("L0").unwrap();
        program.push(MamaInstr::Jump(Label::new("L0")));
        assert_eq!(disassemble(&program), "loadc 1\nL0:\njump L0\n");
    }

    #[test]
    fn listing_shows_addresses() {
        let mut program = Program::new(vec![WimInstr::Init(Label::new("fail"))]);
        program.push(WimInstr::Halt(Vec::new()));
        program.define_label_here("fail").unwrap();
        program.push(WimInstr::No);
        assert_eq!(
            listing(&program),
            "    0  init fail\n    1  halt\nfail:\n    2  no\n"
        );
    }

    #[test]
    fn empty_program() {
        let program: Program<MamaInstr> = Program::default();
        assert_eq!(disassemble(&program), "");
        assert_eq!(listing(&program), "");
    }
}
