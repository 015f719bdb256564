//! vmlab assembler: text <-> instruction streams for both machines.
//!
//! The assembler is a mechanical 1:1 translation. Every line holds at most
//! one instruction, written as a mnemonic followed by its single textual
//! parameter, optionally preceded by `label:` definitions. Comments start
//! with `;`. Mnemonics are case-insensitive.
//!
//! # Usage
//!
//! ```
//! use vmlab_assembler::{assemble_mama, disassemble};
//!
//! let text = "loadc 6\nloadc 7\nopbin *\nmkbasic\nhalt\n";
//! let program = assemble_mama(text).unwrap();
//! assert_eq!(disassemble(&program), text);
//! ```
//!
//! # Roundtrip Guarantee
//!
//! `assemble(disassemble(program)) == program` holds for every linked
//! program. The disassembler outputs canonical text; the assembler also
//! accepts indentation, comments, upper-case mnemonics and alternative
//! operator spellings.

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use disassembler::{disassemble, listing};
pub use error::AsmError;

use lexer::split_line;
use parser::{lookup_mnemonic, Operand, ParseInstruction};
use vmlab_vm::mama::MamaInstr;
use vmlab_vm::wim::WimInstr;
use vmlab_vm::{Instruction, Program};

/// Assemble MaMa text into a linked program.
///
/// Returns the first error encountered.
pub fn assemble_mama(text: &str) -> Result<Program<MamaInstr>, AsmError> {
    assemble(text)
}

/// Assemble WiM text into a linked program.
///
/// Returns the first error encountered.
pub fn assemble_wim(text: &str) -> Result<Program<WimInstr>, AsmError> {
    assemble(text)
}

fn assemble<I: Instruction + ParseInstruction>(text: &str) -> Result<Program<I>, AsmError> {
    let mut program = Program::default();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let source = split_line(line, line_num)?;
        for name in source.labels {
            program
                .define_label_here(name)
                .map_err(|_| AsmError::DuplicateLabel {
                    line: line_num,
                    name: name.to_string(),
                })?;
        }
        if let Some(token) = source.mnemonic {
            let mnemonic = lookup_mnemonic(I::MNEMONICS, &token, line_num)?;
            let instr = I::parse(&Operand {
                mnemonic,
                param: source.param,
                line: line_num,
            })?;
            program.push(instr);
        }
    }

    Ok(program.link()?)
}
