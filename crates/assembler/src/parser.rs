//! Parsers from a mnemonic and its parameter text to an instruction.
//!
//! Each machine has its own dispatch; the parameter readers on [`Operand`]
//! are shared. Label references come out unresolved and are fixed up when
//! the whole program is linked.

use std::str::FromStr;

use vmlab_common::Label;
use vmlab_vm::mama::{self, BinOp, MamaInstr, UnOp};
use vmlab_vm::wim::{self, ClauseKey, Constant, Functor, WimInstr};

use crate::error::AsmError;
use crate::lexer::split_word;

/// A machine whose instructions can be read back from text.
pub(crate) trait ParseInstruction: Sized {
    const MNEMONICS: &'static [&'static str];

    fn parse(operand: &Operand<'_>) -> Result<Self, AsmError>;
}

/// The parameter of one instruction, with enough context for errors.
pub(crate) struct Operand<'a> {
    pub mnemonic: &'static str,
    pub param: Option<&'a str>,
    pub line: usize,
}

impl<'a> Operand<'a> {
    fn none(&self) -> Result<(), AsmError> {
        match self.param {
            None => Ok(()),
            Some(param) => Err(self.unexpected(param)),
        }
    }

    fn text(&self) -> Result<&'a str, AsmError> {
        self.param.ok_or(AsmError::MissingParameter {
            line: self.line,
            mnemonic: self.mnemonic,
        })
    }

    /// The parameter as exactly one word.
    fn word(&self) -> Result<&'a str, AsmError> {
        let (word, rest) = split_word(self.text()?);
        if !rest.is_empty() {
            return Err(self.unexpected(rest));
        }
        Ok(word)
    }

    /// First word and the non-empty remainder.
    fn pair(&self) -> Result<(&'a str, &'a str), AsmError> {
        let (first, rest) = split_word(self.text()?);
        if rest.is_empty() {
            return Err(AsmError::MissingParameter {
                line: self.line,
                mnemonic: self.mnemonic,
            });
        }
        Ok((first, rest))
    }

    fn number<T: FromStr>(&self, token: &str) -> Result<T, AsmError> {
        token.parse().map_err(|_| AsmError::InvalidNumber {
            line: self.line,
            token: token.to_string(),
        })
    }

    fn count(&self) -> Result<usize, AsmError> {
        self.number(self.word()?)
    }

    fn label(&self) -> Result<Label, AsmError> {
        Ok(Label::new(self.word()?))
    }

    fn functor(&self, token: &str) -> Result<Functor, AsmError> {
        Functor::parse(token).ok_or_else(|| AsmError::InvalidFunctor {
            line: self.line,
            token: token.to_string(),
        })
    }

    fn operator<T>(&self, parse: impl Fn(&str) -> Option<T>) -> Result<T, AsmError> {
        let token = self.word()?;
        parse(token).ok_or_else(|| AsmError::InvalidOperator {
            line: self.line,
            token: token.to_string(),
        })
    }

    fn unexpected(&self, param: &str) -> AsmError {
        AsmError::UnexpectedParameter {
            line: self.line,
            mnemonic: self.mnemonic,
            param: param.to_string(),
        }
    }
}

/// Find the canonical spelling of an already lowercased mnemonic.
pub(crate) fn lookup_mnemonic(
    mnemonics: &'static [&'static str],
    token: &str,
    line: usize,
) -> Result<&'static str, AsmError> {
    mnemonics
        .iter()
        .find(|m| **m == token)
        .copied()
        .ok_or_else(|| AsmError::UnknownMnemonic {
            line,
            token: token.to_string(),
        })
}

impl ParseInstruction for MamaInstr {
    const MNEMONICS: &'static [&'static str] = &mama::MNEMONICS;

    fn parse(op: &Operand<'_>) -> Result<Self, AsmError> {
        let instr = match op.mnemonic {
            "loadc" => MamaInstr::Loadc(op.number(op.word()?)?),
            "opbin" => MamaInstr::Opbin(op.operator(BinOp::from_symbol)?),
            "opun" => MamaInstr::Opun(op.operator(UnOp::from_symbol)?),

            "jump" => MamaInstr::Jump(op.label()?),
            "jumpz" => MamaInstr::Jumpz(op.label()?),
            "mkclos" => MamaInstr::Mkclos(op.label()?),
            "mark" => MamaInstr::Mark(op.label()?),
            "mkfunval" => {
                let (label, name) = op.pair()?;
                MamaInstr::Mkfunval(Label::new(label), name.to_string())
            }

            "pushloc" => MamaInstr::Pushloc(op.count()?),
            "pushglob" => MamaInstr::Pushglob(op.count()?),
            "slide" => MamaInstr::Slide(op.count()?),
            "mkvec" => MamaInstr::Mkvec(op.count()?),
            "targ" => MamaInstr::Targ(op.count()?),
            "return" => MamaInstr::Return(op.count()?),
            "rewrite" => MamaInstr::Rewrite(op.count()?),
            "alloc" => MamaInstr::Alloc(op.count()?),

            bare => {
                op.none()?;
                match bare {
                    "mkbasic" => MamaInstr::Mkbasic,
                    "getbasic" => MamaInstr::Getbasic,
                    "apply" => MamaInstr::Apply,
                    "eval" => MamaInstr::Eval,
                    "update" => MamaInstr::Update,
                    "cons" => MamaInstr::Cons,
                    "nil" => MamaInstr::Nil,
                    "hd" => MamaInstr::Hd,
                    "tl" => MamaInstr::Tl,
                    "isnil" => MamaInstr::Isnil,
                    "halt" => MamaInstr::Halt,
                    other => {
                        return Err(AsmError::UnknownMnemonic {
                            line: op.line,
                            token: other.to_string(),
                        })
                    }
                }
            }
        };
        Ok(instr)
    }
}

impl ParseInstruction for WimInstr {
    const MNEMONICS: &'static [&'static str] = &wim::MNEMONICS;

    fn parse(op: &Operand<'_>) -> Result<Self, AsmError> {
        let instr = match op.mnemonic {
            "init" => WimInstr::Init(op.label()?),
            "pushenv" => WimInstr::Pushenv(op.count()?),
            "call" => {
                let (target, rest) = split_word(op.text()?);
                let arity = if rest.is_empty() {
                    op.functor(target)?.arity
                } else {
                    let (arity, extra) = split_word(rest);
                    if !extra.is_empty() {
                        return Err(op.unexpected(extra));
                    }
                    op.number(arity)?
                };
                WimInstr::Call(Label::new(target), arity)
            }

            "putatom" => WimInstr::Putatom(Constant::parse(op.word()?)),
            "putvar" => WimInstr::Putvar(op.count()?),
            "putref" => WimInstr::Putref(op.count()?),
            "putstruct" => WimInstr::Putstruct(op.functor(op.word()?)?),

            "uatom" => WimInstr::Uatom(Constant::parse(op.word()?)),
            "uvar" => WimInstr::Uvar(op.count()?),
            "uref" => WimInstr::Uref(op.count()?),
            "ustruct" => WimInstr::Ustruct(op.functor(op.word()?)?),

            "nextalt" => {
                let (label, key) = op.pair()?;
                WimInstr::Nextalt(Label::new(label), ClauseKey::parse(key))
            }
            "halt" => {
                let names = op.param.unwrap_or_default();
                WimInstr::Halt(names.split_whitespace().map(str::to_string).collect())
            }

            bare => {
                op.none()?;
                match bare {
                    "popenv" => WimInstr::Popenv,
                    "enter" => WimInstr::Enter,
                    "down" => WimInstr::Down,
                    "brother" => WimInstr::Brother,
                    "up" => WimInstr::Up,
                    "setbtp" => WimInstr::Setbtp,
                    "delbtp" => WimInstr::Delbtp,
                    "no" => WimInstr::No,
                    other => {
                        return Err(AsmError::UnknownMnemonic {
                            line: op.line,
                            token: other.to_string(),
                        })
                    }
                }
            }
        };
        Ok(instr)
    }
}
