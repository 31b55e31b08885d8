//! A compiler for Sieve mail filtering scripts (RFC 5228), producing the
//! bytecode stored by [sieve_store::Repository].
//!
//! Scripts are parsed into an [ast::Script], checked, lowered into a
//! [chunk::Chunk] of [opcode::OpCode]s, and finally serialized.
use std::io::Write;

use sieve_store::{Diagnostics, ScriptCompiler};

pub mod ast;
pub mod chunk;
pub mod disassembler;
pub mod emit;
mod errors;
pub mod generate;
pub mod opcode;
pub mod parser;
pub mod validate;

pub use errors::{Diagnostic, GenerateError};

#[cfg(test)]
mod tests;

/// The compiler used for scripts stored in a repository.
#[derive(Clone, Copy, Debug, Default)]
pub struct SieveCompiler;

impl ScriptCompiler for SieveCompiler {
    type Script = ast::Script;
    type Bytecode = chunk::Chunk;

    fn parse(&self, source: &str) -> Result<Self::Script, Diagnostics> {
        let script =
            parser::parse(source).map_err(|diagnostic| Diagnostics::from(diagnostic.to_string()))?;

        validate::validate(&script).map_err(|problems| {
            let mut diagnostics = Diagnostics::new();
            for problem in problems {
                diagnostics.push(problem.to_string());
            }
            diagnostics
        })?;

        Ok(script)
    }

    fn generate(&self, script: &Self::Script) -> Result<Self::Bytecode, sieve_store::GenerateError> {
        Ok(generate::generate(script)?)
    }

    fn emit(&self, bytecode: &Self::Bytecode, w: &mut dyn Write) -> std::io::Result<()> {
        emit::emit(bytecode, w)
    }
}
