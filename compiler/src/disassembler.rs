//! Implements printing a human-readable representation of compiled code.
use std::io::Write;
use tabwriter::TabWriter;

use crate::chunk::Chunk;
use crate::opcode::CodeIdx;

/// Disassemble an entire chunk, printing its size and its operations
/// in human-readable format.
pub fn disassemble<W: Write>(chunk: &Chunk, w: W) -> std::io::Result<()> {
    let mut tw = TabWriter::new(w);
    writeln!(
        &mut tw,
        "=== compiled code ({} ops, {} constants) ===",
        chunk.code.len(),
        chunk.constants.len()
    )?;

    let width = format!("{}", chunk.code.len()).len();
    for idx in 0..chunk.code.len() {
        chunk.disassemble_op(&mut tw, width, CodeIdx(idx))?;
    }

    tw.flush()
}
