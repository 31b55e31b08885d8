//! Serialization of a [Chunk] into the bytecode file format.
//!
//! The format starts with [MAGIC] and the format [VERSION], followed by the
//! constant pool, the instructions and the line table. All integers are u64,
//! LE-encoded. Byte strings are prefixed with their length and padded with
//! null bytes to the next 8 byte boundary.
use std::io::{self, Write};

use crate::chunk::{Chunk, Constant};
use crate::opcode::OpCode;

pub const MAGIC: &[u8; 8] = b"SIEVEBC\0";
pub const VERSION: u64 = 1;

/// 8 null bytes, used to write out padding.
const EMPTY_BYTES: &[u8; 8] = &[0u8; 8];

const CONSTANT_STRING: u64 = 0;
const CONSTANT_STRING_LIST: u64 = 1;
const CONSTANT_NUMBER: u64 = 2;
const CONSTANT_TAG: u64 = 3;
const CONSTANT_IDENTIFIER: u64 = 4;

/// Computes the number of bytes we should add to len (a length in
/// bytes) to be aligned on 64 bits (8 bytes).
fn padding_len(len: u64) -> u8 {
    let modulo = len % 8;
    if modulo == 0 {
        0
    } else {
        8 - modulo as u8
    }
}

fn write_u64(w: &mut dyn Write, value: u64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_usize(w: &mut dyn Write, value: usize) -> io::Result<()> {
    write_u64(w, value as u64)
}

fn write_bytes(w: &mut dyn Write, b: &[u8]) -> io::Result<()> {
    write_usize(w, b.len())?;
    w.write_all(b)?;

    let padding_len = padding_len(b.len() as u64) as usize;
    if padding_len != 0 {
        w.write_all(&EMPTY_BYTES[..padding_len])?;
    }
    Ok(())
}

fn write_constant(w: &mut dyn Write, constant: &Constant) -> io::Result<()> {
    match constant {
        Constant::String(s) => {
            write_u64(w, CONSTANT_STRING)?;
            write_bytes(w, s.as_bytes())
        }
        Constant::StringList(list) => {
            write_u64(w, CONSTANT_STRING_LIST)?;
            write_usize(w, list.len())?;
            for s in list {
                write_bytes(w, s.as_bytes())?;
            }
            Ok(())
        }
        Constant::Number(n) => {
            write_u64(w, CONSTANT_NUMBER)?;
            write_u64(w, *n)
        }
        Constant::Tag(tag) => {
            write_u64(w, CONSTANT_TAG)?;
            write_bytes(w, tag.as_bytes())
        }
        Constant::Identifier(identifier) => {
            write_u64(w, CONSTANT_IDENTIFIER)?;
            write_bytes(w, identifier.as_bytes())
        }
    }
}

/// Writes an instruction: its code, followed by its operands.
fn write_op(w: &mut dyn Write, op: &OpCode) -> io::Result<()> {
    write_u64(w, op.code())?;
    match *op {
        OpCode::OpConstant(c) => write_usize(w, c.0),
        OpCode::OpAllOf(n) | OpCode::OpAnyOf(n) => write_usize(w, n.0),
        OpCode::OpTest(c, n) | OpCode::OpCommand(c, n) => {
            write_usize(w, c.0)?;
            write_usize(w, n.0)
        }
        OpCode::OpJump(offset) | OpCode::OpJumpIfFalse(offset) => write_usize(w, offset.0),
        OpCode::OpTrue | OpCode::OpFalse | OpCode::OpNot | OpCode::OpStop => Ok(()),
    }
}

/// Writes the bytecode representation of a chunk.
pub fn emit(chunk: &Chunk, w: &mut dyn Write) -> io::Result<()> {
    w.write_all(MAGIC)?;
    write_u64(w, VERSION)?;

    write_usize(w, chunk.constants.len())?;
    for constant in &chunk.constants {
        write_constant(w, constant)?;
    }

    write_usize(w, chunk.code.len())?;
    for op in &chunk.code {
        write_op(w, op)?;
    }

    write_usize(w, chunk.lines().len())?;
    for run in chunk.lines() {
        write_usize(w, run.line)?;
        write_usize(w, run.count)?;
    }

    w.flush()
}

#[cfg(test)]
mod tests {
    use super::{emit, padding_len, MAGIC, VERSION};
    use crate::chunk::{Chunk, Constant};
    use crate::opcode::{ConstantIdx, Count, OpCode};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, 0)]
    #[case::one(1, 7)]
    #[case::seven(7, 1)]
    #[case::eight(8, 0)]
    #[case::nine(9, 7)]
    fn padding(#[case] len: u64, #[case] expected: u8) {
        assert_eq!(expected, padding_len(len));
    }

    #[test]
    fn emit_keep() {
        let mut chunk = Chunk::default();
        let keep = chunk.push_constant(Constant::Identifier("keep".into()));
        chunk.push_op(OpCode::OpCommand(keep, Count(0)), 1);
        chunk.push_op(OpCode::OpStop, 1);

        let mut buf = Vec::new();
        emit(&chunk, &mut buf).expect("must emit");

        let mut expected = Vec::new();
        expected.extend_from_slice(MAGIC);
        for n in [VERSION, 1, 4, 4] {
            expected.extend_from_slice(&n.to_le_bytes());
        }
        expected.extend_from_slice(b"keep\0\0\0\0");
        for n in [2u64, 8, 0, 0, 11, 1, 1, 2] {
            expected.extend_from_slice(&n.to_le_bytes());
        }

        assert_eq!(expected, buf);
    }

    #[test]
    fn emit_string_list() {
        let mut chunk = Chunk::default();
        let idx = chunk.push_constant(Constant::StringList(vec!["a".into(), "12345678".into()]));
        chunk.push_op(OpCode::OpConstant(idx), 1);
        assert_eq!(ConstantIdx(0), idx);

        let mut buf = Vec::new();
        emit(&chunk, &mut buf).expect("must emit");

        // magic, version, constant count, kind, list length
        let list = &buf[5 * 8..];
        assert_eq!(&1u64.to_le_bytes(), &list[..8]);
        assert_eq!(b"a\0\0\0\0\0\0\0", &list[8..16]);
        assert_eq!(&8u64.to_le_bytes(), &list[16..24]);
        assert_eq!(b"12345678", &list[24..32]);
    }

    /// Failures of the writer are passed through.
    #[test]
    fn emit_write_error() {
        struct Broken;
        impl std::io::Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "broken"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut chunk = Chunk::default();
        chunk.push_op(OpCode::OpStop, 1);
        assert!(emit(&chunk, &mut Broken).is_err());
    }
}
