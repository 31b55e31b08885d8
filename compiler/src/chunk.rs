use std::io::Write;
use std::ops::Index;

use crate::opcode::{CodeIdx, ConstantIdx, OpCode};

/// Values referenced by instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    String(String),
    StringList(Vec<String>),
    Number(u64),
    /// A tagged argument, without the colon.
    Tag(String),
    /// The name of a command or test.
    Identifier(String),
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::StringList(list) => write!(f, "{:?}", list),
            Constant::Number(n) => write!(f, "{}", n),
            Constant::Tag(t) => write!(f, ":{}", t),
            Constant::Identifier(i) => f.write_str(i),
        }
    }
}

/// Number of consecutive instructions compiled from the same source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRun {
    pub line: usize,
    pub count: usize,
}

/// A chunk is a sequence of bytecode instructions, the constants they
/// reference, and the source lines they were compiled from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    pub code: Vec<OpCode>,
    pub constants: Vec<Constant>,
    lines: Vec<LineRun>,
}

impl Index<ConstantIdx> for Chunk {
    type Output = Constant;

    fn index(&self, index: ConstantIdx) -> &Self::Output {
        &self.constants[index.0]
    }
}

impl Index<CodeIdx> for Chunk {
    type Output = OpCode;

    fn index(&self, index: CodeIdx) -> &Self::Output {
        &self.code[index.0]
    }
}

impl Chunk {
    pub fn push_op(&mut self, data: OpCode, line: usize) -> CodeIdx {
        let idx = self.code.len();
        self.code.push(data);
        self.push_line(line);
        CodeIdx(idx)
    }

    /// Adds a constant, reusing an equal one if present.
    pub fn push_constant(&mut self, data: Constant) -> ConstantIdx {
        if let Some(idx) = self.constants.iter().position(|c| *c == data) {
            return ConstantIdx(idx);
        }

        let idx = self.constants.len();
        self.constants.push(data);
        ConstantIdx(idx)
    }

    fn push_line(&mut self, line: usize) {
        match self.lines.last_mut() {
            Some(last) if last.line == line => last.count += 1,
            _ => self.lines.push(LineRun { line, count: 1 }),
        }
    }

    pub fn lines(&self) -> &[LineRun] {
        &self.lines
    }

    /// Retrieve the source line from which the instruction at `offset`
    /// was compiled.
    pub fn get_line(&self, offset: CodeIdx) -> Option<usize> {
        let mut pos = 0;

        for run in &self.lines {
            pos += run.count;
            if pos > offset.0 {
                return Some(run.line);
            }
        }

        None
    }

    /// Write the disassembler representation of the operation at
    /// `idx` to the specified writer.
    pub fn disassemble_op<W: Write>(
        &self,
        writer: &mut W,
        width: usize,
        idx: CodeIdx,
    ) -> Result<(), std::io::Error> {
        write!(writer, "{:0width$}\t", idx.0, width = width)?;

        // Print continuation character if the previous operation was at
        // the same line, otherwise print the line.
        let line = self.get_line(idx).unwrap_or_default();
        if idx.0 > 0 && self.get_line(CodeIdx(idx.0 - 1)) == Some(line) {
            write!(writer, "   |\t")?;
        } else {
            write!(writer, "{:4}\t", line)?;
        }

        match self[idx] {
            OpCode::OpConstant(c) => writeln!(writer, "OpConstant({})", self[c]),
            OpCode::OpTest(c, n) => writeln!(writer, "OpTest({}, {})", self[c], n.0),
            OpCode::OpCommand(c, n) => writeln!(writer, "OpCommand({}, {})", self[c], n.0),
            OpCode::OpJump(offset) => {
                writeln!(writer, "OpJump(-> {})", idx.0 + 1 + offset.0)
            }
            OpCode::OpJumpIfFalse(offset) => {
                writeln!(writer, "OpJumpIfFalse(-> {})", idx.0 + 1 + offset.0)
            }
            OpCode::OpAllOf(n) => writeln!(writer, "OpAllOf({})", n.0),
            OpCode::OpAnyOf(n) => writeln!(writer, "OpAnyOf({})", n.0),
            op => writeln!(writer, "{:?}", op),
        }
    }
}
