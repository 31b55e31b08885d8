//! The instruction set of compiled Sieve scripts.
//!
//! Tests evaluate to booleans on a stack; commands consume the arguments
//! pushed before them.

/// Index of a constant in the current code chunk.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstantIdx(pub usize);

/// Index of an instruction in the current code chunk.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeIdx(pub usize);

/// Offset by which an instruction pointer should change in a jump,
/// relative to the instruction following the jump.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JumpOffset(pub usize);

/// Provided count for an instruction (e.g. a number of arguments).
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Count(pub usize);

#[warn(variant_size_differences)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// Push a constant argument.
    OpConstant(ConstantIdx),

    /// Push `true`.
    OpTrue,

    /// Push `false`.
    OpFalse,

    /// Invert the boolean at the top of the stack.
    OpNot,

    /// Replace the given number of booleans with their conjunction.
    OpAllOf(Count),

    /// Replace the given number of booleans with their disjunction.
    OpAnyOf(Count),

    /// Run the test named by the constant, consuming the given number of
    /// arguments and pushing its result.
    OpTest(ConstantIdx, Count),

    /// Run the command named by the constant, consuming the given number
    /// of arguments.
    OpCommand(ConstantIdx, Count),

    // Control flow
    OpJump(JumpOffset),

    /// Pop a boolean, and jump if it is false.
    OpJumpIfFalse(JumpOffset),

    /// End execution of the script.
    OpStop,
}

impl OpCode {
    /// Numeric tag of the instruction in emitted bytecode.
    pub fn code(&self) -> u64 {
        match self {
            OpCode::OpConstant(_) => 1,
            OpCode::OpTrue => 2,
            OpCode::OpFalse => 3,
            OpCode::OpNot => 4,
            OpCode::OpAllOf(_) => 5,
            OpCode::OpAnyOf(_) => 6,
            OpCode::OpTest(_, _) => 7,
            OpCode::OpCommand(_, _) => 8,
            OpCode::OpJump(_) => 9,
            OpCode::OpJumpIfFalse(_) => 10,
            OpCode::OpStop => 11,
        }
    }
}
