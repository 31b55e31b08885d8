//! Lowers a validated script into a [Chunk].
use tracing::{debug, instrument};

use crate::ast::{Argument, Command, Script, Test};
use crate::chunk::{Chunk, Constant};
use crate::errors::GenerateError;
use crate::opcode::{CodeIdx, ConstantIdx, Count, JumpOffset, OpCode};

/// Blocks may be nested this deep, but no deeper.
pub const MAX_NESTING: usize = 32;

#[derive(Default)]
struct Generator {
    chunk: Chunk,
    depth: usize,
    /// Line of the most recently compiled command or test.
    line: usize,
}

impl Generator {
    fn push_op(&mut self, op: OpCode) -> CodeIdx {
        self.chunk.push_op(op, self.line)
    }

    fn push_constant(&mut self, constant: Constant) -> ConstantIdx {
        self.chunk.push_constant(constant)
    }

    /// Points the jump at `idx` to the next instruction to be emitted.
    fn patch_jump(&mut self, idx: CodeIdx) {
        let offset = JumpOffset(self.chunk.code.len() - 1 - idx.0);

        match &mut self.chunk.code[idx.0] {
            OpCode::OpJump(n) | OpCode::OpJumpIfFalse(n) => {
                *n = offset;
            }

            op => panic!("attempted to patch unsupported op: {:?}", op),
        }
    }

    /// Pushes all arguments, returning how many there were.
    fn arguments(&mut self, args: &[Argument]) -> Count {
        for arg in args {
            let constant = match arg {
                Argument::Tag(tag) => Constant::Tag(tag.clone()),
                Argument::Number(n) => Constant::Number(*n),
                Argument::String(s) => Constant::String(s.clone()),
                Argument::StringList(list) => Constant::StringList(list.clone()),
            };
            let idx = self.push_constant(constant);
            self.push_op(OpCode::OpConstant(idx));
        }
        Count(args.len())
    }

    fn test(&mut self, test: &Test) {
        self.line = test.line;
        match test.identifier.as_str() {
            "true" => {
                self.push_op(OpCode::OpTrue);
            }
            "false" => {
                self.push_op(OpCode::OpFalse);
            }
            "not" => {
                for inner in test.arguments.tests() {
                    self.test(inner);
                }
                self.line = test.line;
                self.push_op(OpCode::OpNot);
            }
            name @ ("allof" | "anyof") => {
                let tests = test.arguments.tests();
                for inner in tests {
                    self.test(inner);
                }
                self.line = test.line;
                let count = Count(tests.len());
                self.push_op(if name == "allof" {
                    OpCode::OpAllOf(count)
                } else {
                    OpCode::OpAnyOf(count)
                });
            }
            name => {
                let count = self.arguments(&test.arguments.args);
                let name = self.push_constant(Constant::Identifier(name.to_string()));
                self.push_op(OpCode::OpTest(name, count));
            }
        }
    }

    /// Compiles the block of a control command one level deeper.
    fn body(&mut self, command: &Command) -> Result<(), GenerateError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(GenerateError::NestingTooDeep {
                line: command.line,
                max: MAX_NESTING,
            });
        }

        self.block(command.block.as_deref().unwrap_or_default())?;
        self.depth -= 1;
        Ok(())
    }

    fn block(&mut self, commands: &[Command]) -> Result<(), GenerateError> {
        // Jumps from the ends of the branches of the current if chain to
        // its end.
        let mut chain_jumps: Vec<CodeIdx> = vec![];

        for (i, command) in commands.iter().enumerate() {
            self.line = command.line;

            match command.identifier.as_str() {
                "require" => {}

                "if" | "elsif" => {
                    for test in command.arguments.tests() {
                        self.test(test);
                    }
                    self.line = command.line;
                    let skip = self.push_op(OpCode::OpJumpIfFalse(JumpOffset(0)));

                    self.body(command)?;

                    let chain_continues = matches!(
                        commands.get(i + 1).map(|next| next.identifier.as_str()),
                        Some("elsif" | "else")
                    );
                    if chain_continues {
                        chain_jumps.push(self.push_op(OpCode::OpJump(JumpOffset(0))));
                    }

                    self.patch_jump(skip);

                    if !chain_continues {
                        for jump in chain_jumps.drain(..) {
                            self.patch_jump(jump);
                        }
                    }
                }

                "else" => {
                    self.body(command)?;
                    for jump in chain_jumps.drain(..) {
                        self.patch_jump(jump);
                    }
                }

                "stop" => {
                    self.push_op(OpCode::OpStop);
                }

                name => {
                    let count = self.arguments(&command.arguments.args);
                    let name = self.push_constant(Constant::Identifier(name.to_string()));
                    self.push_op(OpCode::OpCommand(name, count));
                }
            }
        }

        Ok(())
    }
}

/// Generates bytecode for a validated script.
/// The program ends with an implicit `stop`.
#[instrument(skip_all, fields(script.commands = script.commands.len()))]
pub fn generate(script: &Script) -> Result<Chunk, GenerateError> {
    let mut generator = Generator {
        line: 1,
        ..Default::default()
    };

    generator.block(&script.commands)?;
    generator.push_op(OpCode::OpStop);

    debug!(
        ops = generator.chunk.code.len(),
        constants = generator.chunk.constants.len(),
        "generated bytecode"
    );

    Ok(generator.chunk)
}
