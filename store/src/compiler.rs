use std::fmt;
use std::io::Write;

/// Errors returned by [ScriptCompiler::generate].
pub type GenerateError = Box<dyn std::error::Error + Send + Sync>;

/// Human-readable messages describing why a script was rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl From<String> for Diagnostics {
    fn from(value: String) -> Self {
        Self {
            messages: vec![value],
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

/// Turns script source into the bytecode stored next to it.
///
/// The repository only sequences these steps and routes their failures; it
/// never looks inside the parsed or generated representations.
pub trait ScriptCompiler {
    type Script;
    type Bytecode;

    /// Parses the source. Rejections carry diagnostics meant for the user.
    fn parse(&self, source: &str) -> Result<Self::Script, Diagnostics>;

    /// Generates bytecode for a successfully parsed script.
    fn generate(&self, script: &Self::Script) -> Result<Self::Bytecode, GenerateError>;

    /// Serializes the bytecode into the given writer.
    fn emit(&self, bytecode: &Self::Bytecode, w: &mut dyn Write) -> std::io::Result<()>;
}
