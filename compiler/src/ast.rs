//! The syntax tree of a parsed Sieve script.

/// A whole script: a sequence of commands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    pub commands: Vec<Command>,
}

/// A command such as `keep;` or `if <test> { ... }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub identifier: String,
    /// 1-indexed line the identifier starts on.
    pub line: usize,
    pub arguments: Arguments,
    /// Present if the command was followed by `{ ... }` instead of `;`.
    pub block: Option<Vec<Command>>,
}

/// A test such as `header :contains "subject" "urgent"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Test {
    pub identifier: String,
    pub line: usize,
    pub arguments: Arguments,
}

/// The arguments of a command or test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    pub args: Vec<Argument>,
    pub tests: Option<Tests>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Argument {
    /// `:name`, stored without the colon.
    Tag(String),
    Number(u64),
    String(String),
    StringList(Vec<String>),
}

/// The tests passed to a command or test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tests {
    /// A bare test, as in `if true`.
    Single(Box<Test>),
    /// A parenthesized test list, as in `allof (true, false)`.
    List(Vec<Test>),
}

impl Arguments {
    /// Iterates over all tests, regardless of how they were written.
    pub fn tests(&self) -> &[Test] {
        match &self.tests {
            None => &[],
            Some(Tests::Single(test)) => std::slice::from_ref(test.as_ref()),
            Some(Tests::List(tests)) => tests,
        }
    }
}

impl Argument {
    /// Describes the kind of argument, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Argument::Tag(_) => "tag",
            Argument::Number(_) => "number",
            Argument::String(_) => "string",
            Argument::StringList(_) => "string list",
        }
    }
}
