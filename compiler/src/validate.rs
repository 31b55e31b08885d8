//! Semantic checks on a parsed script: known commands and tests, argument
//! shapes, command placement and required capabilities.
use std::collections::HashSet;
use std::fmt;

use crate::ast::{Argument, Arguments, Command, Script, Test, Tests};
use crate::errors::Diagnostic;

/// Capabilities that may be named in `require`.
pub const CAPABILITIES: &[&str] = &[
    "comparator-i;ascii-casemap",
    "comparator-i;octet",
    "envelope",
    "fileinto",
    "imap4flags",
    "reject",
    "vacation",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    String,
    /// Also accepts a single string.
    StringList,
    Number,
}

impl Kind {
    fn accepts(self, arg: &Argument) -> bool {
        matches!(
            (self, arg),
            (Kind::String, Argument::String(_))
                | (Kind::StringList, Argument::String(_) | Argument::StringList(_))
                | (Kind::Number, Argument::Number(_))
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::String => "string",
            Kind::StringList => "string list",
            Kind::Number => "number",
        })
    }
}

/// The arguments accepted by a command or test.
struct Signature {
    /// Accepted tags, and the kind of the value following them, if any.
    tags: &'static [(&'static str, Option<Kind>)],
    /// Groups of tags of which at most one may be given.
    exclusive: &'static [&'static [&'static str]],
    /// If not empty, one of these tags must be given.
    required_tag: &'static [&'static str],
    positional: &'static [Kind],
}

const MATCH_TYPES: &[&str] = &["is", "contains", "matches"];
const ADDRESS_PARTS: &[&str] = &["all", "localpart", "domain"];

const NO_ARGUMENTS: Signature = Signature {
    tags: &[],
    exclusive: &[],
    required_tag: &[],
    positional: &[],
};

const ONE_STRING: Signature = Signature {
    positional: &[Kind::String],
    ..NO_ARGUMENTS
};

const FLAGS: Signature = Signature {
    positional: &[Kind::StringList],
    ..NO_ARGUMENTS
};

const VACATION: Signature = Signature {
    tags: &[
        ("days", Some(Kind::Number)),
        ("subject", Some(Kind::String)),
        ("from", Some(Kind::String)),
        ("addresses", Some(Kind::StringList)),
        ("mime", None),
        ("handle", Some(Kind::String)),
    ],
    positional: &[Kind::String],
    ..NO_ARGUMENTS
};

const HEADER: Signature = Signature {
    tags: &[
        ("is", None),
        ("contains", None),
        ("matches", None),
        ("comparator", Some(Kind::String)),
    ],
    exclusive: &[MATCH_TYPES],
    required_tag: &[],
    positional: &[Kind::StringList, Kind::StringList],
};

const ADDRESS: Signature = Signature {
    tags: &[
        ("is", None),
        ("contains", None),
        ("matches", None),
        ("comparator", Some(Kind::String)),
        ("all", None),
        ("localpart", None),
        ("domain", None),
    ],
    exclusive: &[MATCH_TYPES, ADDRESS_PARTS],
    required_tag: &[],
    positional: &[Kind::StringList, Kind::StringList],
};

const EXISTS: Signature = Signature {
    positional: &[Kind::StringList],
    ..NO_ARGUMENTS
};

const SIZE: Signature = Signature {
    tags: &[("over", None), ("under", None)],
    exclusive: &[&["over", "under"]],
    required_tag: &["over", "under"],
    positional: &[Kind::Number],
};

/// Looks up an action, returning the capability it needs and its signature.
fn action(name: &str) -> Option<(Option<&'static str>, &'static Signature)> {
    Some(match name {
        "keep" | "discard" => (None, &NO_ARGUMENTS),
        "redirect" => (None, &ONE_STRING),
        "fileinto" => (Some("fileinto"), &ONE_STRING),
        "reject" => (Some("reject"), &ONE_STRING),
        "vacation" => (Some("vacation"), &VACATION),
        "setflag" | "addflag" | "removeflag" => (Some("imap4flags"), &FLAGS),
        _ => return None,
    })
}

/// Looks up a test that takes no nested tests.
fn simple_test(name: &str) -> Option<(Option<&'static str>, &'static Signature)> {
    Some(match name {
        "true" | "false" => (None, &NO_ARGUMENTS),
        "header" => (None, &HEADER),
        "address" => (None, &ADDRESS),
        "envelope" => (Some("envelope"), &ADDRESS),
        "exists" => (None, &EXISTS),
        "size" => (None, &SIZE),
        _ => return None,
    })
}

#[derive(Default)]
struct Validator {
    capabilities: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Validator {
    fn report(&mut self, line: usize, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(line, message));
    }

    fn require_capability(&mut self, name: &str, line: usize, capability: Option<&str>) {
        if let Some(capability) = capability {
            if !self.capabilities.contains(capability) {
                self.report(
                    line,
                    format!("{} requires the {:?} capability", name, capability),
                );
            }
        }
    }

    fn arguments(&mut self, name: &str, line: usize, args: &[Argument], signature: &Signature) {
        let mut seen_tags: Vec<&str> = Vec::new();
        let mut positional = Vec::new();

        let mut args = args.iter();
        while let Some(arg) = args.next() {
            let Argument::Tag(tag) = arg else {
                positional.push(arg);
                continue;
            };

            if !positional.is_empty() {
                self.report(line, format!(":{} must precede the other arguments", tag));
            }

            let Some((_, value)) = signature.tags.iter().find(|(t, _)| t == tag) else {
                self.report(line, format!("{} does not accept :{}", name, tag));
                continue;
            };

            if seen_tags.contains(&tag.as_str()) {
                self.report(line, format!(":{} given more than once", tag));
            } else if let Some(other) = signature
                .exclusive
                .iter()
                .filter(|group| group.contains(&tag.as_str()))
                .find_map(|group| seen_tags.iter().find(|seen| group.contains(seen)))
            {
                self.report(line, format!(":{} conflicts with :{}", tag, other));
            }
            seen_tags.push(tag);

            if let Some(kind) = value {
                match args.next() {
                    Some(arg) if kind.accepts(arg) => {}
                    _ => self.report(line, format!(":{} must be followed by a {}", tag, kind)),
                }
            }
        }

        if !signature.required_tag.is_empty()
            && !seen_tags
                .iter()
                .any(|tag| signature.required_tag.contains(tag))
        {
            self.report(
                line,
                format!(
                    "{} requires one of :{}",
                    name,
                    signature.required_tag.join(", :")
                ),
            );
        }

        if positional.len() != signature.positional.len() {
            self.report(
                line,
                format!(
                    "{} expects {} positional argument(s), got {}",
                    name,
                    signature.positional.len(),
                    positional.len()
                ),
            );
            return;
        }

        for (kind, arg) in signature.positional.iter().zip(positional) {
            if !kind.accepts(arg) {
                self.report(
                    line,
                    format!("{} expects a {}, got a {}", name, kind, arg.kind()),
                );
            }
        }
    }

    fn no_tests(&mut self, name: &str, line: usize, arguments: &Arguments) {
        if arguments.tests.is_some() {
            self.report(line, format!("{} does not take a test", name));
        }
    }

    fn test(&mut self, test: &Test) {
        let (name, line) = (test.identifier.as_str(), test.line);
        match name {
            "not" => {
                self.arguments(name, line, &test.arguments.args, &NO_ARGUMENTS);
                match &test.arguments.tests {
                    Some(Tests::Single(inner)) => self.test(inner),
                    _ => self.report(line, "not requires exactly one test"),
                }
            }
            "allof" | "anyof" => {
                self.arguments(name, line, &test.arguments.args, &NO_ARGUMENTS);
                match &test.arguments.tests {
                    Some(Tests::List(tests)) => tests.iter().for_each(|t| self.test(t)),
                    _ => self.report(line, format!("{} requires a test list", name)),
                }
            }
            _ => match simple_test(name) {
                Some((capability, signature)) => {
                    self.require_capability(name, line, capability);
                    self.no_tests(name, line, &test.arguments);
                    self.arguments(name, line, &test.arguments.args, signature);
                }
                None => self.report(line, format!("unknown test {:?}", name)),
            },
        }
    }

    fn require(&mut self, command: &Command) {
        let line = command.line;
        self.no_tests("require", line, &command.arguments);
        if command.block.is_some() {
            self.report(line, "require does not take a block");
        }

        let capabilities = match command.arguments.args.as_slice() {
            [Argument::String(capability)] => std::slice::from_ref(capability),
            [Argument::StringList(capabilities)] => capabilities.as_slice(),
            _ => {
                self.report(line, "require expects a string list of capabilities");
                return;
            }
        };

        for capability in capabilities {
            if CAPABILITIES.contains(&capability.as_str()) {
                self.capabilities.insert(capability.clone());
            } else {
                self.report(line, format!("unsupported capability {:?}", capability));
            }
        }
    }

    /// Checks `if`, `elsif` and `else`.
    fn conditional(&mut self, command: &Command) {
        let (name, line) = (command.identifier.as_str(), command.line);
        self.arguments(name, line, &command.arguments.args, &NO_ARGUMENTS);

        if name == "else" {
            self.no_tests(name, line, &command.arguments);
        } else {
            match &command.arguments.tests {
                Some(Tests::Single(test)) => self.test(test),
                _ => self.report(line, format!("{} requires exactly one test", name)),
            }
        }

        match &command.block {
            Some(block) => self.block(block, false),
            None => self.report(line, format!("{} requires a block", name)),
        }
    }

    fn block(&mut self, commands: &[Command], top_level: bool) {
        let mut require_allowed = top_level;
        let mut previous: Option<&str> = None;

        for command in commands {
            let (name, line) = (command.identifier.as_str(), command.line);

            if name == "require" {
                if !require_allowed {
                    self.report(line, "require is only allowed at the start of the script");
                }
                self.require(command);
            } else {
                require_allowed = false;
            }

            match name {
                "require" => {}
                "if" => self.conditional(command),
                "elsif" | "else" => {
                    if !matches!(previous, Some("if" | "elsif")) {
                        self.report(line, format!("{} must follow if or elsif", name));
                    }
                    self.conditional(command);
                }
                "stop" => {
                    self.no_tests(name, line, &command.arguments);
                    self.arguments(name, line, &command.arguments.args, &NO_ARGUMENTS);
                    if command.block.is_some() {
                        self.report(line, "stop does not take a block");
                    }
                }
                _ => match action(name) {
                    Some((capability, signature)) => {
                        self.require_capability(name, line, capability);
                        self.no_tests(name, line, &command.arguments);
                        self.arguments(name, line, &command.arguments.args, signature);
                        if command.block.is_some() {
                            self.report(line, format!("{} does not take a block", name));
                        }
                    }
                    None => self.report(line, format!("unknown command {:?}", name)),
                },
            }

            previous = Some(name);
        }
    }
}

/// Checks a parsed script, returning all problems found.
pub fn validate(script: &Script) -> Result<(), Vec<Diagnostic>> {
    let mut validator = Validator::default();
    validator.block(&script.commands, true);

    if validator.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(validator.diagnostics)
    }
}
