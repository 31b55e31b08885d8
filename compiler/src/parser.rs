//! Parser for the Sieve grammar of RFC 5228, built from nom combinators.
//!
//! Identifiers and tags are case-insensitive and stored lowercased.
use std::cell::Cell;

use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_while};
use nom::character::complete::{anychar, char as nomchar, digit1, line_ending, multispace1, one_of, satisfy};
use nom::combinator::{map, opt, recognize, value};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;

use crate::ast::{Argument, Arguments, Command, Script, Test, Tests};
use crate::errors::Diagnostic;

/// Blocks and tests nested deeper than this are rejected while parsing,
/// before recursion can exhaust the stack.
const MAX_PARSE_DEPTH: usize = 64;

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

#[derive(Debug, PartialEq)]
struct SyntaxError<'a> {
    input: &'a str,
    kind: SyntaxErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
enum SyntaxErrorKind {
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated multi-line string")]
    UnterminatedText,
    #[error("number too large")]
    NumberTooLarge,
    #[error("nesting too deep")]
    NestingTooDeep,
    #[error("unexpected input")]
    Nom,
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            kind: SyntaxErrorKind::Nom,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn fail<O>(input: &str, kind: SyntaxErrorKind) -> PResult<'_, O> {
    Err(nom::Err::Failure(SyntaxError { input, kind }))
}

/// Turns a recoverable error of `f` into a failure, reporting what was
/// expected at that position.
fn expect<'a, O, F>(what: &'static str, mut f: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    move |i| match f(i) {
        Err(nom::Err::Error(_)) => fail(i, SyntaxErrorKind::Expected(what)),
        other => other,
    }
}

fn hash_comment(i: &str) -> PResult<()> {
    value((), pair(nomchar('#'), take_while(|c: char| c != '\n')))(i)
}

fn bracket_comment(i: &str) -> PResult<()> {
    let (rest, _) = tag::<_, _, SyntaxError>("/*")(i)?;
    match rest.find("*/") {
        Some(end) => Ok((&rest[end + 2..], ())),
        None => fail(i, SyntaxErrorKind::UnterminatedComment),
    }
}

/// Skips whitespace and comments.
fn ws(i: &str) -> PResult<()> {
    value(
        (),
        many0(alt((value((), multispace1), hash_comment, bracket_comment))),
    )(i)
}

/// Runs `f`, then skips trailing whitespace and comments.
fn token<'a, O, F>(f: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    terminated(f, ws)
}

fn identifier(i: &str) -> PResult<String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        str::to_ascii_lowercase,
    )(i)
}

/// Parses a number with an optional `K`, `M` or `G` quantifier.
fn number(i: &str) -> PResult<u64> {
    let (rest, digits) = digit1::<_, SyntaxError>(i)?;
    let (rest, quantifier) = opt(one_of::<_, _, SyntaxError>("KkMmGg"))(rest)?;
    let shift = match quantifier {
        Some('K' | 'k') => 10,
        Some('M' | 'm') => 20,
        Some('G' | 'g') => 30,
        _ => 0,
    };

    match digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(1 << shift))
    {
        Some(n) => Ok((rest, n)),
        None => fail(i, SyntaxErrorKind::NumberTooLarge),
    }
}

/// Parses a string in double quotes. A backslash takes the following
/// character literally.
fn quoted_string(i: &str) -> PResult<String> {
    let (rest, _) = nomchar::<_, SyntaxError>('"')(i)?;
    let (rest, s) = alt((
        escaped_transform(is_not("\"\\"), '\\', anychar),
        map(tag::<_, _, SyntaxError>(""), |_| String::new()),
    ))(rest)?;

    match nomchar::<_, SyntaxError>('"')(rest) {
        Ok((rest, _)) => Ok((rest, s)),
        Err(_) => fail(i, SyntaxErrorKind::UnterminatedString),
    }
}

/// Parses a `text:` string, which extends up to a line containing only
/// a dot. A leading dot on any other line is removed.
fn multiline_string(i: &str) -> PResult<String> {
    let (rest, _) = tag_no_case::<_, _, SyntaxError>("text:")(i)?;
    let (rest, _) = take_while::<_, _, SyntaxError>(|c: char| c == ' ' || c == '\t')(rest)?;
    let (rest, _) = opt(hash_comment)(rest)?;
    let (mut rest, _) = expect("line break after text:", line_ending)(rest)?;

    let mut out = String::new();
    loop {
        if rest.is_empty() {
            return fail(i, SyntaxErrorKind::UnterminatedText);
        }

        let (line, next) = match rest.find('\n') {
            Some(n) => rest.split_at(n + 1),
            None => (rest, ""),
        };

        if line.trim_end_matches(['\r', '\n']) == "." {
            return Ok((next, out));
        }

        out.push_str(line.strip_prefix('.').unwrap_or(line));
        rest = next;
    }
}

fn string(i: &str) -> PResult<String> {
    alt((quoted_string, multiline_string))(i)
}

fn string_list(i: &str) -> PResult<Vec<String>> {
    delimited(
        token(nomchar('[')),
        separated_list1(token(nomchar(',')), token(string)),
        expect("']'", token(nomchar(']'))),
    )(i)
}

fn argument(i: &str) -> PResult<Argument> {
    alt((
        map(string_list, Argument::StringList),
        map(token(string), Argument::String),
        map(token(number), Argument::Number),
        map(token(preceded(nomchar(':'), identifier)), Argument::Tag),
    ))(i)
}

/// Describes the input at an error position.
fn found(input: &str) -> String {
    match input.split_whitespace().next() {
        None => "end of script".to_string(),
        Some(word) => format!("{:?}", word.chars().take(16).collect::<String>()),
    }
}

struct Parser<'a> {
    src: &'a str,
    /// Byte offsets at which lines start.
    line_starts: Vec<usize>,
    depth: Cell<usize>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(n, _)| n + 1))
            .collect();

        Self {
            src,
            line_starts,
            depth: Cell::new(0),
        }
    }

    /// Returns the 1-indexed line of a position, given as the remaining
    /// input.
    fn line(&self, i: &str) -> usize {
        let offset = self.src.len() - i.len();
        self.line_starts.partition_point(|start| *start <= offset)
    }

    fn diagnostic(&self, input: &str, kind: &SyntaxErrorKind) -> Diagnostic {
        let message = match kind {
            SyntaxErrorKind::Nom => format!("unexpected {}", found(input)),
            SyntaxErrorKind::Expected(_) => format!("{}, found {}", kind, found(input)),
            kind => kind.to_string(),
        };
        Diagnostic::new(self.line(input), message)
    }

    /// Runs `f` one nesting level deeper.
    fn nested<O, F>(&self, i: &'a str, f: F) -> PResult<'a, O>
    where
        F: FnOnce(&'a str) -> PResult<'a, O>,
    {
        if self.depth.get() >= MAX_PARSE_DEPTH {
            return fail(i, SyntaxErrorKind::NestingTooDeep);
        }
        self.depth.set(self.depth.get() + 1);
        let result = f(i);
        self.depth.set(self.depth.get() - 1);
        result
    }

    fn test(&self, i: &'a str) -> PResult<'a, Test> {
        self.nested(i, |i| {
            let line = self.line(i);
            let (rest, identifier) = token(identifier)(i)?;
            let (rest, arguments) = self.arguments(rest)?;
            Ok((
                rest,
                Test {
                    identifier,
                    line,
                    arguments,
                },
            ))
        })
    }

    fn test_list(&self, i: &'a str) -> PResult<'a, Vec<Test>> {
        delimited(
            token(nomchar('(')),
            separated_list1(token(nomchar(',')), |i| self.test(i)),
            expect("')'", token(nomchar(')'))),
        )(i)
    }

    fn arguments(&self, i: &'a str) -> PResult<'a, Arguments> {
        let (rest, args) = many0(argument)(i)?;
        let (rest, tests) = opt(alt((
            map(|i| self.test_list(i), Tests::List),
            map(|i| self.test(i), |test| Tests::Single(Box::new(test))),
        )))(rest)?;

        Ok((rest, Arguments { args, tests }))
    }

    fn block(&self, i: &'a str) -> PResult<'a, Vec<Command>> {
        self.nested(i, |i| {
            delimited(
                token(nomchar('{')),
                many0(|i| self.command(i)),
                expect("'}'", token(nomchar('}'))),
            )(i)
        })
    }

    fn command(&self, i: &'a str) -> PResult<'a, Command> {
        let line = self.line(i);
        let (rest, identifier) = token(identifier)(i)?;
        let (rest, arguments) = self.arguments(rest)?;
        let (rest, block) = expect(
            "';' or block",
            alt((
                value(None, token(nomchar(';'))),
                map(|i| self.block(i), Some),
            )),
        )(rest)?;

        Ok((
            rest,
            Command {
                identifier,
                line,
                arguments,
                block,
            },
        ))
    }
}

/// Parses a script into its syntax tree.
/// Only the syntax is checked here, see [crate::validate] for semantics.
pub fn parse(source: &str) -> Result<Script, Diagnostic> {
    let parser = Parser::new(source);

    let mut script = preceded(ws, many0(|i| parser.command(i)));

    match script(source) {
        Ok(("", commands)) => Ok(Script { commands }),
        Ok((rest, _)) => Err(parser.diagnostic(rest, &SyntaxErrorKind::Expected("command"))),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(parser.diagnostic(e.input, &e.kind)),
        Err(nom::Err::Incomplete(_)) => Err(parser.diagnostic(
            "",
            &SyntaxErrorKind::Expected("more input"),
        )),
    }
}
