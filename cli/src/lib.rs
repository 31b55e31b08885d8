use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sieve_compiler::{disassembler::disassemble, SieveCompiler};
use sieve_store::{ConfigError, Outcome, Repository, ScriptCompiler, ScriptInfo};
use tracing::{debug, instrument};

pub mod args;

pub use args::{Args, Command};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid repository address: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] sieve_store::Error),

    #[error("unable to read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not valid UTF-8: {source}", .path.display())]
    InputNotUtf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("unable to write output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::Config(_) => Outcome::Fail,
            Error::Repository(e) => e.outcome(),
            Error::InputNotUtf8 { .. } => Outcome::Invalid,
            Error::ReadInput { .. } | Error::Output(_) => Outcome::IoError,
        }
    }
}

/// The process exit code reported for an outcome.
pub fn exit_code(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Ok => 0,
        Outcome::NotFound => 2,
        Outcome::Invalid => 3,
        Outcome::Fail => 4,
        Outcome::IoError => 5,
    }
}

fn read_input<R: Read>(file: Option<&Path>, mut stdin: R) -> Result<String, Error> {
    let path = file.unwrap_or(Path::new("-"));
    let mut source = Vec::new();
    let result = match file {
        Some(path) => std::fs::File::open(path).and_then(|mut f| f.read_to_end(&mut source)),
        None => stdin.read_to_end(&mut source),
    };

    result.map_err(|source| Error::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(source).map_err(|source| Error::InputNotUtf8 {
        path: path.to_path_buf(),
        source,
    })
}

/// Compiles a script without touching any repository.
fn check<W: Write>(file: &Path, dump_bytecode: bool, stdout: &mut W) -> Result<(), Error> {
    let source = read_input(Some(file), io::empty())?;
    let script = SieveCompiler
        .parse(&source)
        .map_err(|diagnostics| sieve_store::Error::InvalidScript(diagnostics.to_string()))?;
    let chunk = SieveCompiler.generate(&script).map_err(|e| {
        sieve_store::Error::ProcessingFailed(format!("unable to generate bytecode: {}", e))
    })?;

    if dump_bytecode {
        disassemble(&chunk, stdout)?;
    }
    Ok(())
}

/// Runs a single command.
/// Input for `put` is read from `stdin` if no file is given, and all
/// regular output goes to `stdout`.
#[instrument(skip_all, fields(repository = %args.repository))]
pub fn run<R: Read, W: Write>(args: &Args, stdin: R, mut stdout: W) -> Result<(), Error> {
    let open = || -> Result<Repository, Error> {
        let repo = Repository::from_addr(&args.repository)?;
        debug!(path = %repo.path().display(), "opened repository");
        Ok(repo)
    };

    match &args.command {
        Command::List => {
            let mut scripts: Vec<ScriptInfo> = open()?.scripts().collect();
            scripts.sort_by(|a, b| a.name.cmp(&b.name));

            for script in scripts {
                stdout.write_all(&script.name)?;
                if script.active {
                    stdout.write_all(b" (active)")?;
                }
                stdout.write_all(b"\n")?;
            }
        }
        Command::Get { name } => {
            stdout.write_all(&open()?.script_source(name)?)?;
        }
        Command::Put { name, file } => {
            let repo = open()?;
            let source = read_input(file.as_deref(), stdin)?;
            repo.create_dir()?;
            repo.put(&SieveCompiler, name, &source)?;
        }
        Command::Delete { name } => open()?.delete(name)?,
        Command::Rename { old, new } => open()?.rename(old, new)?,
        Command::Activate { name } => {
            let repo = open()?;
            if !repo.script_exists(name) {
                return Err(sieve_store::Error::NotFound(name.as_bytes().into()).into());
            }
            repo.activate(name)?;
        }
        Command::Deactivate => open()?.deactivate()?,
        Command::Active => {
            if let Some(name) = open()?.try_active()? {
                stdout.write_all(&name)?;
                stdout.write_all(b"\n")?;
            }
        }
        Command::Count { exclude } => {
            writeln!(stdout, "{}", open()?.count_other_scripts(exclude.as_ref()))?;
        }
        Command::Check {
            file,
            dump_bytecode,
        } => check(file, *dump_bytecode, &mut stdout)?,
    }

    stdout.flush()?;
    Ok(())
}
