//! A directory-backed repository of named Sieve scripts.
//!
//! Every script is stored twice: as editable source (`<name>.script`) and as
//! compiled bytecode (`<name>.bc`). The script executed on delivery is named
//! by a single symlink (`defaultbc`) pointing at a bytecode file. All
//! mutations publish their results through `rename(2)`, so concurrent
//! readers observe either the old or the new state of each file.

mod active;
mod compiler;
mod config;
mod crlf;
mod errors;
mod install;
mod mutate;
mod name;
mod repository;

pub mod entries;

pub use compiler::{Diagnostics, GenerateError, ScriptCompiler};
pub use config::{
    ConfigError, Layout, DEFAULT_ACTIVE_NAME, DEFAULT_BYTECODE_SUFFIX, DEFAULT_SCRIPT_SUFFIX,
    TEMP_SUFFIX,
};
pub use crlf::CrlfWriter;
pub use errors::{Error, Outcome};
pub use name::{is_valid_name, NameError, ScriptName, MAX_NAME_LEN};
pub use repository::{Repository, ScriptInfo};

#[cfg(test)]
mod tests;
