use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::{debug, instrument};

use crate::config::temp_file;
use crate::crlf::CrlfWriter;
use crate::repository::{io_error, remove_quietly, rename_error};
use crate::{Error, Repository, ScriptCompiler, ScriptName};

/// Writes the source to `path`, normalizing line endings to CRLF.
fn write_source(path: &Path, source: &[u8]) -> std::io::Result<()> {
    let mut w = CrlfWriter::new(BufWriter::new(File::create(path)?));
    w.write_all(source)?;

    let file = w.finish()?.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

impl Repository {
    /// Compiles a script and stores its source and bytecode.
    ///
    /// Both files are first written next to their final location with a
    /// `.NEW` suffix, and then renamed into place, source first. Failures
    /// before the renames remove the temporary files again; a failed rename
    /// leaves them for inspection. If only the bytecode rename fails, the new
    /// source is installed next to the previous bytecode.
    #[instrument(skip_all, fields(script.name = %name))]
    pub fn put<C>(&self, compiler: &C, name: &ScriptName, source: &str) -> Result<(), Error>
    where
        C: ScriptCompiler + ?Sized,
    {
        let script = compiler
            .parse(source)
            .map_err(|diagnostics| Error::InvalidScript(diagnostics.to_string()))?;

        let script_path = self.script_path(name.as_bytes());
        let new_script_path = script_path.with_file_name(temp_file(
            &self.layout().script_file(name.as_bytes()),
        ));

        if let Err(e) = write_source(&new_script_path, source.as_bytes()) {
            let err = io_error("write", &new_script_path, e);
            remove_quietly(&new_script_path);
            return Err(err);
        }

        let bytecode = match compiler.generate(&script) {
            Ok(bytecode) => bytecode,
            Err(e) => {
                remove_quietly(&new_script_path);
                return Err(Error::ProcessingFailed(format!(
                    "unable to generate bytecode: {}",
                    e
                )));
            }
        };

        let bytecode_path = self.bytecode_path(name.as_bytes());
        let new_bytecode_path = bytecode_path.with_file_name(temp_file(
            &self.layout().bytecode_file(name.as_bytes()),
        ));

        let file = match OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&new_bytecode_path)
        {
            Ok(file) => file,
            Err(e) => {
                let err = io_error("open", &new_bytecode_path, e);
                remove_quietly(&new_script_path);
                return Err(err);
            }
        };

        let mut w = BufWriter::new(file);
        if let Err(e) = compiler.emit(&bytecode, &mut w) {
            remove_quietly(&new_script_path);
            remove_quietly(&new_bytecode_path);
            return Err(Error::ProcessingFailed(format!(
                "unable to emit bytecode: {}",
                e
            )));
        }

        if let Err(e) = w
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
        {
            let err = io_error("write", &new_bytecode_path, e);
            remove_quietly(&new_script_path);
            remove_quietly(&new_bytecode_path);
            return Err(err);
        }

        debug!("staged script and bytecode, moving into place");

        std::fs::rename(&new_script_path, &script_path)
            .map_err(|e| rename_error(&new_script_path, &script_path, e))?;
        std::fs::rename(&new_bytecode_path, &bytecode_path)
            .map_err(|e| rename_error(&new_bytecode_path, &bytecode_path, e))?;

        Ok(())
    }
}
