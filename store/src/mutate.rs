use std::io::ErrorKind;

use tracing::{instrument, warn};

use crate::repository::{io_error, rename_error};
use crate::{Error, Repository, ScriptName};

impl Repository {
    /// Deletes a script's source and bytecode.
    ///
    /// Only the source file decides the outcome: a missing source is
    /// [Error::NotFound], while faults removing the bytecode afterwards are
    /// logged but don't fail the deletion.
    #[instrument(skip_all, fields(script.name = %name))]
    pub fn delete(&self, name: &ScriptName) -> Result<(), Error> {
        let path = self.script_path(name.as_bytes());
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(name.as_bytes().into()))
            }
            Err(e) => return Err(io_error("unlink", &path, e)),
        }

        let path = self.bytecode_path(name.as_bytes());
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                warn!(path = %path.display(), err = %e, "IOERROR: unable to unlink");
            }
            _ => {}
        }

        Ok(())
    }

    /// Renames a script, moving the active pointer along if it was active.
    ///
    /// Source and bytecode are renamed one after another. If renaming the
    /// bytecode fails, the source stays renamed and an error is returned:
    /// the repository then holds the new source next to the old (or no)
    /// bytecode until the script is stored again.
    #[instrument(skip_all, fields(script.old_name = %old_name, script.new_name = %new_name))]
    pub fn rename(&self, old_name: &ScriptName, new_name: &ScriptName) -> Result<(), Error> {
        let from = self.script_path(old_name.as_bytes());
        let to = self.script_path(new_name.as_bytes());
        match std::fs::rename(&from, &to) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(old_name.as_bytes().into()))
            }
            Err(e) => return Err(rename_error(&from, &to, e)),
        }

        let from = self.bytecode_path(old_name.as_bytes());
        let to = self.bytecode_path(new_name.as_bytes());
        std::fs::rename(&from, &to).map_err(|e| rename_error(&from, &to, e))?;

        if self.is_active(old_name) {
            return self.activate(new_name);
        }

        Ok(())
    }
}

