use std::ffi::OsStr;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;

use tracing::{debug, instrument};

use crate::config::temp_file;
use crate::repository::{io_error, remove_quietly, rename_error};
use crate::{Error, Repository, ScriptName};

impl Repository {
    /// Makes the given script the active one.
    ///
    /// A new symlink is created next to the active pointer and renamed onto
    /// it, so readers see either the old or the new pointer, never none.
    /// The bytecode file the pointer names is not required to exist.
    #[instrument(skip_all, fields(script.name = %name))]
    pub fn activate(&self, name: &ScriptName) -> Result<(), Error> {
        if self.is_active(name) {
            debug!("already active");
            return Ok(());
        }

        let target = self.layout().bytecode_file(name.as_bytes());
        let active = self.active_path();
        let tmp = self.join(&temp_file(OsStr::new(&self.layout().active_name)));

        // left behind if a previous activation was interrupted
        remove_quietly(&tmp);

        symlink(&target, &tmp).map_err(|e| io_error("symlink", &tmp, e))?;

        if let Err(e) = std::fs::rename(&tmp, &active) {
            let err = rename_error(&tmp, &active, e);
            remove_quietly(&tmp);
            return Err(err);
        }

        Ok(())
    }

    /// Removes the active pointer. Succeeds if no script was active.
    #[instrument(skip_all)]
    pub fn deactivate(&self) -> Result<(), Error> {
        let active = self.active_path();
        match std::fs::remove_file(&active) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("unlink", &active, e)),
        }
    }
}
