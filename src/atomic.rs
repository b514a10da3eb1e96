// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crash-safe replacement of files on disk.
//!
//! Callers write the new content into a temporary sibling of the target
//! (`.tmp-<name>`), which is then renamed over the target. Readers observe
//! either the old or the new file, never a partial one.
//!
//! The temporary name is deterministic, so two concurrent updates of the
//! same target race with each other. Callers that need that must serialize
//! externally.

use std::ffi::OsString;
use std::fmt::Display;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::WriteError;

/// How the temporary file is moved over the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Single atomic rename over the existing target
    Rename,
    /// Move the old target to `<name>.bak`, rename the temporary file into
    /// place, then delete the backup. For platforms where rename refuses to
    /// overwrite. A crash between the steps can leave only the backup behind.
    BackupThenRename,
}

impl ReplaceStrategy {
    /// The strategy suited to the current platform
    pub fn native() -> Self {
        if cfg!(windows) {
            ReplaceStrategy::BackupThenRename
        } else {
            ReplaceStrategy::Rename
        }
    }
}

/// Target, temporary and backup paths for one in-flight update.
///
/// Dropping a `PendingWrite` without committing it deletes the temporary
/// file, so a panic or cancellation inside the update leaves the target
/// untouched.
#[derive(Debug)]
pub struct PendingWrite {
    target: PathBuf,
    temp: PathBuf,
    backup: PathBuf,
    committed: bool,
}

impl PendingWrite {
    pub fn new(target: &Path) -> Result<Self, WriteError> {
        let name = target.file_name().ok_or_else(|| WriteError::InvalidTarget {
            path: target.to_path_buf(),
        })?;
        let dir = target.parent().unwrap_or_else(|| Path::new(""));

        let mut temp_name = OsString::from(".tmp-");
        temp_name.push(name);
        let mut backup_name = name.to_os_string();
        backup_name.push(".bak");

        let pending = Self {
            target: target.to_path_buf(),
            temp: dir.join(temp_name),
            backup: dir.join(backup_name),
            committed: false,
        };

        // Leftover from an earlier crash; must not be committed by accident
        remove_if_exists(&pending.temp)?;

        Ok(pending)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Move the temporary file over the target
    pub fn commit(mut self, strategy: ReplaceStrategy) -> Result<(), WriteError> {
        if !self.temp.exists() {
            return Err(WriteError::MissingTemp {
                path: self.temp.clone(),
            });
        }

        match strategy {
            ReplaceStrategy::Rename => rename(&self.temp, &self.target)?,
            ReplaceStrategy::BackupThenRename => self.replace_via_backup()?,
        }

        self.committed = true;
        debug!(path = %self.target.display(), ?strategy, "Replaced file");
        Ok(())
    }

    fn replace_via_backup(&self) -> Result<(), WriteError> {
        let had_target = self.target.exists();
        if had_target {
            remove_if_exists(&self.backup)?;
            rename(&self.target, &self.backup)?;
        }

        if let Err(e) = rename(&self.temp, &self.target) {
            if had_target && let Err(restore) = std::fs::rename(&self.backup, &self.target) {
                warn!(
                    backup = %self.backup.display(),
                    error = %restore,
                    "Failed to restore backup after aborted replace"
                );
            }
            return Err(e);
        }

        remove_if_exists(&self.backup)
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if !self.committed
            && let Err(e) = remove_if_exists(&self.temp)
        {
            warn!(error = %e, "Failed to clean up temporary file");
        }
    }
}

/// Update `target` through a temporary file, using the platform's strategy.
///
/// `write` receives the temporary path and must create the file there.
/// When it returns `Ok` the temporary file replaces the target. When it
/// returns `Err` the temporary file is deleted, the target is left as it
/// was, and the error is handed back unchanged.
pub fn update_file_safely<T, E, F>(target: &Path, write: F) -> Result<T, E>
where
    F: FnOnce(&Path) -> Result<T, E>,
    E: From<WriteError> + Display,
{
    update_file_safely_with(ReplaceStrategy::native(), target, write)
}

/// Same as [`update_file_safely`] with an explicit replace strategy
pub fn update_file_safely_with<T, E, F>(
    strategy: ReplaceStrategy,
    target: &Path,
    write: F,
) -> Result<T, E>
where
    F: FnOnce(&Path) -> Result<T, E>,
    E: From<WriteError> + Display,
{
    let pending = PendingWrite::new(target)?;

    match write(pending.temp_path()) {
        Ok(value) => {
            pending.commit(strategy)?;
            Ok(value)
        }
        Err(e) => {
            warn!(
                path = %target.display(),
                error = %e,
                "Error while saving file atomically, discarding temporary file"
            );
            drop(pending);
            Err(e)
        }
    }
}

/// Atomically replace `target` with `contents`, syncing before the rename
pub fn write_atomically(target: &Path, contents: &[u8]) -> Result<(), WriteError> {
    update_file_safely(target, |temp| {
        let write_temp = || -> std::io::Result<()> {
            let mut file = File::create(temp)?;
            file.write_all(contents)?;
            file.sync_all()
        };
        write_temp().map_err(|source| WriteError::TempWriteFailed {
            path: temp.to_path_buf(),
            source,
        })
    })
}

fn rename(from: &Path, to: &Path) -> Result<(), WriteError> {
    std::fs::rename(from, to).map_err(|source| WriteError::RenameFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

fn remove_if_exists(path: &Path) -> Result<(), WriteError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WriteError::RemoveFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use tempfile::tempdir;

    #[derive(Debug)]
    enum TestError {
        Boom,
        Write(WriteError),
    }

    impl From<WriteError> for TestError {
        fn from(e: WriteError) -> Self {
            TestError::Write(e)
        }
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Boom => write!(f, "boom"),
                TestError::Write(e) => write!(f, "{e}"),
            }
        }
    }

    fn write_text(path: &Path, text: &str) -> Result<(), TestError> {
        std::fs::write(path, text).map_err(|source| {
            TestError::Write(WriteError::TempWriteFailed {
                path: path.to_path_buf(),
                source,
            })
        })
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".tmp-"))
            .collect()
    }

    #[test]
    fn pending_write_derives_sibling_paths() {
        let pending = PendingWrite::new(Path::new("/data/state.json")).unwrap();

        assert_eq!(pending.target(), Path::new("/data/state.json"));
        assert_eq!(pending.temp_path(), Path::new("/data/.tmp-state.json"));
        assert_eq!(pending.backup_path(), Path::new("/data/state.json.bak"));
    }

    #[test]
    fn pending_write_rejects_paths_without_file_name() {
        let result = PendingWrite::new(Path::new("/"));
        assert!(matches!(result, Err(WriteError::InvalidTarget { .. })));
    }

    #[test]
    fn successful_update_creates_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");

        update_file_safely(&target, |temp| write_text(temp, "X")).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "X");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn successful_update_replaces_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();

        update_file_safely(&target, |temp| write_text(temp, "new")).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn failed_update_keeps_old_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();

        let result = update_file_safely(&target, |temp| {
            write_text(temp, "half-written")?;
            Err::<(), _>(TestError::Boom)
        });

        assert!(matches!(result, Err(TestError::Boom)));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_update_leaves_missing_target_absent() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");

        let result = update_file_safely(&target, |temp| {
            write_text(temp, "never visible")?;
            Err::<(), _>(TestError::Boom)
        });

        assert!(result.is_err());
        assert!(!target.exists());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn panic_inside_update_removes_temp() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = update_file_safely(&target, |temp| -> Result<(), TestError> {
                write_text(temp, "partial")?;
                panic!("writer crashed");
            });
        }));

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn update_without_writing_temp_is_an_error() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();

        let result = update_file_safely(&target, |_temp| Ok::<(), TestError>(()));

        assert!(matches!(
            result,
            Err(TestError::Write(WriteError::MissingTemp { .. }))
        ));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn stale_temp_file_is_discarded() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(dir.path().join(".tmp-state.json"), "stale").unwrap();

        let result = update_file_safely(&target, |_temp| Ok::<(), TestError>(()));

        assert!(result.is_err());
        assert!(!target.exists());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn backup_strategy_replaces_target_and_removes_backup() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();

        update_file_safely_with(ReplaceStrategy::BackupThenRename, &target, |temp| {
            write_text(temp, "new")
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert!(!dir.path().join("state.json.bak").exists());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn backup_strategy_discards_stale_backup() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();
        std::fs::write(dir.path().join("state.json.bak"), "ancient").unwrap();

        update_file_safely_with(ReplaceStrategy::BackupThenRename, &target, |temp| {
            write_text(temp, "new")
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert!(!dir.path().join("state.json.bak").exists());
    }

    #[test]
    fn backup_strategy_creates_missing_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.json");

        update_file_safely_with(ReplaceStrategy::BackupThenRename, &target, |temp| {
            write_text(temp, "first")
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "first");
    }

    #[test]
    fn write_atomically_writes_bytes() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("blob.bin");

        write_atomically(&target, b"\x00\x01payload").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"\x00\x01payload");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }
}
