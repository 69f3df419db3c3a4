/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use dupe::Dupe;

use crate::fs::paths::project_rel_path::ProjectRelativePathBuf;

/// The filesystem primitives action execution is allowed to use.
///
/// Implementations must be safe to share between threads: unrelated actions may execute
/// concurrently against the same filesystem.
pub trait ArtifactFilesystem: Send + Sync {
    /// The absolute location of a project-relative path.
    fn resolve(&self, path: &ProjectRelativePathBuf) -> PathBuf;

    /// Creates the directory and all its parents. Existing directories are not an error.
    fn mkdirs(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<()>;

    fn write(&self, path: &ProjectRelativePathBuf, contents: &[u8]) -> kiln_error::Result<()>;

    fn set_executable(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<()>;

    fn read_if_exists(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<Option<Vec<u8>>>;

    fn is_executable(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<bool>;
}

fn io_error(op: &str, path: &Path, e: io::Error) -> kiln_error::Error {
    kiln_error::Error::from(e).context(format!("{}({})", op, path.display()))
}

/// The project root on the local disk.
#[derive(Clone, Dupe, Debug)]
pub struct ProjectRoot {
    root: Arc<PathBuf>,
}

impl ProjectRoot {
    pub fn new(root: PathBuf) -> kiln_error::Result<Self> {
        if !root.is_absolute() {
            return Err(kiln_error::internal_error!(
                "project root must be absolute, got `{}`",
                root.display()
            ));
        }
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactFilesystem for ProjectRoot {
    fn resolve(&self, path: &ProjectRelativePathBuf) -> PathBuf {
        if path.as_forward_relative_path().is_empty() {
            (*self.root).clone()
        } else {
            self.root.join(path.as_str())
        }
    }

    fn mkdirs(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<()> {
        let abs = self.resolve(path);
        fs::create_dir_all(&abs).map_err(|e| io_error("create_dir_all", &abs, e))
    }

    fn write(&self, path: &ProjectRelativePathBuf, contents: &[u8]) -> kiln_error::Result<()> {
        let abs = self.resolve(path);
        fs::write(&abs, contents).map_err(|e| io_error("write", &abs, e))
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let abs = self.resolve(path);
        let mut perms = fs::metadata(&abs)
            .map_err(|e| io_error("metadata", &abs, e))?
            .permissions();
        // Grant execute wherever read is granted.
        let mode = perms.mode();
        perms.set_mode(mode | ((mode & 0o444) >> 2));
        fs::set_permissions(&abs, perms).map_err(|e| io_error("set_permissions", &abs, e))
    }

    #[cfg(not(unix))]
    fn set_executable(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<()> {
        let abs = self.resolve(path);
        fs::metadata(&abs).map_err(|e| io_error("metadata", &abs, e))?;
        Ok(())
    }

    fn read_if_exists(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<Option<Vec<u8>>> {
        let abs = self.resolve(path);
        match fs::read(&abs) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &abs, e)),
        }
    }

    #[cfg(unix)]
    fn is_executable(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<bool> {
        use std::os::unix::fs::PermissionsExt;

        let abs = self.resolve(path);
        let meta = fs::metadata(&abs).map_err(|e| io_error("metadata", &abs, e))?;
        Ok(meta.permissions().mode() & 0o100 != 0)
    }

    #[cfg(not(unix))]
    fn is_executable(&self, path: &ProjectRelativePathBuf) -> kiln_error::Result<bool> {
        let abs = self.resolve(path);
        fs::metadata(&abs).map_err(|e| io_error("metadata", &abs, e))?;
        Ok(true)
    }
}

/// A project root in a temporary directory, removed on drop.
pub struct ProjectRootTemp {
    path: ProjectRoot,
    _temp: tempfile::TempDir,
}

impl ProjectRootTemp {
    pub fn new() -> kiln_error::Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().canonicalize()?;
        Ok(Self {
            path: ProjectRoot::new(root)?,
            _temp: temp,
        })
    }

    pub fn path(&self) -> &ProjectRoot {
        &self.path
    }
}
