/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use allocative::Allocative;
use derive_more::Display;
use kiln_error::ErrorTag;
use kiln_error::TaggedError;

#[derive(Debug, thiserror::Error)]
pub enum ForwardRelativePathError {
    #[error("Expected a relative path, got an absolute path `{0}`")]
    Absolute(String),
    #[error("Path `{0}` contains an empty component")]
    EmptyComponent(String),
    #[error("Path `{0}` contains a `.` or `..` component")]
    DotComponent(String),
}

impl TaggedError for ForwardRelativePathError {
    fn error_tag(&self) -> ErrorTag {
        ErrorTag::Input
    }
}

/// A normalized relative path using `/` separators. It never contains `.` or `..` components,
/// so it can only point at or below the directory it is resolved against.
///
/// The empty path is valid and means "this directory".
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Allocative)]
#[display("{}", _0)]
pub struct ForwardRelativePathBuf(String);

impl ForwardRelativePathBuf {
    pub fn new(path: impl Into<String>) -> Result<Self, ForwardRelativePathError> {
        let path = path.into();
        if path.starts_with('/') {
            return Err(ForwardRelativePathError::Absolute(path));
        }
        if path.is_empty() {
            return Ok(Self(path));
        }
        for component in path.split('/') {
            match component {
                "" => return Err(ForwardRelativePathError::EmptyComponent(path)),
                "." | ".." => return Err(ForwardRelativePathError::DotComponent(path)),
                _ => {}
            }
        }
        Ok(Self(path))
    }

    /// Caller must guarantee the path is already normalized.
    pub fn unchecked_new(path: String) -> Self {
        Self(path)
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    pub fn join(&self, other: &ForwardRelativePathBuf) -> ForwardRelativePathBuf {
        if self.is_empty() {
            other.clone()
        } else if other.is_empty() {
            self.clone()
        } else {
            Self(format!("{}/{}", self.0, other.0))
        }
    }

    /// The last component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.iter().last()
    }

    /// The text after the last `.` of the file name.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.file_name()?;
        file_name.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn parent(&self) -> Option<ForwardRelativePathBuf> {
        if self.is_empty() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some((parent, _)) => Some(Self(parent.to_owned())),
            None => Some(Self::empty()),
        }
    }

    /// Component-wise prefix test: `foo/bar` starts with `foo` but not with `fo`.
    pub fn starts_with(&self, prefix: &ForwardRelativePathBuf) -> bool {
        let mut ours = self.iter();
        prefix.iter().all(|p| ours.next() == Some(p))
    }
}

impl AsRef<str> for ForwardRelativePathBuf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ForwardRelativePathBuf {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'a> PartialEq<&'a str> for ForwardRelativePathBuf {
    fn eq(&self, other: &&'a str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::fs::paths::forward_rel_path::ForwardRelativePathBuf;
    use crate::fs::paths::forward_rel_path::ForwardRelativePathError;

    #[test]
    fn rejects_non_forward_paths() {
        assert_matches!(
            ForwardRelativePathBuf::new("/abs"),
            Err(ForwardRelativePathError::Absolute(_))
        );
        assert_matches!(
            ForwardRelativePathBuf::new("a//b"),
            Err(ForwardRelativePathError::EmptyComponent(_))
        );
        assert_matches!(
            ForwardRelativePathBuf::new("a/../b"),
            Err(ForwardRelativePathError::DotComponent(_))
        );
        assert_matches!(
            ForwardRelativePathBuf::new("./b"),
            Err(ForwardRelativePathError::DotComponent(_))
        );
        assert!(ForwardRelativePathBuf::new("").unwrap().is_empty());
    }

    #[test]
    fn components() -> kiln_error::Result<()> {
        let p = ForwardRelativePathBuf::new("foo/bar.tar.gz")?;
        assert_eq!(Some("bar.tar.gz"), p.file_name());
        assert_eq!(Some("gz"), p.extension());
        assert_eq!(ForwardRelativePathBuf::new("foo")?, p.parent().unwrap());
        assert_eq!(
            Some(ForwardRelativePathBuf::empty()),
            ForwardRelativePathBuf::new("foo")?.parent()
        );
        assert_eq!(None, ForwardRelativePathBuf::new("foo")?.extension());
        assert_eq!(None, ForwardRelativePathBuf::empty().parent());
        Ok(())
    }

    #[test]
    fn join_and_prefix() -> kiln_error::Result<()> {
        let foo = ForwardRelativePathBuf::new("foo")?;
        let bar = ForwardRelativePathBuf::new("bar/baz")?;
        let joined = foo.join(&bar);
        assert_eq!("foo/bar/baz", joined.as_str());
        assert_eq!(foo, ForwardRelativePathBuf::empty().join(&foo));
        assert!(joined.starts_with(&foo));
        assert!(joined.starts_with(&ForwardRelativePathBuf::empty()));
        assert!(!joined.starts_with(&ForwardRelativePathBuf::new("fo")?));
        assert!(!foo.starts_with(&joined));
        Ok(())
    }
}
