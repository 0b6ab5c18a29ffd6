//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote identifiers and
//! the remote document name. Each newtype ensures data validity at
//! construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Create a new random ", stringify!($name))]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a ", stringify!($name), " from an existing UUID")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID value
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    DomainError::InvalidId(format!("Invalid {}: {e}", stringify!($name)))
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identifier of the organization that owns projects on the remote store
    OrganizationId
);

uuid_id!(
    /// Identifier of a project (the remote document collection being mirrored)
    ProjectId
);

uuid_id!(
    /// Identifier of a single remote document
    DocumentId
);

// ============================================================================
// RemoteName
// ============================================================================

/// Remote-namespaced file name of a document: `<rootFolderName>/<pathRelativeToRoot>`
///
/// Always uses `/` as separator, regardless of the local platform. This is
/// the stable identity used to find, replace, or delete a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteName(String);

impl RemoteName {
    /// Wraps an existing remote name
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRemoteName` if the name is empty, starts
    /// or ends with `/`, or contains empty segments.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty()
            || name.starts_with('/')
            || name.ends_with('/')
            || name.split('/').any(str::is_empty)
        {
            return Err(DomainError::InvalidRemoteName(name));
        }
        Ok(Self(name))
    }

    /// Computes the remote name of `file_path` beneath `sync_root`
    ///
    /// The name is `basename(sync_root)` joined with the path of `file_path`
    /// relative to the root. When the file is itself the root (a file
    /// selected directly), the name is its base name.
    ///
    /// # Errors
    /// - `DomainError::PathNotInSyncRoot` if `file_path` is not beneath `sync_root`
    /// - `DomainError::InvalidPath` if the root has no base name or the
    ///   relative path contains `..` components
    pub fn for_file(sync_root: &Path, file_path: &Path) -> Result<Self, DomainError> {
        let root_name = sync_root
            .file_name()
            .ok_or_else(|| DomainError::InvalidPath(sync_root.display().to_string()))?;

        let relative = file_path
            .strip_prefix(sync_root)
            .map_err(|_| DomainError::PathNotInSyncRoot(file_path.display().to_string()))?;

        let mut segments = vec![root_name.to_string_lossy().into_owned()];
        for component in relative.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(DomainError::InvalidPath(file_path.display().to_string())),
            }
        }

        Self::new(segments.join("/"))
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemoteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
