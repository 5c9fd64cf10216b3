use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key for one catalog program (e.g. `EP012345670001`).
///
/// Case-sensitive and compared byte-for-byte. The same value is used as the
/// artwork cache key and as the identifier sent to the metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(String);

impl ProgramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProgramId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProgramId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ProgramId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProgramId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
