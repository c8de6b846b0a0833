// src/model.rs

use crate::error::{Error, Result};
use crate::graph::Node;
use crate::input::PackageRecord;
use md5::{Digest, Md5};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported version-control systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryKind {
    Git,
    Hg,
}

impl RepositoryKind {
    /// Prefix marking the author lines of this system's log output
    pub fn author_prefix(self) -> &'static str {
        match self {
            RepositoryKind::Git => "Author:",
            RepositoryKind::Hg => "user:",
        }
    }
}

impl FromStr for RepositoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "git" => Ok(RepositoryKind::Git),
            "hg" => Ok(RepositoryKind::Hg),
            other => Err(Error::UnsupportedKind(other.to_string())),
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKind::Git => write!(f, "git"),
            RepositoryKind::Hg => write!(f, "hg"),
        }
    }
}

/// A software package whose repository history is graphed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub kind: RepositoryKind,
    pub location: String,
    /// Staging directory; the checkout itself goes in a subdirectory of it
    pub local_path: PathBuf,
}

impl Package {
    pub fn new(name: impl Into<String>, kind: RepositoryKind, location: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), kind, location: location.into(), local_path: local_path.into() }
    }

    /// Builds the package of an input row, staging it under `temp_dir/<name>`.
    pub fn from_record(record: &PackageRecord, temp_dir: &Path) -> Result<Self> {
        let kind = record.repository_type.parse()?;
        Ok(Self::new(&record.name, kind, &record.repository_url, temp_dir.join(&record.name)))
    }

    pub fn id(&self) -> String {
        format!("package:{}", self.name)
    }

    /// Where the repository is cloned: the staging directory joined with the
    /// last segment of the repository location.
    pub fn checkout_path(&self) -> PathBuf {
        match Path::new(self.location.trim_end_matches('/')).file_name() {
            Some(base) => self.local_path.join(base),
            None => self.local_path.join(&self.name),
        }
    }

    pub fn to_node(&self) -> Node {
        Node::package(self.id(), &self.name)
    }
}

/// One author within the history of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub display_name: String,
    pub email: String,
    pub commits: u64,
    /// Id of the owning package
    pub package_id: String,
}

impl Contributor {
    pub fn email_hash(&self) -> String {
        email_hash(&self.email)
    }

    pub fn id(&self) -> String {
        format!("person:{}", self.email_hash())
    }

    pub fn avatar_url(&self) -> String {
        format!("https://www.gravatar.com/avatar/{}", self.email_hash())
    }

    pub fn to_node(&self) -> Node {
        Node::person(self.id(), &self.display_name, self.avatar_url())
    }
}

/// Hex MD5 digest of the normalized email.
pub fn email_hash(email: &str) -> String {
    let digest = Md5::digest(email.trim().to_lowercase().as_bytes());
    format!("{:x}", digest)
}
