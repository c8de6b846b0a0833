// src/vcs.rs

use crate::error::{Error, Result};
use crate::model::RepositoryKind;
use chrono::{FixedOffset, Offset, TimeZone, Utc};
use git2::{ErrorCode, Repository, Sort};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Access to repository history, whatever system stores it.
pub trait VcsBackend {
    /// Clones `location` into `destination` unless `destination` already exists.
    fn clone_or_skip(&self, kind: RepositoryKind, location: &str, destination: &Path) -> Result<()>;

    /// Full log of the checkout at `local_path`, newest entry first.
    fn log_lines(&self, kind: RepositoryKind, local_path: &Path) -> Result<Vec<String>>;
}

/// Operations one version-control system has to provide.
trait Vcs {
    fn clone_repository(&self, location: &str, destination: &Path) -> Result<()>;
    fn log_lines(&self, local_path: &Path) -> Result<Vec<String>>;
}

/// Backend dispatching to git (through libgit2) or hg (through its CLI).
#[derive(Debug, Default)]
pub struct SystemBackend {
    git: GitRepositories,
    hg: HgRepositories,
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn for_kind(&self, kind: RepositoryKind) -> &dyn Vcs {
        match kind {
            RepositoryKind::Git => &self.git,
            RepositoryKind::Hg => &self.hg,
        }
    }
}

impl VcsBackend for SystemBackend {
    fn clone_or_skip(&self, kind: RepositoryKind, location: &str, destination: &Path) -> Result<()> {
        if destination.exists() {
            debug!("Using existing checkout at {}", destination.display());
            return Ok(());
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        info!("Cloning {} repository {} into {}", kind, location, destination.display());
        self.for_kind(kind).clone_repository(location, destination)
    }

    fn log_lines(&self, kind: RepositoryKind, local_path: &Path) -> Result<Vec<String>> {
        self.for_kind(kind).log_lines(local_path)
    }
}

#[derive(Debug, Default)]
struct GitRepositories;

impl Vcs for GitRepositories {
    fn clone_repository(&self, location: &str, destination: &Path) -> Result<()> {
        Repository::clone(location, destination).map_err(|e| Error::fetch(location, e))?;
        Ok(())
    }

    /// Renders the history the way `git log` prints it, authors resolved
    /// through the repository's mailmap.
    fn log_lines(&self, local_path: &Path) -> Result<Vec<String>> {
        let location = local_path.display().to_string();
        let repo = Repository::open(local_path).map_err(|e| Error::fetch(&location, e))?;

        // No commits yet
        if repo.is_empty().map_err(|e| Error::fetch(&location, e))? {
            return Ok(Vec::new());
        }
        if let Err(e) = repo.head() {
            if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) {
                return Ok(Vec::new());
            }
            return Err(Error::fetch(&location, e));
        }

        let mailmap = repo.mailmap().map_err(|e| Error::fetch(&location, e))?;
        let mut revwalk = repo.revwalk().map_err(|e| Error::fetch(&location, e))?;
        revwalk.push_head().map_err(|e| Error::fetch(&location, e))?;
        revwalk.set_sorting(Sort::TIME).map_err(|e| Error::fetch(&location, e))?;

        let mut lines = Vec::new();
        for oid in revwalk {
            let oid = oid.map_err(|e| Error::fetch(&location, e))?;
            let commit = repo.find_commit(oid).map_err(|e| Error::fetch(&location, e))?;
            let author = commit.author_with_mailmap(&mailmap).map_err(|e| Error::fetch(&location, e))?;

            lines.push(format!("commit {}", oid));
            lines.push(format!(
                "Author: {} <{}>",
                String::from_utf8_lossy(author.name_bytes()),
                String::from_utf8_lossy(author.email_bytes())
            ));
            lines.push(format!("Date:   {}", format_git_time(&commit.time())));
            lines.push(String::new());
            for message_line in String::from_utf8_lossy(commit.message_bytes()).lines() {
                lines.push(format!("    {}", message_line));
            }
            lines.push(String::new());
        }
        Ok(lines)
    }
}

/// Formats a commit time like git's default date format,
/// e.g. `Tue Nov 14 22:13:20 2023 +0100`.
fn format_git_time(time: &git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    match offset.timestamp_opt(time.seconds(), 0).single() {
        Some(date) => date.format("%a %b %-d %H:%M:%S %Y %z").to_string(),
        None => time.seconds().to_string(),
    }
}

#[derive(Debug)]
struct HgRepositories {
    program: PathBuf,
}

impl Default for HgRepositories {
    fn default() -> Self {
        Self { program: PathBuf::from("hg") }
    }
}

impl HgRepositories {
    /// `hg` with user configuration that changes output formats disabled.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.env("HGPLAIN", "1");
        command
    }

    fn run(&self, location: &str, command: &mut Command) -> Result<String> {
        let output = command.output().map_err(|e| Error::fetch(location, format!("could not run hg: {}", e)))?;
        if !output.status.success() {
            return Err(Error::fetch(location, String::from_utf8_lossy(&output.stderr).trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Vcs for HgRepositories {
    fn clone_repository(&self, location: &str, destination: &Path) -> Result<()> {
        self.run(location, self.command().arg("clone").arg(location).arg(destination))?;
        Ok(())
    }

    fn log_lines(&self, local_path: &Path) -> Result<Vec<String>> {
        let location = local_path.display().to_string();
        let stdout = self.run(&location, self.command().arg("log").current_dir(local_path))?;
        Ok(stdout.lines().map(String::from).collect())
    }
}
