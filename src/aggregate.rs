// src/aggregate.rs

use crate::error::{Error, Result};
use crate::identity;
use crate::model::{Contributor, Package};
use crate::vcs::VcsBackend;
use crate::weight::transform;
use std::cell::OnceCell;
use tracing::debug;

/// Visual range commit counts are mapped onto
pub const MIN_WEIGHT: f64 = 1.0;
pub const MAX_WEIGHT: f64 = 10.0;

/// Contributors of one package, read from its history on first use.
///
/// The history is fetched and parsed at most once, and the commit statistics
/// are each computed at most once.
pub struct ContributorAggregator<'a> {
    package: &'a Package,
    backend: &'a dyn VcsBackend,
    contributors: OnceCell<Vec<Contributor>>,
    min_commits: OnceCell<u64>,
    max_commits: OnceCell<u64>,
    total_commits: OnceCell<u64>,
}

impl<'a> ContributorAggregator<'a> {
    pub fn new(package: &'a Package, backend: &'a dyn VcsBackend) -> Self {
        Self {
            package,
            backend,
            contributors: OnceCell::new(),
            min_commits: OnceCell::new(),
            max_commits: OnceCell::new(),
            total_commits: OnceCell::new(),
        }
    }

    pub fn package(&self) -> &Package {
        self.package
    }

    /// Contributors ranked by commit count, most active first.
    pub fn contributors(&self) -> Result<&[Contributor]> {
        if let Some(contributors) = self.contributors.get() {
            return Ok(contributors);
        }
        let loaded = self.load()?;
        Ok(self.contributors.get_or_init(|| loaded))
    }

    fn load(&self) -> Result<Vec<Contributor>> {
        let package = self.package;
        let checkout = package.checkout_path();
        self.backend.clone_or_skip(package.kind, &package.location, &checkout)?;
        let lines = self.backend.log_lines(package.kind, &checkout)?;
        let package_id = package.id();

        let contributors: Vec<Contributor> = identity::resolve(package.kind, &lines)
            .into_iter()
            .map(|identity| Contributor {
                display_name: identity.display_name,
                email: identity.email,
                commits: identity.commits,
                package_id: package_id.clone(),
            })
            .collect();
        debug!("{} has {} contributors in {} log lines", package.name, contributors.len(), lines.len());
        Ok(contributors)
    }

    pub fn min_commits(&self) -> Result<u64> {
        self.statistic(&self.min_commits, |commits| commits.min())
    }

    pub fn max_commits(&self) -> Result<u64> {
        self.statistic(&self.max_commits, |commits| commits.max())
    }

    pub fn total_commits(&self) -> Result<u64> {
        self.statistic(&self.total_commits, |commits| Some(commits.sum()))
    }

    fn statistic<F>(&self, cell: &OnceCell<u64>, compute: F) -> Result<u64>
    where
        F: FnOnce(&mut dyn Iterator<Item = u64>) -> Option<u64>,
    {
        if let Some(value) = cell.get() {
            return Ok(*value);
        }
        let contributors = self.contributors()?;
        if contributors.is_empty() {
            return Err(Error::EmptyHistory { package: self.package.name.clone() });
        }
        let mut commits = contributors.iter().map(|c| c.commits);
        let value = compute(&mut commits).ok_or_else(|| Error::EmptyHistory { package: self.package.name.clone() })?;
        Ok(*cell.get_or_init(|| value))
    }

    /// Position of the contributor's commit count between this package's
    /// least and most active contributors, in `[MIN_WEIGHT, MAX_WEIGHT]`.
    pub fn commit_weight(&self, contributor: &Contributor) -> Result<f64> {
        transform(
            contributor.commits as f64,
            self.min_commits()? as f64,
            self.max_commits()? as f64,
            MIN_WEIGHT,
            MAX_WEIGHT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepositoryKind;
    use std::cell::Cell;
    use std::path::{Path, PathBuf};

    struct FakeBackend {
        log: Vec<String>,
        clones: Cell<usize>,
        logs: Cell<usize>,
    }

    impl FakeBackend {
        fn new(log: &str) -> Self {
            Self { log: log.lines().map(String::from).collect(), clones: Cell::new(0), logs: Cell::new(0) }
        }
    }

    impl VcsBackend for FakeBackend {
        fn clone_or_skip(&self, _kind: RepositoryKind, _location: &str, _destination: &Path) -> Result<()> {
            self.clones.set(self.clones.get() + 1);
            Ok(())
        }

        fn log_lines(&self, _kind: RepositoryKind, _local_path: &Path) -> Result<Vec<String>> {
            self.logs.set(self.logs.get() + 1);
            Ok(self.log.clone())
        }
    }

    fn package() -> Package {
        Package::new("demo", RepositoryKind::Git, "https://example.org/demo", PathBuf::from("/stage/demo"))
    }

    #[test]
    fn reads_history_once() {
        let backend = FakeBackend::new("Author: A <a@x.org>\nAuthor: B <b@x.org>\nAuthor: A <a@x.org>\n");
        let package = package();
        let aggregator = ContributorAggregator::new(&package, &backend);

        let contributors = aggregator.contributors().unwrap();
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].email, "a@x.org");
        assert_eq!(contributors[0].package_id, "package:demo");
        aggregator.contributors().unwrap();
        aggregator.max_commits().unwrap();

        assert_eq!(backend.clones.get(), 1);
        assert_eq!(backend.logs.get(), 1);
    }

    #[test]
    fn computes_commit_statistics() {
        let backend = FakeBackend::new(
            "Author: A <a@x.org>\nAuthor: A <a@x.org>\nAuthor: A <a@x.org>\n\
             Author: B <b@x.org>\nAuthor: B <b@x.org>\nAuthor: C <c@x.org>\n",
        );
        let package = package();
        let aggregator = ContributorAggregator::new(&package, &backend);

        assert_eq!(aggregator.min_commits().unwrap(), 1);
        assert_eq!(aggregator.max_commits().unwrap(), 3);
        assert_eq!(aggregator.total_commits().unwrap(), 6);

        let contributors = aggregator.contributors().unwrap();
        let weights: Vec<f64> = contributors.iter().map(|c| aggregator.commit_weight(c).unwrap()).collect();
        assert_eq!(weights, vec![10.0, 5.5, 1.0]);
    }

    #[test]
    fn single_contributor_gets_minimum_weight() {
        let backend = FakeBackend::new("Author: A <a@x.org>\nAuthor: A <a@x.org>\n");
        let package = package();
        let aggregator = ContributorAggregator::new(&package, &backend);
        let contributor = aggregator.contributors().unwrap()[0].clone();
        assert_eq!(aggregator.commit_weight(&contributor).unwrap(), MIN_WEIGHT);
    }

    #[test]
    fn empty_history_is_reported() {
        let backend = FakeBackend::new("commit 123\nDate: today\n");
        let package = package();
        let aggregator = ContributorAggregator::new(&package, &backend);
        assert!(aggregator.contributors().unwrap().is_empty());
        assert!(matches!(aggregator.min_commits(), Err(Error::EmptyHistory { package }) if package == "demo"));
        assert!(matches!(aggregator.total_commits(), Err(Error::EmptyHistory { .. })));
    }
}
