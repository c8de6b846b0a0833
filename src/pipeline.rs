// src/pipeline.rs

use crate::aggregate::ContributorAggregator;
use crate::avatar::{self, ImageFetcher};
use crate::error::{Error, Result};
use crate::graph::{Edge, Graph};
use crate::input::{self, PackageRecord};
use crate::model::Package;
use crate::scaffold;
use crate::vcs::VcsBackend;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const CONTRIBUTED_TO: &str = "contributed to";
pub const DEPENDS_ON: &str = "depends on";
const DEPENDENCY_WIDTH: f64 = 10.0;
const DEPENDENCY_COLOR: &str = "blue";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// CSV package list
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub template_dir: Option<PathBuf>,
    /// Where repositories are cloned
    pub temp_dir: PathBuf,
    /// Warn about packages without authors instead of failing
    pub skip_empty: bool,
    pub fetch_avatars: bool,
    pub show_progress: bool,
}

impl PipelineConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.output_dir.join("data")
    }

    pub fn network_path(&self) -> PathBuf {
        self.data_dir().join("network.json")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join("static").join("img")
    }

    pub fn package_path(&self, package: &Package) -> PathBuf {
        self.data_dir().join(format!("{}.json", package.id()))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub packages: usize,
    pub contributor_files_written: usize,
    pub dependencies: usize,
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}") {
        bar.set_style(style);
    }
    bar
}

/// Builds the merged network and the per-package contributor files.
///
/// Packages whose contributor file already exists are not fetched again; the
/// merged network is always rebuilt.
pub fn run(config: &PipelineConfig, backend: &dyn VcsBackend, fetcher: &dyn ImageFetcher) -> Result<RunSummary> {
    if let Some(template) = &config.template_dir {
        scaffold::copy_template(template, &config.output_dir)?;
    }

    let records = input::read_records(&config.input)?;
    let packages = records
        .iter()
        .map(|record| Package::from_record(record, &config.temp_dir))
        .collect::<Result<Vec<_>>>()?;

    let mut graph = Graph::new();
    let mut summary = RunSummary { packages: packages.len(), ..RunSummary::default() };

    // First pass: package nodes and contributor files
    let bar = progress_bar(packages.len(), config.show_progress);
    for package in &packages {
        bar.set_message(format!("Extracting repository data: {}", package.name));
        graph.add_node(package.to_node());

        let filename = config.package_path(package);
        if filename.exists() {
            debug!("{} already exists, skipping contributors of {}", filename.display(), package.name);
        } else if save_contributors(package, config, backend, fetcher)? {
            summary.contributor_files_written += 1;
        }
        bar.inc(1);
    }
    bar.finish_with_message("Repository data extracted");

    // Second pass: dependency edges
    summary.dependencies = add_dependencies(&mut graph, &records, config.show_progress)?;

    info!(
        "Exporting network JSON ({} nodes, {} edges) to {}",
        graph.node_count(),
        graph.edge_count(),
        config.network_path().display()
    );
    graph.save(&config.network_path())?;
    Ok(summary)
}

/// Adds a "depends on" edge from each row's dependent to the row's package.
pub fn add_dependencies(graph: &mut Graph, records: &[PackageRecord], show_progress: bool) -> Result<usize> {
    let bar = progress_bar(records.len(), show_progress);
    let mut added = 0;
    for record in records {
        bar.set_message(format!("Adding dependencies: {}", record.name));
        if let Some(dependent) = record.dependent() {
            let from = graph.get_node_by_name(dependent)?.id.clone();
            let to = graph.get_node_by_name(&record.name)?.id.clone();
            graph.add_edge(
                Edge::new(from, to, DEPENDS_ON)
                    .with_width(DEPENDENCY_WIDTH)
                    .with_color(DEPENDENCY_COLOR),
            );
            added += 1;
        }
        bar.inc(1);
    }
    bar.finish_with_message("Dependencies added");
    Ok(added)
}

/// Writes the contributor sub-graph of `package` to its own file.
///
/// Returns `false` when the package has no authors and `skip_empty` is set.
fn save_contributors(
    package: &Package,
    config: &PipelineConfig,
    backend: &dyn VcsBackend,
    fetcher: &dyn ImageFetcher,
) -> Result<bool> {
    let aggregator = ContributorAggregator::new(package, backend);
    let contributors = aggregator.contributors()?;
    if contributors.is_empty() {
        if config.skip_empty {
            warn!("No commit authors found for {}, skipping its contributors", package.name);
            return Ok(false);
        }
        return Err(Error::EmptyHistory { package: package.name.clone() });
    }

    let image_dir = config.image_dir();
    let mut graph = Graph::new();
    for contributor in contributors {
        let mut node = contributor.to_node();
        if config.fetch_avatars {
            avatar::localize(&mut node, fetcher, &config.output_dir, &image_dir)?;
        }
        graph.add_node(node);
        graph.add_edge(
            Edge::new(contributor.id(), package.id(), CONTRIBUTED_TO)
                .with_width(aggregator.commit_weight(contributor)?),
        );
    }

    let total = aggregator.total_commits()?;
    debug!("{}: {} contributors, {} commits", aggregator.package().name, contributors.len(), total);
    graph.save(&config.package_path(package))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeGroup;
    use crate::model::RepositoryKind;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// Serves canned logs keyed by repository location.
    #[derive(Default)]
    struct FakeBackend {
        logs: HashMap<String, String>,
        clones: RefCell<Vec<String>>,
    }

    impl FakeBackend {
        fn with_log(mut self, location: &str, log: &str) -> Self {
            self.logs.insert(location.to_string(), log.to_string());
            self
        }
    }

    impl VcsBackend for FakeBackend {
        fn clone_or_skip(&self, _kind: RepositoryKind, location: &str, destination: &Path) -> Result<()> {
            if !self.logs.contains_key(location) {
                return Err(Error::fetch(location, "repository not found"));
            }
            self.clones.borrow_mut().push(location.to_string());
            fs::create_dir_all(destination).map_err(|e| Error::io(destination, e))?;
            fs::write(destination.join("location"), location).map_err(|e| Error::io(destination, e))
        }

        fn log_lines(&self, _kind: RepositoryKind, local_path: &Path) -> Result<Vec<String>> {
            let location = fs::read_to_string(local_path.join("location")).map_err(|e| Error::io(local_path, e))?;
            Ok(self.logs[&location].lines().map(String::from).collect())
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        urls: RefCell<Vec<String>>,
    }

    impl ImageFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.urls.borrow_mut().push(url.to_string());
            Ok(PNG.to_vec())
        }
    }

    struct Workspace {
        _dir: TempDir,
        config: PipelineConfig,
    }

    fn workspace(csv: &str) -> Workspace {
        let dir = tempdir().unwrap();
        let input = dir.path().join("packages.csv");
        fs::write(&input, csv).unwrap();
        let config = PipelineConfig {
            input,
            output_dir: dir.path().join("site"),
            template_dir: None,
            temp_dir: dir.path().join("repositories"),
            skip_empty: false,
            fetch_avatars: true,
            show_progress: false,
        };
        Workspace { _dir: dir, config }
    }

    const TWO_PACKAGES: &str = "name,repository_type,repository_url,depended_by\n\
                                A,git,https://example.org/a,\n\
                                B,git,https://example.org/b,A\n";

    fn two_package_backend() -> FakeBackend {
        FakeBackend::default()
            .with_log("https://example.org/a", "commit 1\nAuthor: Ann <ann@example.org>\n")
            .with_log("https://example.org/b", "commit 2\nAuthor: Bo <bo@example.org>\n")
    }

    #[test]
    fn builds_merged_network() {
        let ws = workspace(TWO_PACKAGES);
        let backend = two_package_backend();
        let fetcher = FakeFetcher::default();

        let summary = run(&ws.config, &backend, &fetcher).unwrap();
        assert_eq!(summary, RunSummary { packages: 2, contributor_files_written: 2, dependencies: 1 });

        let network = Graph::load(&ws.config.network_path()).unwrap();
        assert_eq!(network.node_count(), 2);
        // Persons stay in the per-package files.
        assert!(network.nodes().all(|n| n.group == NodeGroup::Package));
        let edges = network.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, "package:A");
        assert_eq!(edges[0].to, "package:B");
        assert_eq!(edges[0].label, DEPENDS_ON);
        assert_eq!(edges[0].color, "blue");

        let a = Graph::load(&ws.config.data_dir().join("package:A.json")).unwrap();
        assert_eq!(a.node_count(), 1);
        let person = a.nodes().next().unwrap();
        assert_eq!(person.label, "Ann");
        assert_eq!(person.image, Some(format!("static/img/{}", person.id)));
        assert!(ws.config.image_dir().join(&person.id).exists());
        assert_eq!(a.edges()[0].label, CONTRIBUTED_TO);
        assert_eq!(a.edges()[0].to, "package:A");
        assert_eq!(a.edges()[0].width, 1.0);
        assert_eq!(fetcher.urls.borrow().len(), 2);
    }

    #[test]
    fn rerun_skips_packages_already_extracted() {
        let ws = workspace(TWO_PACKAGES);
        let backend = two_package_backend();
        let fetcher = FakeFetcher::default();

        run(&ws.config, &backend, &fetcher).unwrap();
        let first = fs::read_to_string(ws.config.network_path()).unwrap();

        // An empty backend would fail any fetch.
        let summary = run(&ws.config, &FakeBackend::default(), &fetcher).unwrap();
        assert_eq!(summary.contributor_files_written, 0);
        assert_eq!(fs::read_to_string(ws.config.network_path()).unwrap(), first);
        assert_eq!(backend.clones.borrow().len(), 2);
    }

    #[test]
    fn shared_contributor_gets_one_id() {
        let ws = workspace(TWO_PACKAGES);
        let backend = FakeBackend::default()
            .with_log("https://example.org/a", "Author: Ann <ann@example.org>\nAuthor: Ann <ann@example.org>\n")
            .with_log("https://example.org/b", "Author: ANN <Ann@Example.org>\nAuthor: Bo <bo@example.org>\n");
        let fetcher = FakeFetcher::default();
        run(&ws.config, &backend, &fetcher).unwrap();

        let a = Graph::load(&ws.config.data_dir().join("package:A.json")).unwrap();
        let b = Graph::load(&ws.config.data_dir().join("package:B.json")).unwrap();
        assert_eq!(a.edges()[0].from, b.edges()[0].from);
        // The cached avatar is reused for the second package.
        assert_eq!(fetcher.urls.borrow().len(), 2);
    }

    #[test]
    fn weights_span_the_visual_range() {
        let ws = workspace("name,repository_type,repository_url,depended_by\nA,git,https://example.org/a,\n");
        let backend = FakeBackend::default().with_log(
            "https://example.org/a",
            "Author: X <x@e.org>\nAuthor: X <x@e.org>\nAuthor: X <x@e.org>\nAuthor: Y <y@e.org>\nAuthor: Z <z@e.org>\nAuthor: Z <z@e.org>\n",
        );
        let mut config = ws.config.clone();
        config.fetch_avatars = false;
        run(&config, &backend, &FakeFetcher::default()).unwrap();

        let a = Graph::load(&config.data_dir().join("package:A.json")).unwrap();
        let widths: Vec<f64> = a.edges().iter().map(|e| e.width).collect();
        assert_eq!(widths, vec![10.0, 5.5, 1.0]);
        assert!(a.nodes().all(|n| n.image.as_deref().unwrap_or("").starts_with("https://www.gravatar.com/")));
    }

    #[test]
    fn unknown_dependent_aborts_the_run() {
        let ws = workspace("name,repository_type,repository_url,depended_by\nB,git,https://example.org/b,Ghost\n");
        let backend = two_package_backend();
        let result = run(&ws.config, &backend, &FakeFetcher::default());
        assert!(matches!(result, Err(Error::NotFound(name)) if name == "Ghost"));
        assert!(!ws.config.network_path().exists());
    }

    #[test]
    fn unsupported_kind_aborts_before_fetching() {
        let ws = workspace("name,repository_type,repository_url,depended_by\nA,svn,https://example.org/a,\n");
        let backend = two_package_backend();
        let result = run(&ws.config, &backend, &FakeFetcher::default());
        assert!(matches!(result, Err(Error::UnsupportedKind(kind)) if kind == "svn"));
        assert!(backend.clones.borrow().is_empty());
    }

    #[test]
    fn fetch_failure_leaves_earlier_packages_in_place() {
        let ws = workspace(
            "name,repository_type,repository_url,depended_by\n\
             A,git,https://example.org/a,\n\
             C,git,https://example.org/unreachable,\n",
        );
        let backend = two_package_backend();
        let result = run(&ws.config, &backend, &FakeFetcher::default());
        assert!(matches!(result, Err(Error::Fetch { .. })));
        assert!(ws.config.data_dir().join("package:A.json").exists());
        assert!(!ws.config.data_dir().join("package:C.json").exists());
    }

    #[test]
    fn empty_history_is_fatal_unless_skipped() {
        let csv = "name,repository_type,repository_url,depended_by\nA,git,https://example.org/a,\n";
        let backend = FakeBackend::default().with_log("https://example.org/a", "commit 1\nDate: today\n");

        let ws = workspace(csv);
        let result = run(&ws.config, &backend, &FakeFetcher::default());
        assert!(matches!(result, Err(Error::EmptyHistory { package }) if package == "A"));

        let mut config = ws.config.clone();
        config.skip_empty = true;
        let summary = run(&config, &backend, &FakeFetcher::default()).unwrap();
        assert_eq!(summary.contributor_files_written, 0);
        assert!(!config.data_dir().join("package:A.json").exists());
        assert_eq!(Graph::load(&config.network_path()).unwrap().node_count(), 1);
    }
}
