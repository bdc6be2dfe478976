//! Integration tests for the fetch session against an in-memory host.

use fetch_core::{Error, FetchConfig, FetchSession, FetchedFile, FileRole};
use fetch_rules::{BundlerRules, LockfileScan, ManifestRules, Reference};
use fetch_source::{ContentClient, SourceDescriptor};
use fetch_test_utils::{MemoryHost, RepoFixture};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const REPO: &str = "gocardless/bump";

const GEMFILE: &str = "source \"https://rubygems.org\"\n\ngem \"business\", \"~> 1.4.0\"\n";
const LOCKFILE: &str = "GEM\n  remote: https://rubygems.org/\n  specs:\n    business (1.4.0)\n\nPLATFORMS\n  ruby\n\nDEPENDENCIES\n  business (~> 1.4.0)\n";

fn repo() -> RepoFixture {
    RepoFixture::new(REPO, "sha")
}

fn source() -> SourceDescriptor {
    SourceDescriptor::new("github", REPO)
}

async fn fetch_with(
    repo: RepoFixture,
    config: FetchConfig,
    source: SourceDescriptor,
) -> (Arc<MemoryHost>, fetch_core::Result<Vec<FetchedFile>>) {
    fetch_core::logging::init_for_tests();
    let host = Arc::new(MemoryHost::new("github").with_repo(repo));
    let client: Arc<dyn ContentClient> = host.clone();
    let session = FetchSession::from_config(client, config).unwrap();
    let result = session.run(&source).await;
    (host, result)
}

async fn fetch(repo: RepoFixture) -> (Arc<MemoryHost>, fetch_core::Result<Vec<FetchedFile>>) {
    fetch_with(repo, FetchConfig::default(), source()).await
}

fn paths(files: &[FetchedFile]) -> Vec<&str> {
    files.iter().map(|f| f.path.as_str()).collect()
}

// ==========================================================================
// Primary manifest and lock file
// ==========================================================================

#[tokio::test]
async fn test_fetches_gemfile_and_lockfile() {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", GEMFILE)
            .file("Gemfile.lock", LOCKFILE)
            .file("README.md", "# bump"),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(paths(&files), vec!["Gemfile", "Gemfile.lock"]);
    assert_eq!(files[0].role, FileRole::Manifest);
    assert_eq!(files[1].role, FileRole::Lockfile);
    assert_eq!(files[0].text(), GEMFILE);
    assert_eq!(files[0].context.repo, REPO);
    assert_eq!(files[0].context.commit.as_str(), "sha");
}

#[tokio::test]
async fn test_manifest_without_lockfile() {
    let (_, result) = fetch(repo().file("Gemfile", GEMFILE)).await;
    assert_eq!(paths(&result.unwrap()), vec!["Gemfile"]);
}

#[tokio::test]
async fn test_gems_rb_project() {
    let (_, result) = fetch(
        repo()
            .file("gems.rb", GEMFILE)
            .file("gems.locked", LOCKFILE),
    )
    .await;
    assert_eq!(paths(&result.unwrap()), vec!["gems.rb", "gems.locked"]);
}

#[tokio::test]
async fn test_first_candidate_wins_exclusively() {
    let (host, result) = fetch(
        repo()
            .file("Gemfile", GEMFILE)
            .file("gems.rb", GEMFILE)
            .file("gems.locked", LOCKFILE),
    )
    .await;
    assert_eq!(paths(&result.unwrap()), vec!["Gemfile"]);
    assert_eq!(host.read_count(REPO, "/gems.rb"), 0);
}

#[tokio::test]
async fn test_missing_manifest_names_first_candidate() {
    let (_, result) = fetch(repo().file("README.md", "# bump")).await;
    match result {
        Err(Error::DependencyFileNotFound { file_path }) => assert_eq!(file_path, "/Gemfile"),
        other => panic!("expected DependencyFileNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_required_lockfile_missing() {
    let config = FetchConfig::default().with_require_lockfile(true);
    let (_, result) = fetch_with(repo().file("Gemfile", GEMFILE), config, source()).await;
    let err = result.unwrap_err();
    assert!(matches!(&err, Error::DependencyFileNotFound { file_path } if file_path == "/Gemfile.lock"));
    assert_eq!(err.file_name(), Some("Gemfile.lock"));
}

/// Bundler rules that demand a lock file once the manifest pins its Bundler version.
struct PinnedBundlerRules(BundlerRules);

impl ManifestRules for PinnedBundlerRules {
    fn id(&self) -> &str {
        "pinned-bundler"
    }

    fn primary_manifest_candidates(&self) -> &[&'static str] {
        self.0.primary_manifest_candidates()
    }

    fn lockfile_name_for(&self, primary: &str) -> Option<String> {
        self.0.lockfile_name_for(primary)
    }

    fn lockfile_required(&self, manifest: &str) -> bool {
        manifest.lines().any(|line| line.trim_start().starts_with("# bundler:"))
    }

    fn extract_references(&self, content: &str, origin: &str) -> fetch_rules::Result<Vec<Reference>> {
        self.0.extract_references(content, origin)
    }

    fn scan_lockfile(&self, content: &str, origin: &str) -> fetch_rules::Result<LockfileScan> {
        self.0.scan_lockfile(content, origin)
    }

    fn is_path_dependency_spec(&self, filename: &str) -> bool {
        self.0.is_path_dependency_spec(filename)
    }

    fn specification_marker_filename(&self) -> &str {
        self.0.specification_marker_filename()
    }
}

async fn fetch_pinned(repo: RepoFixture) -> fetch_core::Result<Vec<FetchedFile>> {
    fetch_core::logging::init_for_tests();
    let host: Arc<dyn ContentClient> = Arc::new(MemoryHost::new("github").with_repo(repo));
    let session = FetchSession::new(
        host,
        Arc::new(PinnedBundlerRules(BundlerRules::new())),
        FetchConfig::default(),
    );
    session.run(&source()).await
}

#[tokio::test]
async fn test_lockfile_required_by_manifest_content() {
    let gemfile = format!("# bundler: 2.5.6\n{}", GEMFILE);
    let err = fetch_pinned(repo().file("Gemfile", &gemfile))
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::DependencyFileNotFound { file_path } if file_path == "/Gemfile.lock"));

    let files = fetch_pinned(repo().file("Gemfile", &gemfile).file("Gemfile.lock", LOCKFILE))
        .await
        .unwrap();
    assert_eq!(paths(&files), vec!["Gemfile", "Gemfile.lock"]);
}

#[tokio::test]
async fn test_lockfile_optional_without_rule_trigger() {
    let files = fetch_pinned(repo().file("Gemfile", GEMFILE)).await.unwrap();
    assert_eq!(paths(&files), vec!["Gemfile"]);
}

#[tokio::test]
async fn test_unreadable_optional_lockfile_is_tolerated() {
    let (_, result) = fetch(repo().file("Gemfile", GEMFILE).unreadable("Gemfile.lock")).await;
    assert_eq!(paths(&result.unwrap()), vec!["Gemfile"]);
}

#[tokio::test]
async fn test_lockfile_with_merge_conflict() {
    let lockfile = "GEM\n  specs:\n<<<<<<< HEAD\n    business (1.4.0)\n=======\n    business (1.5.0)\n>>>>>>> feature\n";
    let (_, result) = fetch(
        repo()
            .file("Gemfile", GEMFILE)
            .file("Gemfile.lock", lockfile),
    )
    .await;
    match result {
        Err(Error::DependencyFileNotParseable { file_path, .. }) => {
            assert_eq!(file_path, "/Gemfile.lock")
        }
        other => panic!("expected DependencyFileNotParseable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lockfile_with_unknown_plugin_source() {
    let gemfile = "source \"https://rubygems.org\"\ngem \"bump-core\", path: \"plugins/bump-core\"\n";
    let lockfile = "PLUGIN SOURCE\n  remote: https://plugins.example.com\n  type: vault\n  specs:\n    secret (1.0.0)\n\nGEM\n  specs:\n";
    let (_, result) = fetch(
        repo()
            .file("Gemfile", gemfile)
            .file("Gemfile.lock", lockfile),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1].text(), lockfile);
}

// ==========================================================================
// Base directory
// ==========================================================================

#[tokio::test]
async fn test_missing_directory() {
    let (_, result) = fetch_with(
        repo().file("Gemfile", GEMFILE),
        FetchConfig::default(),
        source().with_directory("/nope"),
    )
    .await;
    assert!(matches!(result, Err(Error::DirectoryNotFound { directory }) if directory == "/nope"));
}

#[tokio::test]
async fn test_directory_that_is_a_file() {
    let (_, result) = fetch_with(
        repo().file("Gemfile", GEMFILE),
        FetchConfig::default(),
        source().with_directory("/Gemfile"),
    )
    .await;
    assert!(matches!(result, Err(Error::DirectoryNotFound { .. })));
}

#[tokio::test]
async fn test_named_reference() {
    let (host, result) = fetch_with(
        repo().reference("main").file("Gemfile", GEMFILE),
        FetchConfig::default(),
        source().with_reference("main"),
    )
    .await;
    assert_eq!(paths(&result.unwrap()), vec!["Gemfile"]);
    assert_eq!(host.resolve_count(REPO), 1);
}

#[tokio::test]
async fn test_unknown_reference_is_a_client_error() {
    let (_, result) = fetch_with(
        repo().file("Gemfile", GEMFILE),
        FetchConfig::default(),
        source().with_reference("no-such-branch"),
    )
    .await;
    assert!(matches!(result, Err(Error::Client(e)) if e.is_not_found()));
}

// ==========================================================================
// Child manifests
// ==========================================================================

#[tokio::test]
async fn test_child_gemfile() {
    let gemfile = "source \"https://rubygems.org\"\neval_gemfile \"backend/Gemfile\"\n";
    let (_, result) = fetch(
        repo()
            .file("Gemfile", gemfile)
            .file("Gemfile.lock", LOCKFILE)
            .file("backend/Gemfile", GEMFILE),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(paths(&files), vec!["Gemfile", "Gemfile.lock", "backend/Gemfile"]);
    assert_eq!(files[2].role, FileRole::ChildManifest);
}

#[tokio::test]
async fn test_circular_child_gemfiles_terminate() {
    let (host, result) = fetch(
        repo()
            .file("Gemfile", "eval_gemfile \"backend/Gemfile\"\n")
            .file("backend/Gemfile", "eval_gemfile \"../Gemfile\"\n"),
    )
    .await;

    assert_eq!(paths(&result.unwrap()), vec!["Gemfile", "backend/Gemfile"]);
    assert_eq!(host.read_count(REPO, "/Gemfile"), 1);
    assert_eq!(host.read_count(REPO, "/backend/Gemfile"), 1);
}

#[tokio::test]
async fn test_cascading_child_gemfiles_depth_first() {
    let (_, result) = fetch(
        repo()
            .file(
                "Gemfile",
                "eval_gemfile \"a/Gemfile\"\neval_gemfile \"c/Gemfile\"\n",
            )
            .file("a/Gemfile", "eval_gemfile File.join(__dir__, \"b\", \"Gemfile\")\n")
            .file("a/b/Gemfile", GEMFILE)
            .file("c/Gemfile", GEMFILE),
    )
    .await;

    assert_eq!(
        paths(&result.unwrap()),
        vec!["Gemfile", "a/Gemfile", "a/b/Gemfile", "c/Gemfile"]
    );
}

#[tokio::test]
async fn test_missing_child_gemfile() {
    let (_, result) = fetch(repo().file("Gemfile", "eval_gemfile \"backend/Gemfile\"\n")).await;
    let err = result.unwrap_err();
    assert!(matches!(err, Error::DependencyFileNotFound { .. }));
    assert_eq!(err.file_name(), Some("Gemfile"));
    assert_eq!(err.directory(), Some("/backend"));
}

#[tokio::test]
async fn test_child_gemfile_named_by_variable() {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "eval_gemfile(child_gemfile_path)\n")
            .file("Gemfile.lock", LOCKFILE),
    )
    .await;
    match result {
        Err(Error::DependencyFileNotParseable { file_path, message }) => {
            assert_eq!(file_path, "/Gemfile");
            assert!(message.contains("child_gemfile_path"));
        }
        other => panic!("expected DependencyFileNotParseable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_require_relative_outside_base_directory() {
    let (_, result) = fetch_with(
        repo()
            .file("test/Gemfile", "require_relative \"../constants\"\ngem \"rspec\"\n")
            .file("constants.rb", "VERSION = \"1.0\"\n"),
        FetchConfig::default(),
        source().with_directory("/test"),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(paths(&files), vec!["Gemfile", "../constants.rb"]);
    assert_eq!(files[1].repo_path.as_str(), "/constants.rb");
}

#[tokio::test]
async fn test_gemspec_beside_manifest() {
    let gemspec = "require_relative \"lib/bump/version\"\n\nGem::Specification.new do |spec|\n  spec.name = \"bump\"\nend\n";
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "source \"https://rubygems.org\"\ngemspec\n")
            .file("Gemfile.lock", LOCKFILE)
            .file("bump.gemspec", gemspec)
            .file("lib/bump/version.rb", "VERSION = \"1.0\"\n"),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(
        paths(&files),
        vec!["Gemfile", "Gemfile.lock", "bump.gemspec", "lib/bump/version.rb"]
    );
    assert_eq!(files[2].role, FileRole::Specification);
}

#[tokio::test]
async fn test_ruby_version_support_file() {
    let gemfile = "source \"https://rubygems.org\"\nruby File.read(\".ruby-version\").strip\n";
    let (_, result) = fetch(
        repo()
            .file("Gemfile", gemfile)
            .file(".ruby-version", "3.3.0\n"),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(paths(&files), vec!["Gemfile", ".ruby-version"]);
    assert_eq!(files[1].role, FileRole::Support);
}

#[tokio::test]
async fn test_missing_support_file_is_not_requested() {
    let gemfile = "ruby File.read(\".ruby-version\").strip\n";
    let (host, result) = fetch(repo().file("Gemfile", gemfile)).await;
    assert_eq!(paths(&result.unwrap()), vec!["Gemfile"]);
    assert_eq!(host.read_count(REPO, "/.ruby-version"), 0);
}

// ==========================================================================
// Client failures
// ==========================================================================

#[tokio::test]
async fn test_rate_limit_is_propagated_unchanged() {
    let host = Arc::new(
        MemoryHost::new("github")
            .with_repo(repo().file("Gemfile", GEMFILE))
            .with_failure(
                "/",
                fetch_source::Error::RateLimited {
                    retry_after_secs: Some(60),
                },
            ),
    );
    let client: Arc<dyn ContentClient> = host.clone();
    let session = FetchSession::from_config(client, FetchConfig::default()).unwrap();

    let err = session.run(&source()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Client(fetch_source::Error::RateLimited {
            retry_after_secs: Some(60)
        })
    ));
}

#[tokio::test]
async fn test_unauthorized_read_is_not_reclassified() {
    let host = Arc::new(
        MemoryHost::new("github")
            .with_repo(repo().file("Gemfile", GEMFILE).file("Gemfile.lock", LOCKFILE))
            .with_failure(
                "/Gemfile.lock",
                fetch_source::Error::Unauthorized {
                    message: "Bad credentials".to_string(),
                },
            ),
    );
    let client: Arc<dyn ContentClient> = host.clone();
    let session = FetchSession::from_config(client, FetchConfig::default()).unwrap();

    let err = session.run(&source()).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(err.to_string().contains("Bad credentials"));
}

// ==========================================================================
// Session lifecycle
// ==========================================================================

#[tokio::test]
async fn test_each_run_starts_with_a_fresh_cache() {
    let host = Arc::new(MemoryHost::new("github").with_repo(repo().file("Gemfile", GEMFILE)));
    let client: Arc<dyn ContentClient> = host.clone();
    let session = FetchSession::from_config(client, FetchConfig::default()).unwrap();

    session.run(&source()).await.unwrap();
    session.run(&source()).await.unwrap();

    assert_eq!(host.read_count(REPO, "/Gemfile"), 2);
    assert_eq!(host.resolve_count(REPO), 2);
}

#[tokio::test]
async fn test_unknown_ecosystem() {
    let client: Arc<dyn ContentClient> = Arc::new(MemoryHost::new("github"));
    let result = FetchSession::from_config(client, FetchConfig::default().with_ecosystem("npm"));
    assert!(matches!(result, Err(Error::UnknownEcosystem { id }) if id == "npm"));
}
