//! Integration tests for path dependency resolution.

use fetch_core::{Error, FetchConfig, FetchSession, FetchedFile, FileRole};
use fetch_source::{ContentClient, SourceDescriptor};
use fetch_test_utils::{MemoryHost, RepoFixture};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

const REPO: &str = "gocardless/bump";
const GEMSPEC: &str = "Gem::Specification.new do |spec|\n  spec.name = \"bump-core\"\nend\n";

fn repo() -> RepoFixture {
    RepoFixture::new(REPO, "sha")
}

async fn fetch_with(
    repo: RepoFixture,
    config: FetchConfig,
) -> (Arc<MemoryHost>, fetch_core::Result<Vec<FetchedFile>>) {
    fetch_core::logging::init_for_tests();
    let host = Arc::new(MemoryHost::new("github").with_repo(repo));
    let client: Arc<dyn ContentClient> = host.clone();
    let session = FetchSession::from_config(client, config).unwrap();
    let result = session.run(&SourceDescriptor::new("github", REPO)).await;
    (host, result)
}

async fn fetch(repo: RepoFixture) -> (Arc<MemoryHost>, fetch_core::Result<Vec<FetchedFile>>) {
    fetch_with(repo, FetchConfig::default()).await
}

fn paths(files: &[FetchedFile]) -> Vec<&str> {
    files.iter().map(|f| f.path.as_str()).collect()
}

fn lockfile_with_paths(remotes: &[&str]) -> String {
    let mut lockfile = String::new();
    for remote in remotes {
        lockfile.push_str(&format!("PATH\n  remote: {}\n  specs:\n\n", remote));
    }
    lockfile.push_str("GEM\n  remote: https://rubygems.org/\n  specs:\n\nPLATFORMS\n  ruby\n");
    lockfile
}

#[tokio::test]
async fn test_path_gem_from_manifest() {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "gem \"bump-core\", path: \"plugins/bump-core\"\n")
            .file("plugins/bump-core/bump-core.gemspec", GEMSPEC)
            .file("plugins/bump-core/lib/bump_core.rb", ""),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(
        paths(&files),
        vec!["Gemfile", "plugins/bump-core/bump-core.gemspec"]
    );
    assert_eq!(files[1].role, FileRole::Specification);
}

#[tokio::test]
async fn test_path_sources_from_lockfile() {
    let lockfile = lockfile_with_paths(&["plugins/bump-core"]);
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "gem \"bump-core\", path: \"plugins/bump-core\"\n")
            .file("Gemfile.lock", &lockfile)
            .file("plugins/bump-core/bump-core.gemspec", GEMSPEC),
    )
    .await;

    assert_eq!(
        paths(&result.unwrap()),
        vec!["Gemfile", "Gemfile.lock", "plugins/bump-core/bump-core.gemspec"]
    );
}

#[tokio::test]
async fn test_lockfile_supersedes_manifest_path_declarations() {
    let (host, result) = fetch(
        repo()
            .file("Gemfile", "gem \"stale\", path: \"plugins/stale\"\n")
            .file("Gemfile.lock", lockfile_with_paths(&[])),
    )
    .await;

    assert_eq!(paths(&result.unwrap()), vec!["Gemfile", "Gemfile.lock"]);
    assert_eq!(host.list_count(REPO, "/plugins/stale"), 0);
}

#[tokio::test]
async fn test_directory_without_specification() {
    let lockfile = lockfile_with_paths(&["plugins/bump-core"]);
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "source \"https://rubygems.org\"\n")
            .file("Gemfile.lock", &lockfile)
            .file("plugins/bump-core/README.md", "# core"),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "The following path based dependencies could not be retrieved:\n* bump-core"
    );
    let fetched = err.fetched_files().unwrap();
    assert_eq!(paths(fetched), vec!["Gemfile", "Gemfile.lock"]);
}

#[tokio::test]
async fn test_missing_directory_is_unreachable_not_fatal() {
    let (_, result) = fetch(
        repo()
            .file(
                "Gemfile",
                "gem \"gone\", path: \"vendor/gone\"\ngem \"here\", path: \"vendor/here\"\n",
            )
            .file("vendor/here/here.gemspec", GEMSPEC),
    )
    .await;

    match result {
        Err(Error::PathDependenciesNotReachable {
            dependencies,
            fetched,
        }) => {
            let names: Vec<&str> = dependencies.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["gone"]);
            assert_eq!(paths(&fetched), vec!["Gemfile", "vendor/here/here.gemspec"]);
        }
        other => panic!("expected PathDependenciesNotReachable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_names_are_listed_once_in_discovery_order() {
    let (_, result) = fetch(repo().file(
        "Gemfile",
        "gem \"b\", path: \"vendor/b\"\ngem \"a\", path: \"vendor/a\"\ngem \"b\", path: \"other/b\"\n",
    ))
    .await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "The following path based dependencies could not be retrieved:\n* b\n* a"
    );
}

#[tokio::test]
async fn test_nested_specifications_are_found() {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "path \"components\" do\n  gem \"admin\"\n  gem \"billing\"\nend\n")
            .file("components/admin/admin.gemspec", GEMSPEC)
            .file("components/billing/billing.gemspec", GEMSPEC)
            .file("components/README.md", ""),
    )
    .await;

    assert_eq!(
        paths(&result.unwrap()),
        vec![
            "Gemfile",
            "components/admin/admin.gemspec",
            "components/billing/billing.gemspec"
        ]
    );
}

#[tokio::test]
async fn test_search_depth_is_bounded() {
    let (_, result) = fetch_with(
        repo()
            .file("Gemfile", "path \"components\" do\nend\n")
            .file("components/admin/admin.gemspec", GEMSPEC),
        FetchConfig::default().with_max_search_depth(0),
    )
    .await;

    assert!(matches!(
        result,
        Err(Error::PathDependenciesNotReachable { .. })
    ));
}

#[rstest]
#[case::outer_declared_first(
    "gem \"outer\", path: \"vendor\"\ngem \"inner\", path: \"vendor/a/b/c/d\"\n"
)]
#[case::inner_declared_first(
    "gem \"inner\", path: \"vendor/a/b/c/d\"\ngem \"outer\", path: \"vendor\"\n"
)]
#[tokio::test]
async fn test_search_depth_applies_per_dependency(#[case] gemfile: &str) {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", gemfile)
            .file("vendor/a/b/c/d/e/inner.gemspec", GEMSPEC),
    )
    .await;

    match result {
        Err(Error::PathDependenciesNotReachable {
            dependencies,
            fetched,
        }) => {
            let names: Vec<&str> = dependencies.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["outer"]);
            assert_eq!(
                paths(&fetched),
                vec!["Gemfile", "vendor/a/b/c/d/e/inner.gemspec"]
            );
        }
        other => panic!("expected PathDependenciesNotReachable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_shared_directory_is_listed_once() {
    let lockfile = lockfile_with_paths(&["vendor", "vendor/shared"]);
    let (host, result) = fetch(
        repo()
            .file("Gemfile", "source \"https://rubygems.org\"\n")
            .file("Gemfile.lock", &lockfile)
            .file("vendor/shared/shared.gemspec", GEMSPEC),
    )
    .await;

    assert_eq!(
        paths(&result.unwrap()),
        vec!["Gemfile", "Gemfile.lock", "vendor/shared/shared.gemspec"]
    );
    assert_eq!(host.list_count(REPO, "/vendor/shared"), 1);
    assert_eq!(host.read_count(REPO, "/vendor/shared/shared.gemspec"), 1);
}

#[tokio::test]
async fn test_specification_marker_fallback() {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "gem \"legacy\", path: \"vendor/legacy\"\n")
            .file("vendor/legacy/.specification", "--- !ruby/object:Gem::Specification\n")
            .file("vendor/legacy/lib/legacy.rb", ""),
    )
    .await;

    let files = result.unwrap();
    assert_eq!(paths(&files), vec!["Gemfile", "vendor/legacy/.specification"]);
    assert_eq!(files[1].role, FileRole::Specification);
}

#[tokio::test]
async fn test_unreadable_specification_is_not_enough() {
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "gem \"core\", path: \"vendor/core\"\n")
            .unreadable("vendor/core/core.gemspec"),
    )
    .await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "The following path based dependencies could not be retrieved:\n* core"
    );
}

#[tokio::test]
async fn test_specification_references_are_followed() {
    let gemspec = "require_relative \"lib/core/version\"\nGem::Specification.new do |spec|\nend\n";
    let (_, result) = fetch(
        repo()
            .file("Gemfile", "gem \"core\", path: \"vendor/core\"\n")
            .file("vendor/core/core.gemspec", gemspec)
            .file("vendor/core/lib/core/version.rb", "VERSION = \"0.1.0\"\n"),
    )
    .await;

    assert_eq!(
        paths(&result.unwrap()),
        vec![
            "Gemfile",
            "vendor/core/core.gemspec",
            "vendor/core/lib/core/version.rb"
        ]
    );
}

#[tokio::test]
async fn test_python_editable_install() {
    let requirements = "-r requirements/base.txt\n-e ./libs/core\n";
    let (_, result) = fetch_with(
        repo()
            .file("requirements.txt", requirements)
            .file("requirements/base.txt", "requests==2.31.0\n")
            .file("libs/core/setup.py", "from setuptools import setup\nsetup(name=\"core\")\n"),
        FetchConfig::default().with_ecosystem("pip"),
    )
    .await;

    assert_eq!(
        paths(&result.unwrap()),
        vec!["requirements.txt", "requirements/base.txt", "libs/core/setup.py"]
    );
}
