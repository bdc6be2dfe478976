//! Path dependency resolution and submodule crossing

use super::{Location, Pending, Scope, Traversal, single_entry};
use crate::error::Result;
use crate::file::FileRole;
use async_recursion::async_recursion;
use fetch_source::{DirectoryEntry, RepoPath};
use std::sync::Arc;

impl Traversal {
    /// Find a specification for the path dependency `name` at `target`.
    ///
    /// Never fails for a missing directory or specification; those are
    /// recorded as unreachable and reported once traversal is complete.
    pub(super) async fn visit_path_dependency(
        &mut self,
        name: &str,
        target: Location,
    ) -> Result<Vec<Pending>> {
        tracing::debug!(dependency = name, path = %target.root_path(), "Resolving path dependency");

        let Some(directory) = self.locate_directory(target).await? else {
            self.mark_unreachable(name, "directory not found");
            return Ok(Vec::new());
        };

        let mut discovered = Vec::new();
        let budget = self.config.max_search_depth;
        if self
            .search_directory(directory.clone(), budget, &mut discovered)
            .await?
            .is_some()
        {
            return Ok(discovered);
        }
        if self.fetch_marker(&directory).await? {
            return Ok(discovered);
        }

        self.mark_unreachable(name, "no specification file found");
        Ok(discovered)
    }

    /// Turn `target` into a listable directory, crossing into a submodule
    /// when the target is one or lies inside one.
    #[async_recursion]
    async fn locate_directory(&mut self, target: Location) -> Result<Option<Location>> {
        match self.client.list(target.context(), &target.path).await {
            Ok(entries) => match single_entry(&entries, &target.path) {
                Some(entry) if entry.is_submodule() => {
                    if !self.config.follow_submodules {
                        return Ok(None);
                    }
                    let entry = entry.clone();
                    self.enter_submodule(&target.scope, &entry).await
                }
                Some(_) => Ok(None),
                None => Ok(Some(target)),
            },
            Err(e) if e.is_not_found() => self.find_enclosing_submodule(target).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Walk up from a missing `target`, nearest ancestor first, looking for
    /// a submodule mount point that contains it.
    async fn find_enclosing_submodule(&mut self, target: Location) -> Result<Option<Location>> {
        if !self.config.follow_submodules {
            return Ok(None);
        }
        for ancestor in target.path.ancestors() {
            let entries = match self.client.list(target.context(), &ancestor).await {
                Ok(entries) => entries,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            // The nearest existing ancestor decides
            let Some(mount) = entries
                .iter()
                .find(|e| e.is_submodule() && target.path.starts_with(&e.path))
                .cloned()
            else {
                return Ok(None);
            };
            let Some(root) = self.enter_submodule(&target.scope, &mount).await? else {
                return Ok(None);
            };
            let rest = target.path.strip_prefix(&mount.path).unwrap_or_default();
            return self.locate_directory(root.at(RepoPath::new(rest))).await;
        }
        Ok(None)
    }

    /// Search `directory` for specification files, descending at most
    /// `budget` levels into subdirectories and submodules when it has none.
    ///
    /// Returns the depth of the shallowest specification found. Outcomes are
    /// memoised per directory; a directory is searched again only when a
    /// later caller may descend further than the recorded search did.
    #[async_recursion]
    async fn search_directory(
        &mut self,
        directory: Location,
        budget: usize,
        discovered: &mut Vec<Pending>,
    ) -> Result<Option<usize>> {
        let key = directory.key();
        if let Some(found_at) = self.searched.get(&key).and_then(|o| o.answer(budget)) {
            return Ok(found_at);
        }

        let entries = match self.client.list(directory.context(), &directory.path).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let specs: Vec<Location> = entries
            .iter()
            .filter(|e| e.is_file() && self.rules.is_path_dependency_spec(&e.name))
            .map(|e| directory.at(e.path.clone()))
            .collect();

        let mut found_at = None;
        for spec in specs {
            if self.visited.contains(&spec.key()) {
                found_at = Some(0);
                continue;
            }
            if let Some(content) = self.fetch_optional(&spec, FileRole::Specification).await? {
                let text = String::from_utf8_lossy(&content).into_owned();
                discovered.extend(self.scan(&spec, &text)?);
                found_at = Some(0);
            }
        }

        if found_at.is_none() && budget > 0 {
            let children: Vec<DirectoryEntry> = entries
                .iter()
                .filter(|e| e.is_directory() || (e.is_submodule() && self.config.follow_submodules))
                .cloned()
                .collect();
            for entry in children {
                let child = if entry.is_submodule() {
                    match self.enter_submodule(&directory.scope, &entry).await? {
                        Some(root) => root,
                        None => continue,
                    }
                } else {
                    directory.at(entry.path.clone())
                };
                if let Some(depth) = self.search_directory(child, budget - 1, discovered).await? {
                    found_at = Some(found_at.map_or(depth + 1, |d: usize| d.min(depth + 1)));
                }
            }
        }

        self.searched.insert(key, SearchOutcome { found_at, budget });
        Ok(found_at)
    }

    /// Accept the marker file in `directory` in place of a specification.
    async fn fetch_marker(&mut self, directory: &Location) -> Result<bool> {
        let marker = directory.child(self.rules.specification_marker_filename());
        if self.visited.contains(&marker.key()) {
            return Ok(true);
        }
        if !self.exists(&marker).await? {
            return Ok(false);
        }
        Ok(self
            .fetch_optional(&marker, FileRole::Specification)
            .await?
            .is_some())
    }

    /// Pin the submodule's target commit and open a scope for it.
    ///
    /// Returns `None` when the target repository or ref cannot be found.
    pub(super) async fn enter_submodule(
        &self,
        parent: &Scope,
        entry: &DirectoryEntry,
    ) -> Result<Option<Location>> {
        let target = match self.client.submodule_target(entry).await {
            Ok(target) => target,
            Err(e) if e.is_not_found() => {
                tracing::warn!(path = %entry.path, "Submodule target not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let context = match self
            .client
            .open_context(&target.repo, &target.reference)
            .await
        {
            Ok(context) => context,
            Err(e) if e.is_not_found() => {
                tracing::warn!(repo = %target.repo, reference = %target.reference, "Submodule commit not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mount = parent.mount.join(entry.path.as_str());
        tracing::debug!(%context, mount = %mount, "Entering submodule");
        Ok(Some(Location {
            scope: Arc::new(Scope { context, mount }),
            path: RepoPath::root(),
        }))
    }
}

/// Recorded result of searching one directory.
#[derive(Debug, Clone, Copy)]
pub(super) struct SearchOutcome {
    /// Depth of the shallowest specification below the directory
    found_at: Option<usize>,
    /// How many levels the search was allowed to descend
    budget: usize,
}

impl SearchOutcome {
    /// The result a search with `budget` would return, when this outcome
    /// already decides it.
    fn answer(&self, budget: usize) -> Option<Option<usize>> {
        match self.found_at {
            // Nothing shallower exists, or the recorded search would have found it
            Some(depth) => Some(Some(depth).filter(|d| *d <= budget)),
            None => (budget <= self.budget).then_some(None),
        }
    }
}
