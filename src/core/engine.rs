//! Engine - libgit2-backed version control for a scope
//!
//! The repository's git directory is the scope's store path and its workdir
//! is the scope's root, so history metadata never sits inside the tree it
//! tracks. Everything above this module speaks keys and commits; this module
//! speaks paths, trees and refs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{
    build::CheckoutBuilder, BranchType, DiffFormat, ErrorCode, Oid, Repository,
    RepositoryInitOptions, ResetType, Signature, Sort, StatusOptions,
};
use tracing::debug;

use super::branch::Branch;
use super::history::{ChangeKind, Commit, StagedChange};
use super::scope::{Scope, SENTINEL_FILE, STORE_DIR};
use crate::error::{MemError, OpContext, Result};

pub const DEFAULT_BRANCH: &str = "main";
pub const AUTHOR_NAME: &str = "mem";
pub const AUTHOR_EMAIL: &str = "mem@local";

const INIT_MESSAGE: &str = "init: initialize mem repository";
const SENTINEL_CONTENT: &str = "mem repository initialized\n";

/// Open handle on a scope's repository
pub struct GitEngine {
    repo: Repository,
    root: PathBuf,
}

impl GitEngine {
    /// Create a repository for `scope` with a seeded initial commit
    pub fn init(scope: &Scope) -> Result<Self> {
        fs::create_dir_all(&scope.store).op("create store directory")?;
        fs::create_dir_all(&scope.root).op("create root directory")?;

        // Initialized bare so libgit2 writes no gitlink into the root; the
        // workdir is attached per handle instead.
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head(DEFAULT_BRANCH).mkpath(true);

        let repo = Repository::init_opts(&scope.store, &opts).op("init repository")?;
        repo.set_workdir(&scope.root, false).op("set workdir")?;

        let exclude = scope.store.join("info").join("exclude");
        if let Some(parent) = exclude.parent() {
            fs::create_dir_all(parent).op("create info directory")?;
        }
        fs::write(&exclude, format!("/{}/\n", STORE_DIR)).op("write exclude file")?;

        fs::write(scope.sentinel_path(), SENTINEL_CONTENT).op("write init file")?;

        let engine = Self {
            repo,
            root: scope.root.clone(),
        };
        engine.stage(Path::new(SENTINEL_FILE))?;
        engine.commit(INIT_MESSAGE)?;

        debug!(store = %scope.store.display(), "initialized repository");
        Ok(engine)
    }

    /// Reopen the repository of an initialized scope
    pub fn open(scope: &Scope) -> Result<Self> {
        if !scope.store.is_dir() {
            return Err(MemError::NotInitialized(scope.store.clone()));
        }

        let repo = Repository::open(&scope.store).op("open repository")?;
        repo.set_workdir(&scope.root, false).op("set workdir")?;

        Ok(Self {
            repo,
            root: scope.root.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ============== Index ==============

    /// Stage the current on-disk state of `rel`
    pub fn stage(&self, rel: &Path) -> Result<()> {
        let mut index = self.repo.index().op("open index")?;
        index.add_path(rel).op("stage file")?;
        index.write().op("write index")
    }

    /// Unstage `rel` and delete it from the working tree
    pub fn remove(&self, rel: &Path) -> Result<()> {
        let mut index = self.repo.index().op("open index")?;
        index.remove_path(rel).op("unstage file")?;
        index.write().op("write index")?;

        let abs = self.root.join(rel);
        fs::remove_file(&abs).op("remove file")?;
        self.prune_empty_dirs(&abs);
        Ok(())
    }

    fn prune_empty_dirs(&self, removed: &Path) {
        let mut dir = removed.parent();
        while let Some(d) = dir {
            if d == self.root || !d.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
    }

    /// Paths whose staged state differs from HEAD, sorted by path
    pub fn staged_changes(&self) -> Result<Vec<StagedChange>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .renames_head_to_index(false);

        let statuses = self.repo.statuses(Some(&mut opts)).op("get status")?;

        let mut changes: Vec<StagedChange> = statuses
            .iter()
            .filter_map(|entry| {
                let status = entry.status();
                let kind = if status.is_index_new() {
                    ChangeKind::Added
                } else if status.is_index_modified() || status.is_index_typechange() {
                    ChangeKind::Modified
                } else if status.is_index_deleted() {
                    ChangeKind::Deleted
                } else {
                    return None;
                };
                entry.path().map(|p| StagedChange {
                    path: p.to_string(),
                    kind,
                })
            })
            .collect();

        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changes)
    }

    /// Blob content of `rel` in HEAD's tree, if present
    pub fn head_blob(&self, rel: &Path) -> Result<Option<Vec<u8>>> {
        let Some(head) = self.head_commit()? else {
            return Ok(None);
        };
        let tree = head.tree().op("get HEAD tree")?;
        let entry = match tree.get_path(rel) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e).op("lookup tree entry"),
        };
        let blob = entry
            .to_object(&self.repo)
            .and_then(|o| o.peel_to_blob())
            .op("read blob")?;
        Ok(Some(blob.content().to_vec()))
    }

    // ============== Commits ==============

    /// Commit the index as one snapshot under the store identity
    pub fn commit(&self, message: &str) -> Result<Commit> {
        let mut index = self.repo.index().op("open index")?;
        let tree_id = index.write_tree().op("write tree")?;
        let parent = self.head_commit()?;

        let unchanged = match &parent {
            Some(p) => p.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(MemError::NothingToCommit);
        }

        let tree = self.repo.find_tree(tree_id).op("find tree")?;
        let sig = Signature::now(AUTHOR_NAME, AUTHOR_EMAIL).op("build signature")?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .op("commit")?;
        let commit = self.repo.find_commit(oid).op("get commit")?;

        debug!(hash = %oid, "created commit");
        Ok(to_commit(&commit))
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => head.peel_to_commit().map(Some).op("get HEAD commit"),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e).op("get HEAD"),
        }
    }

    /// Commits reachable from HEAD, newest first; `limit == 0` is unbounded
    pub fn log(&self, limit: usize) -> Result<Vec<Commit>> {
        let mut walk = self.repo.revwalk().op("get log")?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME).op("sort log")?;
        walk.push_head().op("get log")?;

        let mut commits = Vec::new();
        for oid in walk {
            if limit > 0 && commits.len() >= limit {
                break;
            }
            let oid = oid.op("walk log")?;
            let commit = self.repo.find_commit(oid).op("get commit")?;
            commits.push(to_commit(&commit));
        }
        Ok(commits)
    }

    /// Resolve a revision expression to a commit id
    pub fn resolve(&self, rev: &str) -> Result<Oid> {
        let object = match self.repo.revparse_single(rev) {
            Ok(o) => o,
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                return Err(MemError::NotFound(format!("revision {}", rev)))
            }
            Err(e) => return Err(e).op("resolve ref"),
        };
        let commit = object.peel_to_commit().op("resolve ref")?;
        Ok(commit.id())
    }

    pub fn find_commit(&self, oid: Oid) -> Result<Commit> {
        let commit = self.repo.find_commit(oid).op("get commit")?;
        Ok(to_commit(&commit))
    }

    /// Patch text of the changes from `from` to HEAD
    pub fn diff_to_head(&self, from: Oid) -> Result<String> {
        let head = self
            .head_commit()?
            .ok_or_else(|| MemError::NotFound("HEAD".to_string()))?;
        let head_tree = head.tree().op("get HEAD tree")?;
        let from_tree = self
            .repo
            .find_commit(from)
            .and_then(|c| c.tree())
            .op("get target tree")?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&from_tree), Some(&head_tree), None)
            .op("diff trees")?;
        render_patch(&diff)
    }

    /// Move the current branch and working tree to `target`, discarding changes
    pub fn reset_hard(&self, target: Oid) -> Result<()> {
        let object = self.repo.find_object(target, None).op("resolve ref")?;
        self.repo.reset(&object, ResetType::Hard, None).op("reset")
    }

    // ============== Branches ==============

    pub fn current_branch(&self) -> Result<Branch> {
        let head = self.repo.head().op("get HEAD")?;
        Ok(Branch {
            name: head.shorthand().unwrap_or("HEAD").to_string(),
            head: head.target().map(|o| o.to_string()).unwrap_or_default(),
            created_at: None,
        })
    }

    /// Local branches sorted by name
    pub fn branches(&self) -> Result<Vec<Branch>> {
        let iter = self.repo.branches(Some(BranchType::Local)).op("list branches")?;

        let mut branches = Vec::new();
        for item in iter {
            let (branch, _) = item.op("list branches")?;
            let name = branch.name().op("read branch name")?.unwrap_or_default().to_string();
            let head = branch
                .get()
                .target()
                .map(|o| o.to_string())
                .unwrap_or_default();
            branches.push(Branch {
                name,
                head,
                created_at: None,
            });
        }

        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    /// New branch at HEAD; does not switch
    pub fn create_branch(&self, name: &str) -> Result<Branch> {
        let head = self
            .head_commit()?
            .ok_or_else(|| MemError::NotFound("HEAD".to_string()))?;
        let branch = self.repo.branch(name, &head, false).op("create branch")?;
        let target = branch.get().target().map(|o| o.to_string()).unwrap_or_default();

        Ok(Branch {
            name: name.to_string(),
            head: target,
            created_at: Some(Utc::now()),
        })
    }

    /// Check out `name`, replacing working-tree contents
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let branch = self.find_branch(name)?;
        let refname = branch
            .get()
            .name()
            .ok_or_else(|| MemError::NotFound(format!("branch {}", name)))?
            .to_string();
        let commit = branch.get().peel_to_commit().op("checkout branch")?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .op("checkout branch")?;
        self.repo.set_head(&refname).op("checkout branch")
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let current = self.current_branch()?;
        if current.name == name {
            return Err(MemError::CurrentBranch(name.to_string()));
        }
        let mut branch = self.find_branch(name)?;
        branch.delete().op("delete branch")
    }

    fn find_branch(&self, name: &str) -> Result<git2::Branch<'_>> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(b) => Ok(b),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(MemError::NotFound(format!("branch {}", name)))
            }
            Err(e) => Err(e).op("find branch"),
        }
    }
}

/// Render a diff as unified patch text
pub(crate) fn render_patch(diff: &git2::Diff<'_>) -> Result<String> {
    let mut out = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            out.push(line.origin());
        }
        out.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .op("render patch")?;
    Ok(out)
}

pub(crate) fn to_commit(c: &git2::Commit<'_>) -> Commit {
    let timestamp = DateTime::<Utc>::from_timestamp(c.time().seconds(), 0).unwrap_or_default();

    Commit {
        hash: c.id().to_string(),
        message: c.message().unwrap_or("").trim().to_string(),
        author: c.author().name().unwrap_or("").to_string(),
        timestamp,
        parents: c.parent_ids().map(|p| p.to_string()).collect(),
    }
}
