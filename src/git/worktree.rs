use crate::errors::Result;
use crate::git::ops::GitOps;
use crate::git::repository::GitRepository;
use git2::Repository;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Routes git operations to the working directory a branch is checked out in.
///
/// A branch checked out in a linked worktree must be driven from that
/// worktree's working directory, not the main one; everything else runs
/// against the main working directory. This is the single place that
/// decision is made.
pub struct WorkingTreeResolver {
    main: Box<dyn GitOps>,
    by_branch: HashMap<String, Box<dyn GitOps>>,
}

impl WorkingTreeResolver {
    pub fn new(main: Box<dyn GitOps>) -> Self {
        Self {
            main,
            by_branch: HashMap::new(),
        }
    }

    /// Register a capability for a branch checked out in a linked worktree
    pub fn register(&mut self, branch: impl Into<String>, ops: Box<dyn GitOps>) {
        self.by_branch.insert(branch.into(), ops);
    }

    /// Open the main working directory and every linked worktree of the
    /// repository containing `path`.
    pub fn discover(path: &Path, remote_name: &str) -> Result<Self> {
        let main = GitRepository::open_with_remote(path, remote_name)?;
        let repo = Repository::discover(path)
            .map_err(|e| crate::errors::TrellisError::config(format!("Not a git repository: {e}")))?;

        let mut resolver = Self::new(Box::new(main));

        for name in repo.worktrees()?.iter().flatten() {
            let worktree = match repo.find_worktree(name) {
                Ok(wt) => wt,
                Err(e) => {
                    debug!("Skipping worktree '{}': {}", name, e);
                    continue;
                }
            };
            let wt_path = worktree.path().to_path_buf();
            let ops = match GitRepository::open_with_remote(&wt_path, remote_name) {
                Ok(ops) => ops,
                Err(e) => {
                    debug!("Skipping worktree at {}: {}", wt_path.display(), e);
                    continue;
                }
            };
            match ops.current_branch() {
                Ok(branch) => {
                    debug!("Worktree {} has '{}' checked out", wt_path.display(), branch);
                    resolver.register(branch, Box::new(ops));
                }
                Err(e) => debug!("Skipping worktree at {}: {}", wt_path.display(), e),
            }
        }

        Ok(resolver)
    }

    /// The main working directory
    pub fn main(&self) -> &dyn GitOps {
        self.main.as_ref()
    }

    /// The working directory a branch must be operated from
    pub fn for_branch(&self, name: &str) -> &dyn GitOps {
        match self.by_branch.get(name) {
            Some(ops) => ops.as_ref(),
            None => self.main.as_ref(),
        }
    }

    /// Whether the branch is checked out in a linked worktree
    pub fn is_in_linked_worktree(&self, name: &str) -> bool {
        self.by_branch.contains_key(name)
    }
}
