use crate::errors::{Result, TrellisError};
use crate::utils::atomic_file;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// One branch in a stack's declared tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<BranchNode>,
}

impl BranchNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }
}

/// Declared shape of a stack: a named tree of branches rooted at a shared
/// source branch.
///
/// This is pure configuration, owned by the on-disk store. Computed status
/// is a separate, immutable snapshot (`stack::status`) rebuilt for every
/// command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    pub id: Uuid,
    pub name: String,
    /// Shared branch every root branch is layered on
    pub source_branch: String,
    /// Top-level branches, in tracking order
    pub branches: Vec<BranchNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StackConfig {
    pub fn new(name: String, source_branch: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            source_branch,
            branches: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Every declared branch name, preorder, in configuration order
    pub fn all_branch_names(&self) -> Vec<String> {
        fn walk(nodes: &[BranchNode], out: &mut Vec<String>) {
            for node in nodes {
                out.push(node.name.clone());
                walk(&node.children, out);
            }
        }
        let mut names = Vec::new();
        walk(&self.branches, &mut names);
        names
    }

    pub fn contains_branch(&self, name: &str) -> bool {
        self.find_branch(name).is_some()
    }

    pub fn find_branch(&self, name: &str) -> Option<&BranchNode> {
        fn walk<'a>(nodes: &'a [BranchNode], name: &str) -> Option<&'a BranchNode> {
            for node in nodes {
                if node.name == name {
                    return Some(node);
                }
                if let Some(found) = walk(&node.children, name) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.branches, name)
    }

    fn find_branch_mut(&mut self, name: &str) -> Option<&mut BranchNode> {
        fn walk<'a>(nodes: &'a mut [BranchNode], name: &str) -> Option<&'a mut BranchNode> {
            for node in nodes {
                if node.name == name {
                    return Some(node);
                }
                if let Some(found) = walk(&mut node.children, name) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.branches, name)
    }

    /// Add a branch under `parent` (or as a new root branch when `parent`
    /// is the source branch or absent). Branch names are unique per stack.
    pub fn track_branch(&mut self, name: &str, parent: Option<&str>) -> Result<()> {
        if name == self.source_branch {
            return Err(TrellisError::validation(format!(
                "'{name}' is the source branch of stack '{}'",
                self.name
            )));
        }
        if self.contains_branch(name) {
            return Err(TrellisError::validation(format!(
                "Branch '{name}' is already tracked in stack '{}'",
                self.name
            )));
        }

        let node = BranchNode::new(name);
        match parent {
            None => self.branches.push(node),
            Some(parent) if parent == self.source_branch => self.branches.push(node),
            Some(parent) => {
                let stack_name = self.name.clone();
                let parent_node = self.find_branch_mut(parent).ok_or_else(|| {
                    TrellisError::validation(format!(
                        "Parent branch '{parent}' is not tracked in stack '{stack_name}'"
                    ))
                })?;
                parent_node.children.push(node);
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a branch from the tree; its children are spliced into the
    /// position it occupied, preserving order.
    pub fn untrack_branch(&mut self, name: &str) -> Result<()> {
        fn remove(nodes: &mut Vec<BranchNode>, name: &str) -> bool {
            if let Some(pos) = nodes.iter().position(|n| n.name == name) {
                let removed = nodes.remove(pos);
                for (offset, child) in removed.children.into_iter().enumerate() {
                    nodes.insert(pos + offset, child);
                }
                return true;
            }
            nodes.iter_mut().any(|n| remove(&mut n.children, name))
        }

        if remove(&mut self.branches, name) {
            self.updated_at = Utc::now();
            Ok(())
        } else {
            Err(TrellisError::validation(format!(
                "Branch '{name}' is not tracked in stack '{}'",
                self.name
            )))
        }
    }

    /// Root-to-leaf paths through the declared tree, in document order
    pub fn branch_lines(&self) -> Vec<Vec<&BranchNode>> {
        fn walk<'a>(
            node: &'a BranchNode,
            prefix: &mut Vec<&'a BranchNode>,
            out: &mut Vec<Vec<&'a BranchNode>>,
        ) {
            prefix.push(node);
            if node.children.is_empty() {
                out.push(prefix.clone());
            } else {
                for child in &node.children {
                    walk(child, prefix, out);
                }
            }
            prefix.pop();
        }

        let mut lines = Vec::new();
        let mut prefix = Vec::new();
        for root in &self.branches {
            walk(root, &mut prefix, &mut lines);
        }
        lines
    }
}

/// On-disk collection of stacks for one repository, stored in
/// `.trellis/stacks.json` at the repository root.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StacksFile {
    active_stack: Option<Uuid>,
    stacks: Vec<StackConfig>,
}

pub struct StackConfigStore {
    path: PathBuf,
    file: StacksFile,
}

impl StackConfigStore {
    pub fn stacks_file_path(repo_root: &Path) -> PathBuf {
        repo_root.join(".trellis").join("stacks.json")
    }

    /// Load the store for a repository, empty if none exists yet
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = Self::stacks_file_path(repo_root);
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| TrellisError::config(format!("Failed to read stacks file: {e}")))?;
            serde_json::from_str(&content)
                .map_err(|e| TrellisError::config(format!("Failed to parse stacks file: {e}")))?
        } else {
            StacksFile::default()
        };

        Ok(Self { path, file })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| TrellisError::config(format!("Failed to create config dir: {e}")))?;
        }
        atomic_file::write_json(&self.path, &self.file)
    }

    pub fn create_stack(&mut self, name: String, source_branch: String) -> Result<&StackConfig> {
        if self.file.stacks.iter().any(|s| s.name == name) {
            return Err(TrellisError::validation(format!(
                "A stack named '{name}' already exists"
            )));
        }

        let stack = StackConfig::new(name, source_branch);
        let id = stack.id;
        info!("Created stack '{}' on '{}'", stack.name, stack.source_branch);
        let index = self.file.stacks.len();
        self.file.stacks.push(stack);
        self.file.active_stack = Some(id);
        Ok(&self.file.stacks[index])
    }

    pub fn stacks(&self) -> &[StackConfig] {
        &self.file.stacks
    }

    pub fn get_by_name(&self, name: &str) -> Option<&StackConfig> {
        self.file.stacks.iter().find(|s| s.name == name)
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut StackConfig> {
        self.file.stacks.iter_mut().find(|s| s.name == name)
    }

    pub fn active_stack(&self) -> Option<&StackConfig> {
        self.file
            .active_stack
            .and_then(|id| self.file.stacks.iter().find(|s| s.id == id))
    }

    pub fn active_stack_mut(&mut self) -> Option<&mut StackConfig> {
        let id = self.file.active_stack?;
        self.file.stacks.iter_mut().find(|s| s.id == id)
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let id = self
            .get_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| TrellisError::validation(format!("No stack named '{name}'")))?;
        self.file.active_stack = Some(id);
        Ok(())
    }
}
