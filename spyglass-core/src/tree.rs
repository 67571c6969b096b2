//! Incremental remote-directory-tree model.
//!
//! Holds the lazily-populated folder hierarchy of one selected root,
//! driven by successive directory-listing responses. Nodes live in an
//! arena map keyed by id (the full prefix-relative path; the synthetic
//! root is `""`), with children as id references — no widget lifecycle.
//!
//! Only folders materialize as nodes. Files and symlinks are exposed to
//! the table collaborator straight from the listing entries, which keeps
//! navigation from rebuilding the whole tree and makes duplicate or
//! out-of-order listing responses harmless (inserts are idempotent).

use std::collections::HashMap;

use crate::wire::FileEntry;

/// Id of the synthetic root node.
pub const ROOT_NODE_ID: &str = "";

// ── TreeNode ─────────────────────────────────────────────────────

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic node for the selected root itself.
    Root,
    /// A remote folder.
    Folder,
}

/// One node of the folder tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: String,
    pub kind: NodeKind,
    /// Child node ids, sorted, no duplicates.
    pub children: Vec<String>,
    /// Whether a listing for this node has been applied.
    pub loaded: bool,
    /// Whether the node is expanded in the viewer.
    pub open: bool,
}

impl TreeNode {
    fn new(id: String, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            children: Vec::new(),
            loaded: false,
            open: false,
        }
    }
}

// ── FolderTree ───────────────────────────────────────────────────

/// The materialized folder hierarchy of one selected root.
#[derive(Debug, Default)]
pub struct FolderTree {
    nodes: HashMap<String, TreeNode>,
    root_path: Option<String>,
    selected: Option<String>,
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all nodes and start a fresh tree for `root`.
    pub fn select_root(&mut self, root: &str) {
        self.nodes.clear();
        let mut node = TreeNode::new(ROOT_NODE_ID.to_string(), NodeKind::Root);
        node.open = true;
        self.nodes.insert(ROOT_NODE_ID.to_string(), node);
        self.root_path = Some(root.to_string());
        self.selected = Some(ROOT_NODE_ID.to_string());
    }

    /// Apply one directory-listing response.
    ///
    /// Folder entries become nodes with id `prefix + path`, inserted
    /// under the node identified by `prefix` — idempotently: an id that
    /// already exists is left untouched, and non-folder entries are never
    /// inserted. Afterwards the prefix node is loaded, open and selected.
    pub fn apply_listing(&mut self, prefix: &str, entries: &[FileEntry]) {
        let parent_id = prefix.trim_end_matches('/').to_string();
        self.ensure_branch(&parent_id);

        for entry in entries.iter().filter(|e| e.is_folder()) {
            let id = format!("{prefix}{}", entry.path);
            if self.nodes.contains_key(&id) {
                continue;
            }
            self.nodes
                .insert(id.clone(), TreeNode::new(id.clone(), NodeKind::Folder));
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                insert_sorted(&mut parent.children, id);
            }
        }

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.loaded = true;
            parent.open = true;
        }
        self.selected = Some(parent_id);
    }

    /// Create any missing ancestors of `id`, root downwards.
    ///
    /// Listings normally arrive for prefixes whose nodes already exist;
    /// this tolerates out-of-order responses, which the protocol does
    /// not prevent.
    fn ensure_branch(&mut self, id: &str) {
        let mut missing: Vec<String> = Vec::new();
        let mut cursor = id.to_string();
        while !self.nodes.contains_key(&cursor) {
            missing.push(cursor.clone());
            if cursor.is_empty() {
                break;
            }
            cursor = parent_of(&cursor).to_string();
        }

        for node_id in missing.into_iter().rev() {
            let kind = if node_id.is_empty() {
                NodeKind::Root
            } else {
                NodeKind::Folder
            };
            self.nodes
                .insert(node_id.clone(), TreeNode::new(node_id.clone(), kind));
            if !node_id.is_empty() {
                let parent_id = parent_of(&node_id).to_string();
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    insert_sorted(&mut parent.children, node_id);
                }
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn children_of(&self, id: &str) -> Option<&[String]> {
        self.nodes.get(id).map(|n| n.children.as_slice())
    }

    /// The currently selected node, if any.
    pub fn selected(&self) -> Option<&TreeNode> {
        self.selected.as_deref().and_then(|id| self.nodes.get(id))
    }

    /// The root path this tree was built for.
    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    /// Total node count, synthetic root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn parent_of(id: &str) -> &str {
    match id.rfind('/') {
        Some(idx) => &id[..idx],
        None => ROOT_NODE_ID,
    }
}

fn insert_sorted(children: &mut Vec<String>, id: String) {
    if let Err(pos) = children.binary_search(&id) {
        children.insert(pos, id);
    }
}

// ── Tests ────────────────────────────────────────────────────────
