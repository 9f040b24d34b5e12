use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::step::{AggregationMode, StepRecord};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle of a node inside a [`StepTree`].
///
/// Ids come from a process-wide counter and are never persisted: a tree decoded
/// from disk gets fresh ids, so ids are only meaningful within one session.
/// Use [`StepTree::path_of`] for an address that survives a save/load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A checklist node: one record plus its place in the hierarchy.
///
/// `parent` and `children` are maintained by [`StepTree`] only.
#[derive(Debug, Clone)]
pub struct StepNode {
    id: NodeId,
    pub record: StepRecord,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub mode: AggregationMode,
    /// Presentation only: whether the children are shown.
    pub expanded: bool,
}

impl StepNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An ordered forest of steps stored as an arena.
///
/// Every structural operation keeps `parent` handles and child lists in sync.
/// Operations that would make a node its own descendant, or that name a node not
/// in the tree, do nothing and report `false` / `None`.
#[derive(Debug, Clone, Default)]
pub struct StepTree {
    nodes: BTreeMap<NodeId, StepNode>,
    roots: Vec<NodeId>,
}

impl StepTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&StepNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut StepNode> {
        self.nodes.get_mut(&id)
    }

    pub fn record(&self, id: NodeId) -> Option<&StepRecord> {
        self.nodes.get(&id).map(|n| &n.record)
    }

    pub fn record_mut(&mut self, id: NodeId) -> Option<&mut StepRecord> {
        self.nodes.get_mut(&id).map(|n| &mut n.record)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Position of a node among its siblings.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let node = self.nodes.get(&id)?;
        self.siblings(node.parent).iter().position(|&s| s == id)
    }

    pub fn add_root(&mut self, record: StepRecord) -> NodeId {
        let id = NodeId::next();
        self.nodes.insert(id, Self::fresh_node(id, record));
        self.attach(id, None, usize::MAX);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, record: StepRecord) -> Option<NodeId> {
        self.insert(Some(parent), usize::MAX, record)
    }

    /// Insert a new node at `index` under `parent` (or among the roots). An
    /// index past the end appends.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        index: usize,
        record: StepRecord,
    ) -> Option<NodeId> {
        if let Some(p) = parent {
            if !self.contains(p) {
                return None;
            }
        }
        let id = NodeId::next();
        self.nodes.insert(id, Self::fresh_node(id, record));
        self.attach(id, parent, index);
        Some(id)
    }

    /// Remove a node and its whole subtree, returning the node's record.
    pub fn remove(&mut self, id: NodeId) -> Option<StepRecord> {
        if !self.contains(id) {
            return None;
        }
        let doomed = self.subtree(id);
        self.detach(id);
        let mut removed = None;
        for node_id in doomed {
            let node = self.nodes.remove(&node_id);
            if node_id == id {
                removed = node.map(|n| n.record);
            }
        }
        removed
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// Re-parent `id` under `new_parent` (or to the roots) at `index`, counted
    /// after `id` has been taken out of its current list.
    pub fn move_node(&mut self, id: NodeId, new_parent: Option<NodeId>, index: usize) -> bool {
        if !self.contains(id) {
            return false;
        }
        if let Some(p) = new_parent {
            if !self.contains(p) || self.is_ancestor_or_self(id, p) {
                tracing::debug!(node = %id, target = %p, "Refusing move into own subtree");
                return false;
            }
        }
        self.detach(id);
        self.attach(id, new_parent, index);
        true
    }

    /// Swap a node with its previous sibling.
    pub fn shift_up(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if pos == 0 {
            return false;
        }
        let parent = self.parent(id);
        self.siblings_mut(parent).swap(pos, pos - 1);
        true
    }

    /// Swap a node with its next sibling.
    pub fn shift_down(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let parent = self.parent(id);
        let siblings = self.siblings_mut(parent);
        if pos + 1 >= siblings.len() {
            return false;
        }
        siblings.swap(pos, pos + 1);
        true
    }

    /// Make a node the sibling directly after its parent.
    pub fn promote(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let grandparent = self.parent(parent);
        let Some(parent_pos) = self.position(parent) else {
            return false;
        };
        self.move_node(id, grandparent, parent_pos + 1)
    }

    /// Make a node the last child of its previous sibling.
    pub fn demote(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if pos == 0 {
            return false;
        }
        let previous = self.siblings(self.parent(id))[pos - 1];
        self.move_node(id, Some(previous), usize::MAX)
    }

    /// Deep-copy a node and its subtree right after the original. Copies get
    /// fresh ids and start out not completed.
    pub fn duplicate(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id)?.parent;
        let pos = self.position(id)?;
        self.copy_subtree(id, parent, pos + 1)
    }

    /// All nodes in document order (pre-order, roots first to last).
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.collect_subtree(root, &mut out);
        }
        out
    }

    /// A node followed by its descendants in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.contains(id) {
            self.collect_subtree(id, &mut out);
        }
        out
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(c) = current {
            depth += 1;
            current = self.parent(c);
        }
        depth
    }

    /// Resolve a dotted path of 1-based sibling positions, e.g. `2.1`.
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        let mut siblings = self.roots.as_slice();
        let mut found = None;
        for segment in path.trim().split('.') {
            let index: usize = segment.trim().parse().ok()?;
            let id = *siblings.get(index.checked_sub(1)?)?;
            siblings = self.children(id);
            found = Some(id);
        }
        found
    }

    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            segments.push((self.position(c)? + 1).to_string());
            current = self.parent(c);
        }
        segments.reverse();
        Some(segments.join("."))
    }

    /// Clear completion flags under `id`, or in the whole tree.
    pub fn reset_completion(&mut self, id: Option<NodeId>) -> usize {
        let targets = match id {
            Some(id) => self.subtree(id),
            None => self.depth_first(),
        };
        let mut cleared = 0;
        for target in targets {
            if let Some(record) = self.record_mut(target) {
                if record.completed {
                    record.completed = false;
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Compare shape, records, modes and expanded flags, ignoring ids.
    pub fn structurally_eq(&self, other: &StepTree) -> bool {
        self.lists_eq(&self.roots, other, &other.roots)
    }

    fn lists_eq(&self, mine: &[NodeId], other: &StepTree, theirs: &[NodeId]) -> bool {
        mine.len() == theirs.len()
            && mine.iter().zip(theirs).all(|(&a, &b)| {
                match (self.get(a), other.get(b)) {
                    (Some(x), Some(y)) => {
                        x.record == y.record
                            && x.mode == y.mode
                            && x.expanded == y.expanded
                            && self.lists_eq(&x.children, other, &y.children)
                    }
                    _ => false,
                }
            })
    }

    fn fresh_node(id: NodeId, record: StepRecord) -> StepNode {
        StepNode {
            id,
            record,
            parent: None,
            children: Vec::new(),
            mode: AggregationMode::default(),
            expanded: true,
        }
    }

    fn copy_subtree(
        &mut self,
        source: NodeId,
        parent: Option<NodeId>,
        index: usize,
    ) -> Option<NodeId> {
        let node = self.get(source)?;
        let mut record = node.record.clone();
        record.completed = false;
        let mode = node.mode;
        let expanded = node.expanded;
        let children = node.children.clone();

        let copy = self.insert(parent, index, record)?;
        if let Some(n) = self.get_mut(copy) {
            n.mode = mode;
            n.expanded = expanded;
        }
        for child in children {
            self.copy_subtree(child, Some(copy), usize::MAX);
        }
        Some(copy)
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in self.children(id) {
            self.collect_subtree(child, out);
        }
    }

    fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => self.children(p),
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => &mut node.children,
            None => &mut self.roots,
        }
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.parent(id);
        self.siblings_mut(parent).retain(|&s| s != id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    fn attach(&mut self, id: NodeId, parent: Option<NodeId>, index: usize) {
        let siblings = self.siblings_mut(parent);
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
        }
    }
}
