//! Indexed tree arena
//!
//! Nodes live in a flat map keyed by their payload's id; parent and child
//! links are ids, not pointers. The map is the index, so a node is findable
//! exactly when it is part of the tree.

use crate::moves::MoveId;
use std::collections::HashMap;
use tracing::trace;

/// Payloads that expose a session-unique id
pub trait Indexed {
    fn index(&self) -> MoveId;
}

/// Structural errors raised by [`IndexedTree`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("tree already has a root (#{0})")]
    RootExists(MoveId),
    #[error("parent #{0} is not in this tree")]
    ParentNotFound(MoveId),
    #[error("node #{0} is already indexed")]
    DuplicateId(MoveId),
    #[error("node #{0} is not in this tree")]
    NotFound(MoveId),
    #[error("node #{parent} lists child #{child} which is not indexed")]
    DanglingChild { parent: MoveId, child: MoveId },
    #[error("node #{0} is indexed but not reachable from the root")]
    Detached(MoveId),
}

#[derive(Debug, Clone)]
struct Node<T> {
    data: T,
    parent: Option<MoveId>,
    children: Vec<MoveId>,
}

/// Result of looking a node up in one particular tree
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Found(NodeRef<'a, T>),
    /// Not here; other trees may still hold it
    NotInThisTree,
    /// The tree's links are inconsistent around this id
    Structural(TreeError),
}

/// Borrowed view of a node
#[derive(Debug)]
pub struct NodeRef<'a, T> {
    tree: &'a IndexedTree<T>,
    id: MoveId,
    node: &'a Node<T>,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    pub fn id(&self) -> MoveId {
        self.id
    }

    pub fn data(&self) -> &'a T {
        &self.node.data
    }

    pub fn parent(&self) -> Option<NodeRef<'a, T>> {
        self.node.parent.and_then(|id| self.tree.find(id))
    }

    /// Child ids in insertion order
    pub fn child_ids(&self) -> &'a [MoveId] {
        &self.node.children
    }

    /// Children in insertion order
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, T>> + 'a {
        let tree = self.tree;
        self.node.children.iter().filter_map(move |id| tree.find(*id))
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    /// Number of edges between this node and the root
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.node.parent;
        while let Some(id) = current {
            depth += 1;
            current = self.tree.nodes.get(&id).and_then(|n| n.parent);
        }
        depth
    }
}

/// Tree of [`Indexed`] payloads with O(1) lookup by id
#[derive(Debug, Clone)]
pub struct IndexedTree<T> {
    root: Option<MoveId>,
    nodes: HashMap<MoveId, Node<T>>,
}

impl<T> Default for IndexedTree<T> {
    fn default() -> Self {
        Self {
            root: None,
            nodes: HashMap::new(),
        }
    }
}

impl<T> IndexedTree<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree rooted at `data`
    pub fn with_root(data: T) -> Self
    where
        T: Indexed,
    {
        let id = data.index();
        let mut nodes = HashMap::new();
        nodes.insert(
            id,
            Node {
                data,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            root: Some(id),
            nodes,
        }
    }

    /// Install the root of an empty tree
    pub fn set_root(&mut self, data: T) -> Result<MoveId, TreeError>
    where
        T: Indexed,
    {
        if let Some(root) = self.root {
            return Err(TreeError::RootExists(root));
        }
        let id = data.index();
        self.nodes.insert(
            id,
            Node {
                data,
                parent: None,
                children: Vec::new(),
            },
        );
        self.root = Some(id);
        trace!(node = id, "root installed");
        Ok(id)
    }

    /// Attach `data` as the last child of `parent`
    pub fn insert(&mut self, parent: MoveId, data: T) -> Result<MoveId, TreeError>
    where
        T: Indexed,
    {
        let id = data.index();
        if self.nodes.contains_key(&id) {
            return Err(TreeError::DuplicateId(id));
        }
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(TreeError::ParentNotFound(parent))?;
        parent_node.children.push(id);
        self.nodes.insert(
            id,
            Node {
                data,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        trace!(node = id, parent, "node inserted");
        Ok(id)
    }

    pub fn root(&self) -> Option<NodeRef<'_, T>> {
        self.root.and_then(|id| self.find(id))
    }

    pub fn root_id(&self) -> Option<MoveId> {
        self.root
    }

    pub fn find(&self, id: MoveId) -> Option<NodeRef<'_, T>> {
        self.nodes.get(&id).map(|node| NodeRef {
            tree: self,
            id,
            node,
        })
    }

    pub fn contains(&self, id: MoveId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look `id` up, checking that its parent link is consistent
    pub fn locate(&self, id: MoveId) -> Lookup<'_, T> {
        let Some(node) = self.find(id) else {
            return Lookup::NotInThisTree;
        };
        match node.node.parent {
            None if self.root == Some(id) => Lookup::Found(node),
            None => Lookup::Structural(TreeError::Detached(id)),
            Some(parent) => match self.nodes.get(&parent) {
                Some(p) if p.children.contains(&id) => Lookup::Found(node),
                _ => Lookup::Structural(TreeError::Detached(id)),
            },
        }
    }

    /// Child ids of `id` in insertion order
    pub fn children(&self, id: MoveId) -> Option<&[MoveId]> {
        self.nodes.get(&id).map(|n| n.children.as_slice())
    }

    pub fn parent(&self, id: MoveId) -> Option<MoveId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Remove `id` and all of its descendants, returning their payloads in
    /// pre-order
    pub fn remove_subtree(&mut self, id: MoveId) -> Result<Vec<T>, TreeError> {
        let parent = match self.nodes.get(&id) {
            Some(node) => node.parent,
            None => return Err(TreeError::NotFound(id)),
        };

        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.nodes.get(&current).ok_or(TreeError::DanglingChild {
                parent: self.parent(current).unwrap_or(id),
                child: current,
            })?;
            order.push(current);
            stack.extend(node.children.iter().rev().copied());
        }

        match parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|child| *child != id);
                }
            }
            None => self.root = None,
        }

        let removed = order
            .into_iter()
            .filter_map(|node_id| self.nodes.remove(&node_id).map(|n| n.data))
            .collect::<Vec<_>>();
        trace!(node = id, removed = removed.len(), "subtree removed");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order traversal from the root, children in insertion order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Verify that the index and the links describe the same tree
    pub fn check_integrity(&self) -> Result<(), TreeError> {
        let mut reachable = 0;
        let mut stack: Vec<MoveId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(&id).ok_or(TreeError::NotFound(id))?;
            reachable += 1;
            for child in &node.children {
                match self.nodes.get(child) {
                    Some(c) if c.parent == Some(id) => stack.push(*child),
                    _ => {
                        return Err(TreeError::DanglingChild {
                            parent: id,
                            child: *child,
                        })
                    }
                }
            }
        }
        if reachable != self.nodes.len() {
            let stray = self
                .nodes
                .keys()
                .copied()
                .find(|id| self.locate(*id).is_unreachable())
                .unwrap_or_default();
            return Err(TreeError::Detached(stray));
        }
        Ok(())
    }
}

impl<T> Lookup<'_, T> {
    fn is_unreachable(&self) -> bool {
        matches!(self, Lookup::Structural(_))
    }
}

/// Pre-order iterator over an [`IndexedTree`]
pub struct Iter<'a, T> {
    tree: &'a IndexedTree<T>,
    stack: Vec<MoveId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = NodeRef<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(node) = self.tree.find(id) {
                self.stack.extend(node.child_ids().iter().rev().copied());
                return Some(node);
            }
        }
        None
    }
}
