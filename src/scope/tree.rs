//! In-process scope hierarchy.

use crate::types::{DestroyCallback, DestroyEvent, ScopeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Scope;

/// Internal per-scope state. Removed from the tree on destroy.
struct ScopeNode {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    callbacks: Vec<DestroyCallback<ScopeId>>,
}

impl ScopeNode {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            callbacks: Vec::new(),
        }
    }
}

struct TreeInner {
    /// Live scopes by ID.
    nodes: Mutex<HashMap<ScopeId, ScopeNode>>,
    /// Counter for generating scope IDs. IDs are never reused.
    next_id: AtomicU64,
}

impl TreeInner {
    fn create(&self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut nodes = self.nodes.lock();
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        nodes.insert(id, ScopeNode::new(parent));
        id
    }

    /// Detach the subtree rooted at `id`, returning its callbacks with the
    /// scope itself first and descendants depth-first after it.
    fn detach(&self, id: ScopeId) -> Vec<(ScopeId, Vec<DestroyCallback<ScopeId>>)> {
        let mut nodes = self.nodes.lock();
        let mut detached = Vec::new();

        let parent = match nodes.get(&id) {
            Some(node) => node.parent,
            None => return detached,
        };
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = nodes.remove(&current) {
                stack.extend(node.children.iter().rev().copied());
                detached.push((current, node.callbacks));
            }
        }
        detached
    }
}

/// A tree of scopes rooted at a single root scope.
#[derive(Clone)]
pub struct ScopeTree {
    inner: Arc<TreeInner>,
    root: ScopeId,
}

impl ScopeTree {
    /// Create a tree containing only the root scope.
    pub fn new() -> Self {
        let inner = Arc::new(TreeInner {
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        });
        let root = inner.create(None);
        Self { inner, root }
    }

    /// Handle to the root scope.
    pub fn root(&self) -> ScopeHandle {
        ScopeHandle {
            id: self.root,
            tree: Arc::clone(&self.inner),
        }
    }

    /// Create a new child of the root scope.
    pub fn new_scope(&self) -> ScopeHandle {
        self.root().new_child()
    }

    /// Number of scopes not yet destroyed, root included.
    pub fn live_count(&self) -> usize {
        self.inner.nodes.lock().len()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeTree")
            .field("root", &self.root)
            .field("live", &self.live_count())
            .finish()
    }
}

/// Handle to one scope in a [`ScopeTree`].
#[derive(Clone)]
pub struct ScopeHandle {
    id: ScopeId,
    tree: Arc<TreeInner>,
}

impl ScopeHandle {
    /// Create a child scope. Children of a destroyed scope are created
    /// detached and are never destroyed through it.
    pub fn new_child(&self) -> ScopeHandle {
        let id = self.tree.create(Some(self.id));
        ScopeHandle {
            id,
            tree: Arc::clone(&self.tree),
        }
    }

    /// IDs of the direct children, in creation order.
    pub fn children(&self) -> Vec<ScopeId> {
        self.tree
            .nodes
            .lock()
            .get(&self.id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Destroy this scope and every descendant.
    ///
    /// Each destroyed scope runs its callbacks once in registration order.
    /// Destroying an already destroyed scope does nothing.
    pub fn destroy(&self) {
        let detached = self.tree.detach(self.id);
        if detached.is_empty() {
            tracing::trace!(scope = ?self.id, "destroy on dead scope ignored");
            return;
        }

        tracing::debug!(scope = ?self.id, scopes = detached.len(), "destroying scope");

        for (id, callbacks) in detached {
            let event = DestroyEvent { scope: id };
            for callback in callbacks {
                callback(&event);
            }
        }
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("id", &self.id)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Scope for ScopeHandle {
    type Id = ScopeId;

    fn id(&self) -> ScopeId {
        self.id
    }

    fn on_destroy(&self, callback: DestroyCallback<ScopeId>) {
        let mut nodes = self.tree.nodes.lock();
        match nodes.get_mut(&self.id) {
            Some(node) => node.callbacks.push(callback),
            None => tracing::warn!(scope = ?self.id, "destroy callback on dead scope dropped"),
        }
    }

    fn is_destroyed(&self) -> bool {
        !self.tree.nodes.lock().contains_key(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<ScopeId>>>, impl Fn() -> DestroyCallback<ScopeId>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        let make = move || {
            let l = Arc::clone(&l);
            Box::new(move |event: &DestroyEvent<ScopeId>| l.lock().push(event.scope))
                as DestroyCallback<ScopeId>
        };
        (log, make)
    }

    #[test]
    fn test_ids_are_unique() {
        let tree = ScopeTree::new();
        let a = tree.new_scope();
        let b = tree.new_scope();
        let c = a.new_child();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_ne!(tree.root().id(), a.id());
        assert_eq!(tree.live_count(), 4);
    }

    #[test]
    fn test_destroy_runs_callbacks_once() {
        let tree = ScopeTree::new();
        let scope = tree.new_scope();
        let (log, make) = recorder();
        scope.on_destroy(make());
        scope.on_destroy(make());

        scope.destroy();
        scope.destroy();

        assert_eq!(*log.lock(), vec![scope.id(), scope.id()]);
        assert!(scope.is_destroyed());
    }

    #[test]
    fn test_destroy_cascades_to_children() {
        let tree = ScopeTree::new();
        let parent = tree.new_scope();
        let child = parent.new_child();
        let grandchild = child.new_child();
        let sibling = parent.new_child();
        let (log, make) = recorder();
        for scope in [&parent, &child, &grandchild, &sibling] {
            scope.on_destroy(make());
        }

        parent.destroy();

        assert_eq!(
            *log.lock(),
            vec![parent.id(), child.id(), grandchild.id(), sibling.id()]
        );
        assert!(grandchild.is_destroyed());
        assert_eq!(tree.live_count(), 1);
        assert!(tree.root().children().is_empty());
    }

    #[test]
    fn test_destroying_child_keeps_parent() {
        let tree = ScopeTree::new();
        let parent = tree.new_scope();
        let child = parent.new_child();

        child.destroy();

        assert!(!parent.is_destroyed());
        assert!(parent.children().is_empty());
    }

    #[test]
    fn test_on_destroy_after_destroy_is_dropped() {
        let tree = ScopeTree::new();
        let scope = tree.new_scope();
        scope.destroy();

        let (log, make) = recorder();
        scope.on_destroy(make());
        scope.destroy();

        assert!(log.lock().is_empty());
    }
}
