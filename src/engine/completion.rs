//! Completion Node - Readiness barrier tree.
//!
//! Each component instance owns one node. A node completes once, when:
//! - its component has attached, and
//! - every direct child has completed.
//!
//! Completion propagates upward through the parent's `child_completed()`, so
//! the tree behaves like a nested barrier: a parent only completes after its
//! whole subtree has, regardless of the order children attach in.
//!
//! # Ordering precondition
//!
//! Children must be created before their parent attaches. A child created
//! after the parent already fired is not waited for. Disposing a child
//! detaches it, so the parent stops waiting for it.
//!
//! ```ignore
//! let root = CompletionNode::new_root();
//! let child = root.child(ChildOptions::named("color-panel"));
//!
//! child.mark_attached(None);  // child completes, root still waits
//! root.mark_attached(None);   // root completes now
//! ```

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::types::ViewModel;

/// Callback fired when a node completes.
pub type CompletedCallback = Rc<dyn Fn(&CompletionNode)>;

/// Identifier returned by `add_completed_callback`.
pub type CallbackId = usize;

/// Whether a node already fired its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    #[default]
    NeverCompleted,
    CompletedOnce,
}

/// Options applied when creating a child node.
#[derive(Clone, Default)]
pub struct ChildOptions {
    /// Label used in diagnostics.
    pub component_name: Option<String>,
    /// Fired once when the child completes.
    pub completed_callback: Option<CompletedCallback>,
    /// Start in the completed state; the node then never fires.
    pub initial_completed: bool,
}

impl ChildOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            component_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn on_completed(mut self, callback: impl Fn(&CompletionNode) + 'static) -> Self {
        self.completed_callback = Some(Rc::new(callback));
        self
    }
}

// =============================================================================
// Node State
// =============================================================================

struct NodeInner {
    /// Traversal only, never keeps the parent alive.
    parent: Weak<RefCell<NodeInner>>,
    children: Vec<CompletionNode>,
    attached: bool,
    children_completed: usize,
    /// Counted in the parent's `children_completed`.
    notified_parent: bool,
    completion: Completion,
    component_name: Option<String>,
    instance: Option<Rc<dyn ViewModel>>,
    callbacks: Vec<(CallbackId, CompletedCallback)>,
    next_callback_id: CallbackId,
    verbose: bool,
}

/// Shared handle to one node of the completion tree.
///
/// Cloning the handle does not clone the node.
#[derive(Clone)]
pub struct CompletionNode {
    inner: Rc<RefCell<NodeInner>>,
}

impl CompletionNode {
    /// Create a parentless node (the page root).
    pub fn new_root() -> Self {
        Self::with_parent(Weak::new(), false)
    }

    fn with_parent(parent: Weak<RefCell<NodeInner>>, verbose: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeInner {
                parent,
                children: Vec::new(),
                attached: false,
                children_completed: 0,
                notified_parent: false,
                completion: Completion::NeverCompleted,
                component_name: None,
                instance: None,
                callbacks: Vec::new(),
                next_callback_id: 0,
                verbose,
            })),
        }
    }

    // =========================================================================
    // Tree Construction
    // =========================================================================

    /// Create a new child node. The parent now waits for it.
    pub fn child(&self, options: ChildOptions) -> CompletionNode {
        let verbose = self.inner.borrow().verbose;
        let child = Self::with_parent(Rc::downgrade(&self.inner), verbose);
        child.apply_options(options);
        self.inner.borrow_mut().children.push(child.clone());
        child
    }

    /// Get the child stored in `slot`, creating it on first use.
    ///
    /// Repeated calls for the same slot return the same node, so the parent
    /// never counts a logical item twice.
    pub fn child_for(&self, slot: &OnceCell<CompletionNode>) -> CompletionNode {
        let child = slot.get_or_init(|| self.child(ChildOptions::default()));
        child.clone()
    }

    fn apply_options(&self, options: ChildOptions) {
        if let Some(callback) = options.completed_callback {
            self.push_callback(callback);
        }
        let mut inner = self.inner.borrow_mut();
        if options.component_name.is_some() {
            inner.component_name = options.component_name;
        }
        if options.initial_completed {
            inner.completion = Completion::CompletedOnce;
        }
    }

    /// Set the diagnostic label.
    pub fn set_component_name(&self, name: impl Into<String>) {
        self.inner.borrow_mut().component_name = Some(name.into());
    }

    /// Enable per-node trace output for this node and children created later.
    pub fn set_verbose(&self, verbose: bool) {
        self.inner.borrow_mut().verbose = verbose;
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Register a callback fired when this node completes.
    pub fn add_completed_callback(
        &self,
        callback: impl Fn(&CompletionNode) + 'static,
    ) -> CallbackId {
        self.push_callback(Rc::new(callback))
    }

    fn push_callback(&self, callback: CompletedCallback) -> CallbackId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_callback_id;
        inner.next_callback_id += 1;
        inner.callbacks.push((id, callback));
        id
    }

    /// Unregister one completion callback.
    pub fn remove_completed_callback(&self, id: CallbackId) {
        self.inner
            .borrow_mut()
            .callbacks
            .retain(|(cb_id, _)| *cb_id != id);
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// The component's root element is live.
    pub fn mark_attached(&self, instance: Option<Rc<dyn ViewModel>>) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.attached = true;
            if instance.is_some() {
                inner.instance = instance;
            }
        }
        self.try_complete();
    }

    /// One direct child finished.
    pub fn child_completed(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            debug_assert!(inner.children_completed < inner.children.len());
            inner.children_completed += 1;
        }
        self.try_complete();
    }

    fn try_complete(&self) {
        let (callbacks, parent) = {
            let mut inner = self.inner.borrow_mut();

            let message_name = inner.component_name.as_deref().unwrap_or("<anonymous>");
            if inner.verbose {
                tracing::debug!(
                    component = message_name,
                    attached = inner.attached,
                    children = inner.children.len(),
                    complete = inner.children_completed,
                    "notify"
                );
            } else {
                tracing::trace!(
                    component = message_name,
                    attached = inner.attached,
                    children = inner.children.len(),
                    complete = inner.children_completed,
                    "notify"
                );
            }

            if !inner.attached
                || inner.children_completed != inner.children.len()
                || inner.completion == Completion::CompletedOnce
            {
                return;
            }

            inner.completion = Completion::CompletedOnce;
            let callbacks: Vec<CompletedCallback> =
                inner.callbacks.iter().map(|(_, cb)| cb.clone()).collect();
            let parent = inner.parent.upgrade();
            inner.notified_parent = parent.is_some();
            (callbacks, parent)
        };

        // No borrow held: callbacks may freely inspect or extend the tree.
        for callback in callbacks {
            callback(self);
        }

        if let Some(parent) = parent {
            CompletionNode { inner: parent }.child_completed();
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Release callbacks and the instance, and detach from the parent.
    ///
    /// The parent no longer waits for this node and completes right away if
    /// it was only waiting on it. Children are left alone; their own
    /// components dispose them.
    pub fn dispose(&self) {
        let (parent, counted) = {
            let mut inner = self.inner.borrow_mut();
            inner.callbacks.clear();
            inner.instance = None;
            let parent = std::mem::take(&mut inner.parent);
            (parent.upgrade(), std::mem::take(&mut inner.notified_parent))
        };
        let Some(parent) = parent else { return };

        let parent = CompletionNode { inner: parent };
        {
            let mut inner = parent.inner.borrow_mut();
            let before = inner.children.len();
            inner.children.retain(|child| !child.ptr_eq(self));
            if inner.children.len() < before && counted {
                inner.children_completed -= 1;
            }
        }
        parent.try_complete();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }

    pub fn is_completed(&self) -> bool {
        self.inner.borrow().completion == Completion::CompletedOnce
    }

    pub fn completion(&self) -> Completion {
        self.inner.borrow().completion
    }

    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    pub fn children_completed(&self) -> usize {
        self.inner.borrow().children_completed
    }

    /// Snapshot of the direct children, in creation order.
    pub fn children(&self) -> Vec<CompletionNode> {
        self.inner.borrow().children.clone()
    }

    pub fn component_name(&self) -> Option<String> {
        self.inner.borrow().component_name.clone()
    }

    pub fn instance(&self) -> Option<Rc<dyn ViewModel>> {
        self.inner.borrow().instance.clone()
    }

    pub fn parent(&self) -> Option<CompletionNode> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| CompletionNode { inner })
    }

    /// True if both handles point at the same node.
    pub fn ptr_eq(&self, other: &CompletionNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CompletionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("CompletionNode")
            .field("component_name", &inner.component_name)
            .field("attached", &inner.attached)
            .field("children", &inner.children.len())
            .field("children_completed", &inner.children_completed)
            .field("completion", &inner.completion)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
