//! Component - Live instance handle.
//!
//! Ties together a type definition, the instance id, the completion node and
//! the view model. The host's attach signal lands in [`Component::attached`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::completion::CompletionNode;
use super::definition::{ComponentDefinition, InstanceId};
use super::registry::DefinitionRegistry;
use crate::error::Result;
use crate::types::{AutoBind, QueryParams, ViewModel};

/// Object handed to the host's component binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingObject {
    pub name: String,
    pub params: QueryParams,
    pub sort_index: Option<f64>,
}

struct ComponentInner {
    definition: Rc<ComponentDefinition>,
    id: InstanceId,
    node: CompletionNode,
    view_model: Rc<dyn ViewModel>,
    params: QueryParams,
    registry: DefinitionRegistry,
    attached: Cell<bool>,
}

/// Shared handle to one component instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

impl Component {
    pub(crate) fn new(
        definition: Rc<ComponentDefinition>,
        id: InstanceId,
        node: CompletionNode,
        view_model: Rc<dyn ViewModel>,
        params: QueryParams,
        registry: DefinitionRegistry,
    ) -> Self {
        Self {
            inner: Rc::new(ComponentInner {
                definition,
                id,
                node,
                view_model,
                params,
                registry,
                attached: Cell::new(false),
            }),
        }
    }

    /// Attach signal from the host: the component's root element is live.
    ///
    /// Marks the completion node attached and counts the attach in the
    /// registry. A repeated signal for the same instance is ignored.
    ///
    /// # Returns
    ///
    /// `true` if this attach completed the page-wide barrier.
    pub fn attached(&self) -> Result<bool> {
        if self.inner.attached.replace(true) {
            tracing::warn!(instance = %self.inner.id, "duplicate attach signal ignored");
            return Ok(false);
        }

        self.inner
            .node
            .mark_attached(Some(self.inner.view_model.clone()));
        self.inner.registry.record_instance_attached(self.name())
    }

    /// Release the completion node's callbacks and detach it from its parent.
    pub fn dispose(&self) {
        self.inner.node.dispose();
    }

    /// Binding object for the host's component binding.
    pub fn binding_object(&self) -> BindingObject {
        BindingObject {
            name: self.name().to_string(),
            params: self.inner.params.clone(),
            sort_index: self.sort_index(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        self.inner.definition.name()
    }

    pub fn id(&self) -> &InstanceId {
        &self.inner.id
    }

    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        &self.inner.definition
    }

    pub fn auto_bind(&self) -> &AutoBind {
        self.inner.definition.auto_bind()
    }

    pub fn sort_index(&self) -> Option<f64> {
        self.auto_bind().sort_index
    }

    pub fn node(&self) -> &CompletionNode {
        &self.inner.node
    }

    pub fn view_model(&self) -> &Rc<dyn ViewModel> {
        &self.inner.view_model
    }

    pub fn params(&self) -> &QueryParams {
        &self.inner.params
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }
}

/// Identity comparison: two handles are equal if they share an instance.
impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("attached", &self.inner.attached.get())
            .field("node", &self.inner.node)
            .finish()
    }
}
