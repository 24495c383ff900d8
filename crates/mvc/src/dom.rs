//! In-memory host document: an element tree with styles, attributes and
//! bubbling event listeners.

use std::{
    collections::BTreeMap,
    fmt::{self, Write as _},
    sync::Arc,
};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Event delivered to listeners while it bubbles from `target` to the root.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub target_tag: String,
    pub target_id: Option<String>,
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("cannot append {child} under {parent}: would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

#[derive(Debug)]
struct Element {
    tag: String,
    id: Option<String>,
    class_name: Option<String>,
    text: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            class_name: None,
            text: String::new(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

struct RegisteredListener {
    id: ListenerId,
    target: NodeId,
    event_type: String,
    listener: Listener,
}

struct DomTree {
    next_node: u64,
    next_listener: u64,
    elements: BTreeMap<NodeId, Element>,
    listeners: Vec<RegisteredListener>,
}

impl DomTree {
    fn element(&self, node: NodeId) -> Result<&Element, DomError> {
        self.elements.get(&node).ok_or(DomError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, DomError> {
        self.elements
            .get_mut(&node)
            .ok_or(DomError::UnknownNode(node))
    }

    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.elements.get(&node).and_then(|el| el.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.elements.get(&current).and_then(|el| el.parent);
        }
        false
    }

    fn write_outline(&self, node: NodeId, depth: usize, out: &mut String) {
        let Some(el) = self.elements.get(&node) else {
            return;
        };
        let _ = write!(out, "{}<{}", "  ".repeat(depth), el.tag);
        if let Some(id) = &el.id {
            let _ = write!(out, " id=\"{id}\"");
        }
        if let Some(class_name) = &el.class_name {
            let _ = write!(out, " class=\"{class_name}\"");
        }
        if !el.style.is_empty() {
            let style = el
                .style
                .iter()
                .map(|(prop, value)| format!("{prop}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            let _ = write!(out, " style=\"{style}\"");
        }
        out.push('>');
        if !el.text.is_empty() {
            out.push_str(&el.text);
        }
        out.push('\n');
        for child in &el.children {
            self.write_outline(*child, depth + 1, out);
        }
    }
}

/// Shared, internally synchronized element tree. Listeners are invoked
/// outside the lock, so they may freely call back into the document.
pub struct Document {
    body: NodeId,
    tree: Mutex<DomTree>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut elements = BTreeMap::new();
        elements.insert(body, Element::new("body"));
        Self {
            body,
            tree: Mutex::new(DomTree {
                next_node: 1,
                next_listener: 0,
                elements,
                listeners: Vec::new(),
            }),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Creates a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut tree = self.tree.lock();
        let node = NodeId(tree.next_node);
        tree.next_node += 1;
        tree.elements.insert(node, Element::new(tag));
        node
    }

    /// Appends `child` as the last child of `parent`, detaching it from its
    /// previous parent first so a node is never present twice.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.lock();
        tree.element(parent)?;
        tree.element(child)?;
        if parent == child || tree.is_descendant(parent, child) {
            return Err(DomError::Cycle { parent, child });
        }

        if let Some(old_parent) = tree.element(child)?.parent {
            tree.element_mut(old_parent)?
                .children
                .retain(|existing| *existing != child);
        }
        tree.element_mut(parent)?.children.push(child);
        tree.element_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn set_id(&self, node: NodeId, id: impl Into<String>) -> Result<(), DomError> {
        self.tree.lock().element_mut(node)?.id = Some(id.into());
        Ok(())
    }

    pub fn set_class_name(&self, node: NodeId, class_name: impl Into<String>) -> Result<(), DomError> {
        self.tree.lock().element_mut(node)?.class_name = Some(class_name.into());
        Ok(())
    }

    pub fn set_text(&self, node: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        self.tree.lock().element_mut(node)?.text = text.into();
        Ok(())
    }

    pub fn set_attribute(
        &self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.tree
            .lock()
            .element_mut(node)?
            .attributes
            .insert(name.into(), value.into());
        Ok(())
    }

    pub fn set_style(
        &self,
        node: NodeId,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.tree
            .lock()
            .element_mut(node)?
            .style
            .insert(property.into(), value.into());
        Ok(())
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.tree.lock().elements.get(&node).map(|el| el.tag.clone())
    }

    pub fn id(&self, node: NodeId) -> Option<String> {
        self.tree.lock().elements.get(&node).and_then(|el| el.id.clone())
    }

    pub fn class_name(&self, node: NodeId) -> Option<String> {
        self.tree
            .lock()
            .elements
            .get(&node)
            .and_then(|el| el.class_name.clone())
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.tree.lock().elements.get(&node).map(|el| el.text.clone())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree
            .lock()
            .elements
            .get(&node)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.tree
            .lock()
            .elements
            .get(&node)
            .and_then(|el| el.style.get(property).cloned())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.lock().elements.get(&node).and_then(|el| el.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .lock()
            .elements
            .get(&node)
            .map(|el| el.children.clone())
            .unwrap_or_default()
    }

    /// True when `node` sits strictly below `ancestor`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree.lock().is_descendant(node, ancestor)
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .lock()
            .elements
            .iter()
            .find(|(_, el)| el.id.as_deref() == Some(id))
            .map(|(node, _)| *node)
    }

    pub fn add_event_listener(
        &self,
        target: NodeId,
        event_type: &str,
        listener: Listener,
    ) -> Result<ListenerId, DomError> {
        let mut tree = self.tree.lock();
        tree.element(target)?;
        let id = ListenerId(tree.next_listener);
        tree.next_listener += 1;
        tree.listeners.push(RegisteredListener {
            id,
            target,
            event_type: event_type.to_string(),
            listener,
        });
        Ok(id)
    }

    /// Returns false when the listener was already gone.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut tree = self.tree.lock();
        let before = tree.listeners.len();
        tree.listeners.retain(|registered| registered.id != id);
        tree.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.tree.lock().listeners.len()
    }

    pub fn listener_count_for(&self, target: NodeId) -> usize {
        self.tree
            .lock()
            .listeners
            .iter()
            .filter(|registered| registered.target == target)
            .count()
    }

    /// Delivers `event_type` to listeners on `target` and then on each of
    /// its ancestors. Returns how many listeners ran.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> Result<usize, DomError> {
        let (target_tag, target_id, deliveries) = {
            let tree = self.tree.lock();
            let target_el = tree.element(target)?;
            let target_tag = target_el.tag.clone();
            let target_id = target_el.id.clone();

            let mut path = vec![target];
            let mut cursor = target_el.parent;
            while let Some(node) = cursor {
                path.push(node);
                cursor = tree.elements.get(&node).and_then(|el| el.parent);
            }

            let deliveries = path
                .into_iter()
                .flat_map(|node| {
                    tree.listeners
                        .iter()
                        .filter(move |registered| {
                            registered.target == node && registered.event_type == event_type
                        })
                        .map(move |registered| (node, Arc::clone(&registered.listener)))
                })
                .collect::<Vec<_>>();
            (target_tag, target_id, deliveries)
        };

        let invoked = deliveries.len();
        for (current_target, listener) in deliveries {
            listener(&Event {
                event_type: event_type.to_string(),
                target,
                current_target,
                target_tag: target_tag.clone(),
                target_id: target_id.clone(),
            });
        }
        Ok(invoked)
    }

    /// Indented rendering of the attached tree, for logs and the console.
    pub fn outline(&self) -> String {
        let tree = self.tree.lock();
        let mut out = String::new();
        tree.write_outline(self.body, 0, &mut out);
        out
    }
}

#[cfg(test)]
#[path = "tests/dom_tests.rs"]
mod tests;
