//! Model element registry.
//!
//! Every resource and signal is registered as a named element under a
//! parent, so models can be organised as a tree (`model/bank/tellers`) and
//! looked up by path. The root element, `model`, always exists.

use crate::resource::ResourceId;
use crate::signal::SignalId;

/// Index of an element in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(usize);

impl ElementId {
    /// The root element.
    pub const ROOT: ElementId = ElementId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// What an element stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A grouping node with no behaviour of its own.
    Group,
    Resource(ResourceId),
    Signal(SignalId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: ElementId,
    pub name: String,
    pub parent: Option<ElementId>,
    pub kind: ElementKind,
}

#[derive(Debug, Clone)]
pub struct ElementRegistry {
    elements: Vec<ElementInfo>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        ElementRegistry {
            elements: vec![ElementInfo {
                id: ElementId::ROOT,
                name: "model".to_string(),
                parent: None,
                kind: ElementKind::Group,
            }],
        }
    }

    /// Register a child of `parent`. Unknown parents fall back to the root.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        parent: ElementId,
        kind: ElementKind,
    ) -> ElementId {
        let parent = if parent.0 < self.elements.len() {
            parent
        } else {
            ElementId::ROOT
        };
        let id = ElementId(self.elements.len());
        self.elements.push(ElementInfo {
            id,
            name: name.into(),
            parent: Some(parent),
            kind,
        });
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementInfo> {
        self.elements.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Direct children, in registration order.
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = &ElementInfo> {
        self.elements.iter().filter(move |e| e.parent == Some(id))
    }

    /// Slash-separated path from the root, e.g. `model/bank/tellers`.
    pub fn path(&self, id: ElementId) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let info = self.get(current)?;
            names.push(info.name.as_str());
            cursor = info.parent;
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Resolve a slash-separated path. The leading `model/` is optional.
    pub fn find(&self, path: &str) -> Option<ElementId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&"model") {
            segments.next();
        }
        let mut current = ElementId::ROOT;
        for segment in segments {
            current = self.children(current).find(|e| e.name == segment)?.id;
        }
        Some(current)
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
