use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Page state shared between the caller and the scheduled beats.
pub type SharedPage = Arc<Mutex<Page>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Returns false when the class was already present.
    pub fn add_class(&mut self, class: impl Into<String>) -> bool {
        let class = class.into();
        if self.has_class(&class) {
            return false;
        }
        self.classes.push(class);
        true
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_id_mut(id))
    }

    /// Descendants (not `self`) carrying `class`, in document order.
    pub fn query_all(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_with_class(class, &mut found);
        }
        found
    }

    /// Applies `f` to every descendant carrying `class` and returns how many matched.
    pub fn for_each_matching(&mut self, class: &str, f: &mut impl FnMut(&mut Element)) -> usize {
        let mut matched = 0;
        for child in &mut self.children {
            if child.has_class(class) {
                f(child);
                matched += 1;
            }
            matched += child.for_each_matching(class, f);
        }
        matched
    }

    /// First descendant carrying `class`, depth first.
    pub fn query_first_mut(&mut self, class: &str) -> Option<&mut Element> {
        for child in &mut self.children {
            if child.has_class(class) {
                return Some(child);
            }
            if let Some(found) = child.query_first_mut(class) {
                return Some(found);
            }
        }
        None
    }

    fn collect_with_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            found.push(self);
        }
        for child in &self.children {
            child.collect_with_class(class, found);
        }
    }
}

/// Document state the sequencer reads and mutates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub scroll_locked: bool,
    pub body: Element,
}

impl Page {
    pub fn new(body: Element) -> Self {
        Self {
            scroll_locked: false,
            body,
        }
    }

    pub fn into_shared(self) -> SharedPage {
        Arc::new(Mutex::new(self))
    }

    pub fn element_by_id(&self, id: &str) -> Option<&Element> {
        self.body.find_by_id(id)
    }

    pub fn element_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.body.find_by_id_mut(id)
    }
}

// Poisoning is ignored: beats only ever set flags.
pub(crate) fn lock_page(page: &SharedPage) -> MutexGuard<'_, Page> {
    page.lock().unwrap_or_else(PoisonError::into_inner)
}
