//! Headless visual elements.
//!
//! Components own an [`Element`] handle and mutate it the way a widget would
//! mutate a DOM node: set text, toggle visibility, append or remove
//! children. Handles are cheap to clone and compare by identity, so the same
//! element can be attached to a mount point, detached, and re-attached on a
//! later layout pass. An element has at most one parent: attaching it
//! somewhere detaches it from where it was.
//!
//! The tree can be rendered to indented text, which is what the `webui`
//! binary prints.

use std::fmt;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use indexmap::IndexMap;

/// Callback run when an element is clicked.
pub type ClickHandler = Arc<dyn Fn() + Send + Sync>;

struct Node {
    tag: String,
    class: Option<String>,
    text: Option<String>,
    attrs: IndexMap<String, String>,
    visible: bool,
    children: Vec<Element>,
    parent: Weak<Mutex<Node>>,
    on_click: Option<ClickHandler>,
}

/// A shared handle to a node of the visual tree.
#[derive(Clone)]
pub struct Element {
    node: Arc<Mutex<Node>>,
}

impl Element {
    /// Creates a detached, visible element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Arc::new(Mutex::new(Node {
                tag: tag.into(),
                class: None,
                text: None,
                attrs: IndexMap::new(),
                visible: true,
                children: Vec::new(),
                parent: Weak::new(),
                on_click: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Node> {
        self.node.lock().unwrap()
    }

    /// Detaches `child` from its current parent unless that is `self`.
    fn adopt(&self, child: &Element) {
        let previous = {
            let mut node = child.lock();
            std::mem::replace(&mut node.parent, Arc::downgrade(&self.node))
        };
        if let Some(previous) = previous.upgrade() {
            if !Arc::ptr_eq(&previous, &self.node) {
                previous.lock().unwrap().children.retain(|c| !c.ptr_eq(child));
            }
        }
    }

    /// Clears the parent link of children removed from `self`.
    fn disown(&self, removed: impl IntoIterator<Item = Element>) {
        for child in removed {
            let mut node = child.lock();
            if std::ptr::eq(node.parent.as_ptr(), Arc::as_ptr(&self.node)) {
                node.parent = Weak::new();
            }
        }
    }

    /// Returns the element this one is attached to.
    #[must_use]
    pub fn parent(&self) -> Option<Element> {
        self.lock().parent.upgrade().map(|node| Element { node })
    }

    /// Returns the element tag.
    #[must_use]
    pub fn tag(&self) -> String {
        self.lock().tag.clone()
    }

    /// Sets the style class; `None` removes it.
    pub fn set_class(&self, class: Option<&str>) {
        self.lock().class = class.map(str::to_string);
    }

    /// Returns the style class, if any.
    #[must_use]
    pub fn class(&self) -> Option<String> {
        self.lock().class.clone()
    }

    /// Replaces the element's content with a single text run.
    pub fn set_text(&self, text: impl Into<String>) {
        let removed = {
            let mut node = self.lock();
            node.text = Some(text.into());
            std::mem::take(&mut node.children)
        };
        self.disown(removed);
    }

    /// Returns the element's own text (not including children).
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.lock().text.clone()
    }

    /// Returns the text of this element and all visible descendants, joined
    /// by single spaces.
    #[must_use]
    pub fn text_content(&self) -> String {
        let (own, children) = {
            let node = self.lock();
            (node.text.clone(), node.children.clone())
        };
        let mut parts: Vec<String> = own.into_iter().collect();
        for child in children.iter().filter(|c| c.is_visible()) {
            let text = child.text_content();
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    /// Sets an attribute.
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().attrs.insert(name.into(), value.into());
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.lock().attrs.get(name).cloned()
    }

    /// Shows or hides the element.
    pub fn set_visible(&self, visible: bool) {
        self.lock().visible = visible;
    }

    /// Returns whether the element is shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// Installs the click handler, replacing any previous one.
    pub fn on_click(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.lock().on_click = Some(Arc::new(handler));
    }

    /// Runs the click handler. Returns false if the element has none or is
    /// hidden.
    pub fn click(&self) -> bool {
        let handler = {
            let node = self.lock();
            if !node.visible {
                return false;
            }
            node.on_click.clone()
        };
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Appends a child. An element already attached here is moved to the end.
    pub fn append_child(&self, child: &Element) {
        if self.ptr_eq(child) {
            return;
        }
        self.adopt(child);
        let mut node = self.lock();
        node.children.retain(|c| !c.ptr_eq(child));
        node.children.push(child.clone());
    }

    /// Inserts a child at `index` (clamped to the child count).
    pub fn insert_child(&self, index: usize, child: &Element) {
        if self.ptr_eq(child) {
            return;
        }
        self.adopt(child);
        let mut node = self.lock();
        node.children.retain(|c| !c.ptr_eq(child));
        let index = index.min(node.children.len());
        node.children.insert(index, child.clone());
    }

    /// Removes a direct child. Returns `false` if it was not attached here.
    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut node = self.lock();
            let before = node.children.len();
            node.children.retain(|c| !c.ptr_eq(child));
            node.children.len() != before
        };
        if removed {
            self.disown([child.clone()]);
        }
        removed
    }

    /// Removes every child and any text.
    pub fn clear(&self) {
        let removed = {
            let mut node = self.lock();
            node.text = None;
            std::mem::take(&mut node.children)
        };
        self.disown(removed);
    }

    /// Replaces all content with a single child.
    pub fn replace_children(&self, child: &Element) {
        if self.ptr_eq(child) {
            return;
        }
        self.adopt(child);
        let removed = {
            let mut node = self.lock();
            node.text = None;
            let removed: Vec<Element> = std::mem::take(&mut node.children)
                .into_iter()
                .filter(|c| !c.ptr_eq(child))
                .collect();
            node.children.push(child.clone());
            removed
        };
        self.disown(removed);
    }

    /// Removes every child that follows `anchor`.
    ///
    /// Nothing is removed if `anchor` is not a direct child.
    pub fn remove_children_after(&self, anchor: &Element) {
        let removed = {
            let mut node = self.lock();
            match node.children.iter().position(|c| c.ptr_eq(anchor)) {
                Some(pos) => node.children.split_off(pos + 1),
                None => Vec::new(),
            }
        };
        self.disown(removed);
    }

    /// Returns a snapshot of the direct children.
    #[must_use]
    pub fn children(&self) -> Vec<Element> {
        self.lock().children.clone()
    }

    /// Returns true if `child` is a direct child of this element.
    #[must_use]
    pub fn contains(&self, child: &Element) -> bool {
        self.lock().children.iter().any(|c| c.ptr_eq(child))
    }

    /// Returns every descendant with the given tag, in document order.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Vec<Element> {
        let mut found = Vec::new();
        for child in self.children() {
            if child.lock().tag == tag {
                found.push(child.clone());
            }
            found.extend(child.find_by_tag(tag));
        }
        found
    }

    /// Returns true if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Renders the visible part of the tree as indented text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let (tag, class, text, visible, children) = {
            let node = self.lock();
            (
                node.tag.clone(),
                node.class.clone(),
                node.text.clone(),
                node.visible,
                node.children.clone(),
            )
        };
        if !visible {
            return;
        }
        let _ = write!(out, "{:indent$}<{tag}", "", indent = depth * 2);
        if let Some(class) = class {
            let _ = write!(out, " class=\"{class}\"");
        }
        out.push('>');
        if let Some(text) = text {
            out.push(' ');
            out.push_str(&text);
        }
        out.push('\n');
        for child in &children {
            child.render_into(out, depth + 1);
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.lock();
        f.debug_struct("Element")
            .field("tag", &node.tag)
            .field("class", &node.class)
            .field("text", &node.text)
            .field("visible", &node.visible)
            .field("children", &node.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_replaces_children() {
        let cell = Element::new("td");
        cell.append_child(&Element::new("span"));
        cell.set_text("v1");

        assert!(cell.children().is_empty());
        assert_eq!(cell.text().as_deref(), Some("v1"));
    }

    #[test]
    fn append_moves_existing_child_to_end() {
        let parent = Element::new("div");
        let a = Element::new("a");
        let b = Element::new("b");
        parent.append_child(&a);
        parent.append_child(&b);
        parent.append_child(&a);

        let tags: Vec<String> = parent.children().iter().map(Element::tag).collect();
        assert_eq!(tags, vec!["b", "a"]);
    }

    #[test]
    fn attaching_elsewhere_detaches_from_previous_parent() {
        let table = Element::new("div");
        let area = Element::new("div");
        let form = Element::new("form");
        table.append_child(&form);

        area.replace_children(&form);

        assert!(!table.contains(&form));
        assert!(area.contains(&form));
        assert!(form.parent().unwrap().ptr_eq(&area));

        table.insert_child(0, &form);
        assert!(area.children().is_empty());
        assert!(form.parent().unwrap().ptr_eq(&table));

        table.clear();
        assert!(form.parent().is_none());
        area.append_child(&form);
        assert_eq!(area.render(), "<div>\n  <form>\n");
    }

    #[test]
    fn removing_a_child_clears_its_parent() {
        let nav = Element::new("div");
        let back = Element::new("button");
        let open = Element::new("button");
        nav.append_child(&back);
        nav.append_child(&open);

        nav.remove_children_after(&back);
        assert!(open.parent().is_none());

        assert!(nav.remove_child(&back));
        assert!(back.parent().is_none());
        assert!(!nav.remove_child(&back));
    }

    #[test]
    fn remove_children_after_keeps_anchor() {
        let nav = Element::new("div");
        let back = Element::new("button");
        nav.append_child(&back);
        nav.append_child(&Element::new("button"));
        nav.append_child(&Element::new("button"));

        nav.remove_children_after(&back);

        assert_eq!(nav.children().len(), 1);
        assert!(nav.contains(&back));
    }

    #[test]
    fn text_content_skips_hidden_children() {
        let root = Element::new("div");
        let shown = Element::new("p");
        shown.set_text("shown");
        let hidden = Element::new("p");
        hidden.set_text("hidden");
        hidden.set_visible(false);
        root.append_child(&shown);
        root.append_child(&hidden);

        assert_eq!(root.text_content(), "shown");
    }

    #[test]
    fn find_by_tag_walks_descendants() {
        let table = Element::new("table");
        let body = Element::new("tbody");
        let row = Element::new("tr");
        row.append_child(&Element::new("td"));
        row.append_child(&Element::new("td"));
        body.append_child(&row);
        table.append_child(&body);

        assert_eq!(table.find_by_tag("td").len(), 2);
        assert_eq!(table.find_by_tag("tr").len(), 1);
    }

    #[test]
    fn render_shows_visible_tree() {
        let root = Element::new("div");
        root.set_class(Some("panel"));
        let title = Element::new("h1");
        title.set_text("Files");
        root.append_child(&title);
        let hidden = Element::new("p");
        hidden.set_visible(false);
        root.append_child(&hidden);

        assert_eq!(root.render(), "<div class=\"panel\">\n  <h1> Files\n");
    }

    #[test]
    fn click_runs_handler_outside_lock() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let button = Element::new("button");
        assert!(!button.click());

        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = clicks.clone();
        let inner = button.clone();
        button.on_click(move || {
            inner.set_text("clicked");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(button.click());
        assert_eq!(button.text().as_deref(), Some("clicked"));

        button.set_visible(false);
        assert!(!button.click());
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_identity() {
        let a = Element::new("div");
        let b = a.clone();
        b.set_attr("id", "main");

        assert!(a.ptr_eq(&b));
        assert_eq!(a.attr("id").as_deref(), Some("main"));
        assert!(!a.ptr_eq(&Element::new("div")));
    }
}
