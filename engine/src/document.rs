//! Declarative configuration document parsing.
//!
//! The document is an XML fragment shaped like this:
//!
//! ```xml
//! <webapp>
//!   <ui_style name="default">
//!     <UI_TABLE><BASE_STYLE>table</BASE_STYLE></UI_TABLE>
//!   </ui_style>
//!   <ui_layout name="main">
//!     <UI_TABLE name="orders"><TITLE>Orders</TITLE></UI_TABLE>
//!   </ui_layout>
//!   <ui_setup>
//!     <UI_STYLE use="default"/>
//!     <UI_LAYOUT use="main"/>
//!     <UI_OUTPUT use="content"/>
//!   </ui_setup>
//! </webapp>
//! ```
//!
//! Parsing yields three immutable tables: a [`StyleTable`], a [`LayoutTable`]
//! and the [`Setup`] parameters. Element tags are upper-cased when they become
//! keys, so `<ui_table>` and `<UI_TABLE>` are the same component type.
//! Container lookup (`webapp`, `ui_style`, `ui_layout`, `ui_setup`) is
//! case-insensitive and searches at any depth. A document without these
//! containers produces empty tables; only malformed XML is an error.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::DocumentError;

/// Setup key naming the active style sheet.
pub const UI_STYLE: &str = "UI_STYLE";

/// Setup key naming the active layout.
pub const UI_LAYOUT: &str = "UI_LAYOUT";

/// Setup key naming the output mount point.
pub const UI_OUTPUT: &str = "UI_OUTPUT";

/// Value stored under a descriptor attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Literal text of an unnamed leaf element.
    Text(String),
    /// A nested descriptor (named leaf or element with children).
    Node(ComponentDescriptor),
}

/// Parsed description of one component or one nested attribute group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Ancestor-qualified name, present when the element carried `name`.
    pub qualified_name: Option<String>,
    /// Child elements keyed by upper-cased tag, in document order.
    pub attributes: IndexMap<String, AttrValue>,
    /// Text of a named leaf element.
    pub inner_text: Option<String>,
}

/// Attribute map of one component type inside a style sheet.
pub type Style = ComponentDescriptor;

/// `componentTypeKey → Style` for one named style sheet.
pub type StyleSheet = IndexMap<String, Style>;

/// `styleSheetName → StyleSheet`.
pub type StyleTable = HashMap<String, StyleSheet>;

/// `entryTypeTag → ComponentDescriptor` for one named layout.
pub type Layout = IndexMap<String, ComponentDescriptor>;

/// `layoutName → Layout`.
pub type LayoutTable = HashMap<String, Layout>;

impl ComponentDescriptor {
    /// Creates an empty descriptor with a qualified name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            qualified_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the raw attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Returns the text stored under `key`: the literal text of an unnamed
    /// leaf, or the inner text of a named one.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key)? {
            AttrValue::Text(text) => Some(text),
            AttrValue::Node(node) => node.inner_text.as_deref(),
        }
    }

    /// Returns the nested descriptor stored under `key`.
    #[must_use]
    pub fn node(&self, key: &str) -> Option<&ComponentDescriptor> {
        match self.attributes.get(key)? {
            AttrValue::Node(node) => Some(node),
            AttrValue::Text(_) => None,
        }
    }

    /// Iterates the attributes as component entries.
    ///
    /// Text values are presented as descriptors holding only inner text, so a
    /// bare `<UI_BUTTON/>` still counts as an entry.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Cow<'_, ComponentDescriptor>)> {
        self.attributes.iter().map(|(key, value)| {
            let desc = match value {
                AttrValue::Node(node) => Cow::Borrowed(node),
                AttrValue::Text(text) => Cow::Owned(ComponentDescriptor {
                    inner_text: Some(text.clone()),
                    ..ComponentDescriptor::default()
                }),
            };
            (key.as_str(), desc)
        })
    }

    /// Inserts an attribute, replacing a previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: AttrValue) {
        self.attributes.insert(key.into(), value);
    }
}

/// Iterates a layout as component entries.
pub fn layout_entries(layout: &Layout) -> impl Iterator<Item = (&str, Cow<'_, ComponentDescriptor>)> {
    layout
        .iter()
        .map(|(key, desc)| (key.as_str(), Cow::Borrowed(desc)))
}

/// Setup parameters from `<ui_setup>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Setup {
    params: IndexMap<String, String>,
}

impl Setup {
    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Sets a parameter value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Active style sheet name.
    #[must_use]
    pub fn style(&self) -> Option<&str> {
        self.get(UI_STYLE)
    }

    /// Active layout name.
    #[must_use]
    pub fn layout(&self) -> Option<&str> {
        self.get(UI_LAYOUT)
    }

    /// Output mount point id.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.get(UI_OUTPUT)
    }

    /// Iterates all parameters in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The parsed configuration document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub styles: StyleTable,
    pub layouts: LayoutTable,
    pub setup: Setup,
}

impl Document {
    /// Parses a document from XML text.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Xml`] if the text is not well-formed.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let tree = XmlNode::parse(xml)?;
        let Some(webapp) = tree.find_first("webapp") else {
            debug!("document has no webapp root, tables are empty");
            return Ok(Self::default());
        };

        let doc = Self {
            styles: parse_styles(webapp),
            layouts: parse_layouts(webapp),
            setup: parse_setup(webapp),
        };
        debug!(
            styles = doc.styles.len(),
            layouts = doc.layouts.len(),
            "document parsed"
        );
        Ok(doc)
    }

    /// Reads and parses a document file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] if the file cannot be read, or
    /// [`DocumentError::Xml`] if it is not well-formed.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }
}

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    /// Parses XML text into a tree under a synthetic `#document` node.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Xml`] for malformed input.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack = vec![XmlNode {
            tag: "#document".to_string(),
            ..XmlNode::default()
        }];

        loop {
            let event = reader.read_event().map_err(|e| DocumentError::Xml {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;
            match event {
                Event::Start(start) => {
                    let node = XmlNode::from_start(&start, &reader)?;
                    stack.push(node);
                }
                Event::Empty(start) => {
                    let node = XmlNode::from_start(&start, &reader)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(DocumentError::Xml {
                            position: reader.buffer_position(),
                            message: "unexpected closing tag".to_string(),
                        });
                    }
                    if let Some(node) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(node);
                        }
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| DocumentError::Xml {
                        position: reader.buffer_position(),
                        message: e.to_string(),
                    })?;
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(DocumentError::Xml {
                position: reader.buffer_position(),
                message: "unclosed element at end of document".to_string(),
            });
        }
        Ok(stack.pop().unwrap_or_default())
    }

    fn from_start(
        start: &quick_xml::events::BytesStart<'_>,
        reader: &Reader<&[u8]>,
    ) -> Result<Self, DocumentError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DocumentError::Xml {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| DocumentError::Xml {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;
            attrs.push((key, value.into_owned()));
        }
        Ok(Self {
            tag,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first descendant (or self) whose tag matches, ignoring case.
    #[must_use]
    pub fn find_first(&self, tag: &str) -> Option<&XmlNode> {
        if self.tag.eq_ignore_ascii_case(tag) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_first(tag))
    }

    /// Returns every descendant whose tag matches, ignoring case, in
    /// document order.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> Vec<&XmlNode> {
        let mut found = Vec::new();
        for child in &self.children {
            if child.tag.eq_ignore_ascii_case(tag) {
                found.push(child);
            }
            found.extend(child.find_all(tag));
        }
        found
    }

    /// Upper-cased tag, the form used as a table key.
    #[must_use]
    pub fn key(&self) -> String {
        self.tag.to_ascii_uppercase()
    }
}

/// Builds the style table from every `<ui_style name=…>` block.
#[must_use]
pub fn parse_styles(doc: &XmlNode) -> StyleTable {
    let mut styles = StyleTable::new();
    for block in doc.find_all("ui_style") {
        let Some(name) = block.attr("name") else {
            continue;
        };
        let sheet = block
            .children
            .iter()
            .map(|child| (child.key(), parse_descriptor(child, None)))
            .collect();
        styles.insert(name.to_string(), sheet);
    }
    styles
}

/// Builds the layout table from every `<ui_layout name=…>` block.
///
/// Each entry's own `name` becomes its qualified name, and nested names are
/// qualified under it.
#[must_use]
pub fn parse_layouts(doc: &XmlNode) -> LayoutTable {
    let mut layouts = LayoutTable::new();
    for block in doc.find_all("ui_layout") {
        let Some(name) = block.attr("name") else {
            continue;
        };
        let mut layout = Layout::new();
        for child in &block.children {
            let entry_name = child.attr("name");
            let mut desc = parse_descriptor(child, entry_name);
            desc.qualified_name = entry_name.map(str::to_string);
            layout.insert(child.key(), desc);
        }
        layouts.insert(name.to_string(), layout);
    }
    layouts
}

/// Reads `paramName → use` pairs from the first `<ui_setup>` block.
#[must_use]
pub fn parse_setup(doc: &XmlNode) -> Setup {
    let mut setup = Setup::default();
    if let Some(block) = doc.find_first("ui_setup") {
        for param in &block.children {
            if let Some(value) = param.attr("use") {
                setup.set(param.key(), value);
            }
        }
    }
    setup
}

/// Recursively converts the element children of `node` into a descriptor.
///
/// A child carrying `name` is qualified as `parent/name`. A leaf child stores
/// its trimmed text directly when unnamed, or as `inner_text` of a nested
/// descriptor when named. A non-leaf child recurses; unnamed intermediate
/// elements pass the enclosing qualified name through to their children.
#[must_use]
pub fn parse_descriptor(node: &XmlNode, parent: Option<&str>) -> ComponentDescriptor {
    let mut desc = ComponentDescriptor::default();
    for child in &node.children {
        let name = child.attr("name").map(|name| match parent {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_string(),
        });

        if child.children.is_empty() {
            let text = child.text.trim().to_string();
            let value = match name {
                None => AttrValue::Text(text),
                Some(name) => AttrValue::Node(ComponentDescriptor {
                    qualified_name: Some(name),
                    attributes: IndexMap::new(),
                    inner_text: Some(text),
                }),
            };
            desc.insert(child.key(), value);
            continue;
        }

        let mut nested = parse_descriptor(child, name.as_deref().or(parent));
        nested.qualified_name = name;
        desc.insert(child.key(), AttrValue::Node(nested));
    }
    desc
}
