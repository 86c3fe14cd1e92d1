//! html5ever tree sink that builds a [`Document`].

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::driver::ParseOpts;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, QualName, parse_document};

use super::arena::{Document, NodeId};

/// Parse chapter markup into a document tree.
///
/// Tree construction follows the HTML5 rules, so `html`, `head` and `body`
/// are implied when missing and misnested markup is repaired the way a
/// browser repairs it. Comments, processing instructions and the doctype
/// are dropped.
pub fn parse(src: &str) -> Document {
    parse_document(DocumentSink::default(), ParseOpts::default())
        .from_utf8()
        .one(src.as_bytes())
}

/// Node reference handed to the tree builder.
///
/// Elements carry their qualified name so `elem_name` can answer without
/// borrowing the arena.
#[derive(Debug, Clone)]
struct SinkHandle {
    id: NodeId,
    name: Option<QualName>,
}

impl SinkHandle {
    fn node(id: NodeId) -> Self {
        Self { id, name: None }
    }

    /// Comments and processing instructions: never attached.
    fn discarded() -> Self {
        Self::node(NodeId::NONE)
    }
}

#[derive(Default)]
struct DocumentSink {
    doc: RefCell<Document>,
}

/// `prefix:local`, or the bare local name.
fn qualified(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local),
        None => name.local.to_string(),
    }
}

impl TreeSink for DocumentSink {
    type Handle = SinkHandle;
    type Output = Document;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Document {
        self.doc.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        tracing::trace!(%msg, "Recovered markup error");
    }

    fn get_document(&self) -> SinkHandle {
        SinkHandle::node(self.doc.borrow().root())
    }

    fn elem_name<'a>(&'a self, target: &'a SinkHandle) -> &'a QualName {
        static UNNAMED: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };
        target.name.as_ref().unwrap_or(&UNNAMED)
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> SinkHandle {
        let attrs = attrs
            .into_iter()
            .map(|a| (qualified(&a.name), a.value.to_string()))
            .collect();
        let id = self.doc.borrow_mut().create_element(qualified(&name), attrs);
        SinkHandle {
            id,
            name: Some(name),
        }
    }

    fn create_comment(&self, _text: StrTendril) -> SinkHandle {
        SinkHandle::discarded()
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> SinkHandle {
        SinkHandle::discarded()
    }

    fn append(&self, parent: &SinkHandle, child: NodeOrText<SinkHandle>) {
        if parent.id.is_none() {
            return;
        }
        let mut doc = self.doc.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) if node.id.is_some() => doc.append(parent.id, node.id),
            NodeOrText::AppendNode(_) => {}
            NodeOrText::AppendText(text) => doc.append_text(parent.id, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &SinkHandle,
        prev_element: &SinkHandle,
        child: NodeOrText<SinkHandle>,
    ) {
        let has_parent = self.doc.borrow().parent(element.id).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &SinkHandle) -> SinkHandle {
        target.clone()
    }

    fn same_node(&self, x: &SinkHandle, y: &SinkHandle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &SinkHandle, new_node: NodeOrText<SinkHandle>) {
        let mut doc = self.doc.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) if node.id.is_some() => {
                doc.insert_before(sibling.id, node.id);
            }
            NodeOrText::AppendNode(_) => {}
            NodeOrText::AppendText(text) => {
                // Adjacent text stays one node.
                let prev = doc.prev_sibling(sibling.id).filter(|&p| doc.is_text(p));
                match prev {
                    Some(prev) => {
                        let mut merged = doc.text(prev).unwrap_or_default().to_string();
                        merged.push_str(&text);
                        doc.set_text(prev, merged);
                    }
                    None => {
                        let node = doc.create_text(text.to_string());
                        doc.insert_before(sibling.id, node);
                    }
                }
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &SinkHandle, attrs: Vec<Attribute>) {
        let mut doc = self.doc.borrow_mut();
        for attr in attrs {
            doc.add_attr_if_missing(target.id, qualified(&attr.name), attr.value.to_string());
        }
    }

    fn remove_from_parent(&self, target: &SinkHandle) {
        self.doc.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &SinkHandle, new_parent: &SinkHandle) {
        let mut doc = self.doc.borrow_mut();
        while let Some(child) = doc.first_child(node.id) {
            doc.detach(child);
            doc.append(new_parent.id, child);
        }
    }
}
