use anyhow::Context as _;
use kuchiki::traits::TendrilSink as _;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

pub struct Page {
    document: NodeRef,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: kuchiki::parse_html().one(html),
        }
    }

    pub fn select_all(&self, selector: &str) -> Vec<NodeDataRef<ElementData>> {
        match self.document.select(selector) {
            Ok(nodes) => nodes.collect(),
            Err(()) => {
                tracing::debug!(selector, "invalid selector");
                Vec::new()
            }
        }
    }

    pub fn select_first(&self, selector: &str) -> Option<NodeDataRef<ElementData>> {
        self.document.select_first(selector).ok()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeDataRef<ElementData>> {
        self.select_all("[id]")
            .into_iter()
            .find(|node| node.attributes.borrow().get("id") == Some(id))
    }

    pub fn root_attribute(&self, name: &str) -> Option<String> {
        let root = self.select_first("html")?;
        let attrs = root.attributes.borrow();
        attrs.get(name).map(|v| v.to_string())
    }

    pub fn set_root_attribute(&self, name: &str, value: &str) {
        if let Some(root) = self.select_first("html") {
            root.attributes.borrow_mut().insert(name, value.to_string());
        }
    }

    pub fn lang(&self) -> Option<String> {
        self.root_attribute("lang")
    }

    pub fn set_lang(&self, code: &str) {
        self.set_root_attribute("lang", code);
    }

    pub fn title(&self) -> Option<String> {
        self.select_first("title")
            .map(|t| t.as_node().text_contents())
    }

    pub fn set_title(&self, title: &str) {
        if let Some(node) = self.select_first("title") {
            set_text_content(node.as_node(), title);
            return;
        }
        let Some(head) = self.select_first("head") else {
            tracing::debug!("page has no <head>; title not set");
            return;
        };
        let Some(node) = parse_single_element("<title></title>", "title") else {
            return;
        };
        set_text_content(&node, title);
        head.as_node().append(node);
    }

    pub fn prepend_to_body(&self, node: NodeRef) -> bool {
        match self.select_first("body") {
            Some(body) => {
                body.as_node().prepend(node);
                true
            }
            None => false,
        }
    }

    pub fn to_html(&self) -> anyhow::Result<String> {
        let mut out = Vec::new();
        self.document
            .serialize(&mut out)
            .context("serialize page")?;
        String::from_utf8(out).context("page html not utf-8")
    }
}

pub fn set_text_content(node: &NodeRef, text: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

pub fn parse_single_element(html: &str, selector: &str) -> Option<NodeRef> {
    let doc = kuchiki::parse_html().one(html);
    let node = doc.select_first(selector).ok()?.as_node().clone();
    node.detach();
    Some(node)
}
