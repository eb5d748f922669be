//! HTML parsing and serialization for the document arena

use lol_html::{element, rewrite_str, RewriteStrSettings, Selector};
use scraper::{ElementRef, Html, Node};

use super::{Document, DocumentTree, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Errors during HTML rewriting
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("Invalid marker selector: {0}")]
    Selector(String),

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),
}

/// Parse an HTML snapshot into a [`Document`]
///
/// The parser recovers from malformed markup the way browsers do, so this
/// never fails; a snapshot without `content_root_tag` simply yields a
/// document whose `content_root()` is `None`.
pub fn parse_html(html: &str, content_root_tag: &str) -> Document {
    let parsed = Html::parse_document(html);
    let root = parsed.root_element();

    let mut doc = Document::new(root.value().name()).with_content_root(content_root_tag);
    let target = doc.root();
    for (name, value) in root.value().attrs() {
        doc.set_attribute(target, name, value);
    }

    for child in parsed.tree.root().children() {
        if let Node::Doctype(doctype) = child.value() {
            doc.set_doctype(doctype.name());
        }
    }

    copy_children(&mut doc, root, target);
    doc
}

fn copy_children(doc: &mut Document, source: ElementRef<'_>, target: NodeId) {
    for child in source.children() {
        match child.value() {
            Node::Element(element) => {
                let node = doc.append_element(target, element.name());
                for (name, value) in element.attrs() {
                    doc.set_attribute(node, name, value);
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    copy_children(doc, child_ref, node);
                }
            }
            Node::Text(text) => {
                doc.append_text(target, &**text);
            }
            Node::Comment(comment) => {
                let node = doc.create_comment(&**comment);
                doc.append_child(target, node);
            }
            _ => {}
        }
    }
}

/// Unwrap leftover marker elements, keeping their content
///
/// Snapshots captured from a page that was already highlighted still carry
/// marker spans; resolving against them would shift every address.
pub fn strip_markers(html: &str, marker_tag: &str, marker_class: &str) -> Result<String, HtmlError> {
    let selector = format!("{}.{}", marker_tag, marker_class);
    selector
        .parse::<Selector>()
        .map_err(|e| HtmlError::Selector(e.to_string()))?;

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(selector.as_str(), |el| {
                el.remove_and_keep_content();
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| HtmlError::Rewrite(e.to_string()))
}

impl Document {
    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if let Some(doctype) = self.doctype() {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push('>');
        }
        self.write_node(self.root(), &mut out, false);
        out
    }

    /// Serialize the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let raw = self
            .tag_name(node)
            .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
        let mut out = String::new();
        for child in self.children(node) {
            self.write_node(*child, &mut out, raw);
        }
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String, raw: bool) {
        match self.kind(node) {
            NodeKind::Text => {
                let text = self.text(node).unwrap_or("");
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(text));
                }
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(self.text(node).unwrap_or(""));
                out.push_str("-->");
            }
            NodeKind::Element => {
                let name = self.tag_name(node).unwrap_or("div");
                out.push('<');
                out.push_str(name);
                for (key, value) in self.attributes(node) {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&name) {
                    return;
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&name);
                for child in self.children(node) {
                    self.write_node(*child, out, raw);
                }

                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<!DOCTYPE html><html><head><title>Report</title></head>\
        <body><p id=\"intro\">See <b>the report</b> for details.</p>\
        <!-- note --><img src=\"a.png\"><script>if (a < b) {}</script></body></html>";

    #[test]
    fn test_parse_builds_tree() {
        let doc = parse_html(PAGE, "body");
        let body = doc.content_root().unwrap();
        let p = doc.element_by_id("intro").unwrap();

        assert_eq!(doc.parent(p), Some(body));
        assert_eq!(doc.text_content(p), "See the report for details.");
        assert_eq!(doc.title().as_deref(), Some("Report"));
        assert_eq!(doc.doctype(), Some("html"));
        assert!(doc
            .children(body)
            .iter()
            .any(|c| doc.kind(*c) == NodeKind::Comment));
    }

    #[test]
    fn test_serialize_round_trip() {
        let doc = parse_html(PAGE, "body");
        let html = doc.to_html();

        assert!(html.starts_with("<!DOCTYPE html><html>"));
        assert!(html.contains("<p id=\"intro\">See <b>the report</b> for details.</p>"));
        assert!(html.contains("<img src=\"a.png\"><script>"));
        assert!(html.contains("if (a < b) {}"));
        assert!(!html.contains("</img>"));

        let again = parse_html(&html, "body");
        assert_eq!(again.to_html(), html);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let p = doc.append_element(root, "p");
        doc.set_attribute(p, "title", "say \"hi\"");
        doc.append_text(p, "a < b & c");

        assert_eq!(
            doc.to_html(),
            "<body><p title=\"say &quot;hi&quot;\">a &lt; b &amp; c</p></body>"
        );
    }

    #[test]
    fn test_missing_content_root() {
        let doc = parse_html("<p>no main here</p>", "main");
        assert!(doc.content_root().is_none());
    }

    #[test]
    fn test_strip_markers_keeps_content() {
        let html = "<p>See <span class=\"highlighter-marker\" data-highlight-id=\"x\">the \
                    <b>report</b></span> now <span class=\"other\">kept</span></p>";

        let stripped = strip_markers(html, "span", "highlighter-marker").unwrap();

        assert_eq!(
            stripped,
            "<p>See the <b>report</b> now <span class=\"other\">kept</span></p>"
        );
    }

    #[test]
    fn test_strip_markers_rejects_bad_selector() {
        let result = strip_markers("<p></p>", "span", "");
        assert!(matches!(result, Err(HtmlError::Selector(_))));
    }
}
