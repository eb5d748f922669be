//! Text-based node search
//!
//! Used by the resolver once structural addresses stop matching. Both
//! searches are lazy: callers take the first hit and the rest of the tree is
//! never visited.

use serde::{Deserialize, Serialize};

use crate::dom::{normalize_whitespace, Descendants, DocumentTree, NodeId};

/// Length window a context container must fall in
///
/// A container is accepted when its normalized length `L` satisfies
/// `target_len * target_factor < L < context_len * context_factor`: long
/// enough to be more than the target alone, short enough not to be a page
/// wrapper that happens to contain it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBand {
    pub target_factor: f64,
    pub context_factor: f64,
}

impl Default for ContextBand {
    fn default() -> Self {
        Self {
            target_factor: 1.5,
            context_factor: 1.5,
        }
    }
}

impl ContextBand {
    pub fn accepts(&self, target_len: usize, context_len: usize, container_len: usize) -> bool {
        let len = container_len as f64;
        len > target_len as f64 * self.target_factor && len < context_len as f64 * self.context_factor
    }
}

/// Text and context search over a document tree
#[derive(Debug, Clone)]
pub struct TextLocator {
    context_tags: Vec<String>,
    band: ContextBand,
}

impl Default for TextLocator {
    fn default() -> Self {
        let tags = ["p", "div", "span", "li", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6"];
        Self::new(tags.iter().map(|t| t.to_string()).collect(), ContextBand::default())
    }
}

impl TextLocator {
    pub fn new(context_tags: Vec<String>, band: ContextBand) -> Self {
        Self { context_tags, band }
    }

    /// Text nodes under `root` whose own content contains `text`, in
    /// document order
    pub fn find_nodes_containing<'a, T: DocumentTree + ?Sized>(
        tree: &'a T,
        root: NodeId,
        text: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        Descendants::new(tree, root)
            .filter(move |n| !text.is_empty() && tree.is_text(*n) && tree.text(*n).is_some_and(|t| t.contains(text)))
    }

    /// For each context container in the band that contains `target`, the
    /// first of its text descendants that contains it
    ///
    /// Whitespace runs are collapsed on both sides, so a target that was
    /// reflowed across lines still matches.
    pub fn find_by_context<'a, T: DocumentTree + ?Sized>(
        &'a self,
        tree: &'a T,
        root: NodeId,
        context: &str,
        target: &str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        let context_len = normalize_whitespace(context).chars().count();
        let target = normalize_whitespace(target);
        let target_len = target.chars().count();

        Descendants::new(tree, root)
            .filter(move |n| {
                tree.tag_name(*n)
                    .is_some_and(|tag| self.context_tags.iter().any(|t| t == tag))
            })
            .filter_map(move |container| {
                if target.is_empty() {
                    return None;
                }
                let text = normalize_whitespace(&tree.text_content(container));
                if !text.contains(target.as_str())
                    || !self.band.accepts(target_len, context_len, text.chars().count())
                {
                    return None;
                }
                Descendants::new(tree, container).find(|n| {
                    tree.is_text(*n) && tree.text(*n).is_some_and(|t| find_loose(t, &target).is_some())
                })
            })
    }
}

/// Character span of `needle` in `haystack`, where every whitespace run in
/// the needle matches any non-empty whitespace run in the haystack
pub fn find_loose(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = normalize_whitespace(needle).chars().collect();
    if needle.is_empty() {
        return None;
    }
    let hay: Vec<char> = haystack.chars().collect();

    (0..hay.len()).find_map(|start| match_at(&hay, start, &needle).map(|end| (start, end)))
}

fn match_at(hay: &[char], start: usize, needle: &[char]) -> Option<usize> {
    let mut i = start;
    for &c in needle {
        if c == ' ' {
            if !hay.get(i)?.is_whitespace() {
                return None;
            }
            while hay.get(i).is_some_and(|h| h.is_whitespace()) {
                i += 1;
            }
        } else {
            if *hay.get(i)? != c {
                return None;
            }
            i += 1;
        }
    }
    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_find_nodes_containing_in_order() {
        let mut doc = Document::new("body");
        let body = doc.root();
        let p = doc.append_element(body, "p");
        let first = doc.append_text(p, "the report is late");
        let div = doc.append_element(body, "div");
        doc.append_text(div, "nothing here");
        let second = doc.append_text(div, "another report");

        let hits: Vec<NodeId> = TextLocator::find_nodes_containing(&doc, body, "report").collect();
        assert_eq!(hits, vec![first, second]);
        assert_eq!(TextLocator::find_nodes_containing(&doc, body, "").count(), 0);
    }

    #[test]
    fn test_context_match_finds_reflowed_text() {
        let mut doc = Document::new("body");
        let body = doc.root();
        let p = doc.append_element(body, "p");
        let text = doc.append_text(p, "See the\n   report for details.");

        let locator = TextLocator::default();
        let hit = locator
            .find_by_context(&doc, body, "See the report for details.", "the report")
            .next();
        assert_eq!(hit, Some(text));
    }

    #[test]
    fn test_context_band_rejects_oversized_container() {
        let mut doc = Document::new("body");
        let body = doc.root();
        let div = doc.append_element(body, "div");
        doc.append_text(div, format!("xxxxx {}", "filler ".repeat(20)));

        let locator = TextLocator::default();
        let hits: Vec<NodeId> = locator
            .find_by_context(&doc, body, "xxxxx and a few words", "xxxxx")
            .collect();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_context_band_rejects_container_equal_to_target() {
        let mut doc = Document::new("body");
        let body = doc.root();
        let span = doc.append_element(body, "span");
        doc.append_text(span, "the report");

        let locator = TextLocator::default();
        assert!(locator
            .find_by_context(&doc, body, "See the report for details.", "the report")
            .next()
            .is_none());
    }

    #[test]
    fn test_non_context_tags_ignored() {
        let mut doc = Document::new("body");
        let body = doc.root();
        let quote = doc.append_element(body, "blockquote");
        doc.append_text(quote, "See the report for details.");

        let locator = TextLocator::new(vec!["p".to_string()], ContextBand::default());
        assert!(locator
            .find_by_context(&doc, body, "See the report for details.", "the report")
            .next()
            .is_none());
    }

    #[test]
    fn test_band_factors_are_configurable() {
        let band = ContextBand {
            target_factor: 1.0,
            context_factor: 3.0,
        };
        assert!(band.accepts(5, 10, 25));
        assert!(!ContextBand::default().accepts(5, 10, 25));
        assert!(!ContextBand::default().accepts(10, 100, 15));
    }

    #[test]
    fn test_find_loose() {
        assert_eq!(find_loose("See the\n  report now", "the report"), Some((4, 16)));
        assert_eq!(find_loose("the report", "the  report"), Some((0, 10)));
        assert_eq!(find_loose("thereport", "the report"), None);
        assert_eq!(find_loose("anything", "   "), None);
    }
}
