//! Anchor resolution: which paragraph a rule's text points at.

use thiserror::Error;

use crate::dom::{ChapterDom, NodeId};
use crate::util::contains_literal;

/// The anchor text occurs in no paragraph of the chapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("anchor not found: {anchor:?}")]
pub struct AnchorNotFound {
    pub anchor: String,
}

/// Paragraph elements of the chapter body, in document order.
///
/// Collected once per document so media inserted by earlier rules is never
/// considered by later ones.
pub fn anchor_paragraphs(dom: &ChapterDom) -> Vec<NodeId> {
    dom.elements_by_tag(dom.body(), "p")
}

/// First paragraph whose trimmed text contains `search` literally.
///
/// Case-sensitive, no pattern syntax. Later paragraphs with the same text
/// are never returned; rules need unique anchors within a chapter.
pub fn find_anchor(
    dom: &ChapterDom,
    paragraphs: &[NodeId],
    search: &str,
) -> Result<NodeId, AnchorNotFound> {
    paragraphs
        .iter()
        .copied()
        .find(|&p| contains_literal(dom.text_content(p).trim(), search))
        .ok_or_else(|| AnchorNotFound {
            anchor: search.to_string(),
        })
}
