//! Chapter markup DOM.
//!
//! Chapter fragments are parsed the way a browser's `DOMParser` would treat
//! `text/html` (html5ever's document parser wraps them in `html`/`body`),
//! mutated through [`ChapterDom`], and written back with [`inner_html`] of
//! the body.
//!
//! # Example
//!
//! ```
//! use litoverlay::dom::{inner_html, parse_html};
//!
//! let dom = parse_html("<p>Погода была ясной.</p>");
//! let p = dom.find_by_tag("p").unwrap();
//! assert_eq!(dom.text_content(p), "Погода была ясной.");
//! assert_eq!(inner_html(&dom, dom.body()), "<p>Погода была ясной.</p>");
//! ```

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, ChapterDom, ChildrenIter, Descendants, Node, NodeData, NodeId};
pub use serialize::{inner_html, outer_html};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::ChapterSink;

/// Parse chapter HTML into an arena DOM.
pub fn parse_html(html: &str) -> ChapterDom {
    let sink = ChapterSink::new();
    let result = parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    result.into_dom()
}

/// Serialize the body's children, the form chapters are stored and mounted in.
pub fn body_html(dom: &ChapterDom) -> String {
    inner_html(dom, dom.body())
}

/// Trimmed text of the first `<h2>`, used as the chapter's display title.
pub fn chapter_title(dom: &ChapterDom) -> Option<String> {
    let h2 = dom.find_by_tag("h2")?;
    let title = dom.text_content(h2).trim().to_string();
    (!title.is_empty()).then_some(title)
}
