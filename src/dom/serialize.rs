//! HTML serializer for ChapterDom.
//!
//! Produces the same text a browser returns from `innerHTML`: text is
//! escaped for `&`, `<`, `>` and no-break spaces, attribute values for `&`,
//! `"` and no-break spaces, void elements get no end tag and raw-text
//! elements are written verbatim.

use super::arena::{ChapterDom, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Serialize the children of `id` (the DOM `innerHTML`).
pub fn inner_html(dom: &ChapterDom, id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, child, &mut out);
    }
    out
}

/// Serialize `id` itself, including its own tags (the DOM `outerHTML`).
pub fn outer_html(dom: &ChapterDom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

fn write_node(dom: &ChapterDom, id: NodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        NodeData::Text(text) => {
            let raw_parent = dom
                .parent(id)
                .and_then(|p| dom.element_name(p))
                .is_some_and(|n| RAW_TEXT_ELEMENTS.contains(&n.as_ref()));
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                if let Some(prefix) = &attr.name.prefix {
                    out.push_str(prefix.as_ref());
                    out.push(':');
                }
                out.push_str(attr.name.local.as_ref());
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag) {
                return;
            }

            for child in dom.children(id) {
                write_node(dom, child, out);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_html;
    use super::*;

    fn body_html(html: &str) -> String {
        let dom = parse_html(html);
        inner_html(&dom, dom.body())
    }

    #[test]
    fn test_plain_markup_round_trips() {
        let html = "<h2>Глава 1</h2>\n<p>Текст с <em>выделением</em> и <a href=\"#n1\">сноской</a>.</p>";
        assert_eq!(body_html(html), html);
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        assert_eq!(body_html("<p>a<br/>b</p>"), "<p>a<br>b</p>");
        assert_eq!(
            body_html(r#"<img src="a.png" alt="x">"#),
            r#"<img src="a.png" alt="x">"#
        );
    }

    #[test]
    fn test_text_and_attribute_escaping() {
        assert_eq!(
            body_html(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&nbsp;3</p>"#),
            r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&nbsp;3</p>"#
        );
    }

    #[test]
    fn test_raw_text_is_not_escaped() {
        let html = "<style>p > em { color: red; }</style><p>x</p>";
        let dom = parse_html(html);
        let style = dom.find_by_tag("style").unwrap();
        assert_eq!(
            outer_html(&dom, style),
            "<style>p > em { color: red; }</style>"
        );
    }

    #[test]
    fn test_svg_attribute_case_preserved() {
        let html = r#"<svg viewBox="0 0 24 24"><path d="M8 5v14l11-7z"></path></svg>"#;
        assert_eq!(body_html(html), html);
    }
}
