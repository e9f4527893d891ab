//! Hint markers: literal text spans wrapped in `<u data-hint="…">`.
//!
//! Matching runs over text nodes, never over serialized markup, so attribute
//! values and tag names can't be hit by a hint rule.

use log::{debug, warn};

use super::anchor::anchor_paragraphs;
use super::{InjectionReport, Injected, RuleOutcome};
use crate::dom::{ChapterDom, NodeId, body_html, parse_html};
use crate::rules::HintRule;
use crate::util::{contains_literal, find_literal};

/// Marker element and attribute, also what the tooltip and rebind look for.
pub const HINT_TAG: &str = "u";
pub const HINT_ATTR: &str = "data-hint";

/// Applies hint rules to chapter markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct HintInjector;

enum Wrap {
    Wrapped,
    SpansMarkup,
    NoUnmarkedOccurrence,
}

impl HintInjector {
    pub fn new() -> Self {
        Self
    }

    /// Wrap each rule's text once per paragraph that contains it.
    pub fn inject(&self, html: &str, chapter: u32, rules: &[HintRule]) -> Injected {
        let chapter_rules: Vec<&HintRule> = rules.iter().filter(|r| r.chapter == chapter).collect();
        let mut report = InjectionReport::default();

        if chapter_rules.is_empty() {
            return Injected::unchanged(html, report);
        }

        let mut dom = parse_html(html);
        let paragraphs = anchor_paragraphs(&dom);

        for rule in chapter_rules {
            let outcome = apply_rule(&mut dom, &paragraphs, rule);
            match &outcome {
                RuleOutcome::Applied => debug!("Hint applied: {:?}", rule.text),
                RuleOutcome::SpansMarkup => {
                    warn!("Hint text {:?} only occurs across markup, skipped", rule.text)
                }
                other => debug!("Hint {:?} not applied: {other:?}", rule.text),
            }
            report.push(rule.text.clone(), outcome);
        }

        if report.applied() == 0 {
            return Injected::unchanged(html, report);
        }

        Injected {
            html: body_html(&dom),
            report,
        }
    }
}

/// Inject hint rules for `chapter`; returns the new HTML only.
pub fn inject_hints(html: &str, chapter: u32, rules: &[HintRule]) -> String {
    HintInjector::new().inject(html, chapter, rules).html
}

fn apply_rule(dom: &mut ChapterDom, paragraphs: &[NodeId], rule: &HintRule) -> RuleOutcome {
    if let Err(e) = rule.validate() {
        return RuleOutcome::Invalid(e.to_string());
    }

    let mut applied = false;
    let mut spans = false;
    for &p in paragraphs {
        if !contains_literal(&dom.text_content(p), &rule.text) {
            continue;
        }
        match wrap_first(dom, p, &rule.text, &rule.hint) {
            Wrap::Wrapped => applied = true,
            Wrap::SpansMarkup => spans = true,
            Wrap::NoUnmarkedOccurrence => {}
        }
    }

    if applied {
        RuleOutcome::Applied
    } else if spans {
        RuleOutcome::SpansMarkup
    } else {
        RuleOutcome::AnchorNotFound
    }
}

/// Whether `id` is a `<u data-hint>` marker.
pub fn is_hint_marker(dom: &ChapterDom, id: NodeId) -> bool {
    dom.element_name(id).is_some_and(|n| n.as_ref() == HINT_TAG)
        && dom.get_attr(id, HINT_ATTR).is_some()
}

fn wrap_first(dom: &mut ChapterDom, paragraph: NodeId, text: &str, hint: &str) -> Wrap {
    let text_nodes: Vec<NodeId> = dom
        .descendants(paragraph)
        .filter(|&n| dom.is_text(n))
        .collect();

    let mut seen_marked = false;
    for node in text_nodes {
        let Some(value) = dom.text(node) else {
            continue;
        };
        let Some(start) = find_literal(value, text) else {
            continue;
        };
        if dom.has_ancestor(node, is_hint_marker) {
            seen_marked = true;
            continue;
        }

        let end = start + text.len();
        let before = value[..start].to_string();
        let matched = value[start..end].to_string();
        let after = value[end..].to_string();

        if !before.is_empty() {
            let lead = dom.create_text(before);
            dom.insert_before(node, lead);
        }
        let marker = dom.element(HINT_TAG, &[(HINT_ATTR, hint)]);
        let inner = dom.create_text(matched);
        dom.append(marker, inner);
        dom.insert_before(node, marker);

        if after.is_empty() {
            dom.detach(node);
        } else {
            dom.set_text(node, after);
        }
        return Wrap::Wrapped;
    }

    if seen_marked {
        Wrap::NoUnmarkedOccurrence
    } else {
        Wrap::SpansMarkup
    }
}

/// Remove every hint marker, keeping its contents in place.
///
/// Markup without markers is returned unchanged.
pub fn strip_hint_markers(html: &str) -> String {
    let mut dom = parse_html(html);
    let markers = dom.find_all(dom.body(), is_hint_marker);
    if markers.is_empty() {
        return html.to_string();
    }

    for marker in markers {
        let children: Vec<NodeId> = dom.children(marker).collect();
        for child in children {
            dom.detach(child);
            dom.insert_before(marker, child);
        }
        dom.detach(marker);
    }
    body_html(&dom)
}
