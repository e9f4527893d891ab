//! Chapter enrichment: hint markers and media nodes spliced into markup.
//!
//! Both injectors take a chapter's HTML and return new HTML. A chapter with
//! no applicable rules, or whose rules all failed, comes back byte-identical.
//! Every rule produces a [`RuleResult`]; a failed rule is skipped and logged,
//! and the remaining rules still run.
//!
//! # Example
//!
//! ```
//! use litoverlay::inject::inject_hints;
//! use litoverlay::rules::HintRule;
//!
//! let rules = vec![HintRule {
//!     chapter: 1,
//!     text: "сударь".to_string(),
//!     hint: "вежливое обращение".to_string(),
//! }];
//! let html = inject_hints("<p>Здравствуйте, сударь.</p>", 1, &rules);
//! assert_eq!(
//!     html,
//!     r#"<p>Здравствуйте, <u data-hint="вежливое обращение">сударь</u>.</p>"#
//! );
//! ```

pub mod anchor;
pub mod hints;
pub mod media;

pub use anchor::{AnchorNotFound, anchor_paragraphs, find_anchor};
pub use hints::{HintInjector, inject_hints, strip_hint_markers};
pub use media::{AssetProbe, MediaInjector, inject_media, mark_image_failed};

/// What happened to a single rule during injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Applied,
    /// No paragraph contains the anchor text.
    AnchorNotFound,
    /// The rule could not be turned into a media node (bad src, unknown type).
    MediaCreationFailed(String),
    /// The text exists only across element boundaries and was left alone.
    SpansMarkup,
    /// The rule itself is unusable (empty hint text).
    Invalid(String),
}

/// A rule's label paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    /// Media id or hint text, for logs and reports.
    pub rule: String,
    pub outcome: RuleOutcome,
}

/// Per-rule results of one injection pass, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub results: Vec<RuleResult>,
}

impl InjectionReport {
    pub(crate) fn push(&mut self, rule: impl Into<String>, outcome: RuleOutcome) {
        self.results.push(RuleResult {
            rule: rule.into(),
            outcome,
        });
    }

    /// Number of rules that changed the document.
    pub fn applied(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == RuleOutcome::Applied)
            .count()
    }

    /// Results for rules that were skipped.
    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results
            .iter()
            .filter(|r| r.outcome != RuleOutcome::Applied)
    }

    /// Append another pass's results.
    pub fn extend(&mut self, other: InjectionReport) {
        self.results.extend(other.results);
    }
}

/// Transformed HTML plus the per-rule report.
#[derive(Debug, Clone)]
pub struct Injected {
    pub html: String,
    pub report: InjectionReport,
}

impl Injected {
    pub(crate) fn unchanged(html: &str, report: InjectionReport) -> Self {
        Self {
            html: html.to_string(),
            report,
        }
    }
}
