//! Markdown-like answer text to Telegram HTML.
//!
//! A fixed, ordered list of regex rewrite rules. Each rule runs over the output of the
//! previous one, so markup produced by an earlier rule can be matched again by a later
//! rule. Code output and link targets are the exception: they are final once produced.
//! Unmatched text passes through untouched; nothing is escaped.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// How much of a rule's output later rules are allowed to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shield {
    /// Everything stays open to later rules.
    Open,
    /// The whole replacement is final (code spans and blocks).
    Whole,
    /// Only the given capture group is final (a link target); the rest stays open.
    Group(usize),
}

/// One rewrite rule: every match of `pattern` in the current text is replaced by `template`.
#[derive(Debug, Clone)]
pub struct TranslationRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub template: &'static str,
    pub shield: Shield,
}

/// Rule table in application order: (name, pattern, replacement template, shield).
///
/// Code runs first and its output is final. Links run next with their targets shielded,
/// so emphasis markers inside URLs survive. Bold runs before italic and `__` before `_`.
const RULES: &[(&str, &str, &str, Shield)] = &[
    ("code_block", r"```([^`]*)```", "<pre>${1}</pre>", Shield::Whole),
    ("inline_code", r"`([^`]+)`", "<code>${1}</code>", Shield::Whole),
    (
        "user_link",
        r"\[(.*?)\]\(tg://user\?id=(\d+)\)",
        r#"<a href="tg://user?id=${2}">${1}</a>"#,
        Shield::Group(2),
    ),
    (
        "link",
        r"\[(.*?)\]\((https?://.*?)\)",
        r#"<a href="${2}">${1}</a>"#,
        Shield::Group(2),
    ),
    ("heading", r"(?m)^## (.*)", "<b>${1}</b>", Shield::Open),
    ("bold", r"\*\*(.*?)\*\*", "<b>${1}</b>", Shield::Open),
    ("underline", r"__(.*?)__", "<u>${1}</u>", Shield::Open),
    ("underline_plus", r"\+\+(.*?)\+\+", "<u>${1}</u>", Shield::Open),
    // single markers are lazy too: "*a* and *b*" is two italics, not one
    ("italic_star", r"\*(.*?)\*", "<i>${1}</i>", Shield::Open),
    ("italic_underscore", r"_(.*?)_", "<i>${1}</i>", Shield::Open),
    ("strikethrough", r"~~(.*?)~~", "<s>${1}</s>", Shield::Open),
    (
        "spoiler",
        r"\|\|(.*?)\|\|",
        r#"<span class="tg-spoiler">${1}</span>"#,
        Shield::Open,
    ),
    (
        "blockquote",
        r"(?m)^> (.*)",
        "<blockquote>${1}</blockquote>",
        Shield::Open,
    ),
];

static DEFAULT_TRANSLATOR: Lazy<MarkupTranslator> =
    Lazy::new(|| MarkupTranslator::new().expect("built-in markup rules must compile"));

/// Ordered rule set. Build once and reuse; compiling the patterns is the expensive part.
#[derive(Debug, Clone)]
pub struct MarkupTranslator {
    rules: Vec<TranslationRule>,
}

impl MarkupTranslator {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = RULES
            .iter()
            .map(|&(name, pattern, template, shield)| {
                Ok(TranslationRule {
                    name,
                    pattern: Regex::new(pattern)?,
                    template,
                    shield,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Shared instance with the built-in rules.
    pub fn shared() -> &'static MarkupTranslator {
        &DEFAULT_TRANSLATOR
    }

    /// Rules in the order they are applied.
    pub fn rules(&self) -> &[TranslationRule] {
        &self.rules
    }

    /// Apply every rule in order, each over the previous rule's output.
    ///
    /// Shielded output is parked in a side table behind a placeholder token while the
    /// remaining rules run, then put back.
    pub fn translate(&self, text: &str) -> String {
        let mut stash: Vec<String> = Vec::new();
        let shielded = self.rules.iter().fold(text.to_string(), |acc, rule| {
            if rule.shield == Shield::Open {
                return rule.pattern.replace_all(&acc, rule.template).into_owned();
            }
            rule.pattern
                .replace_all(&acc, |caps: &Captures| render_shielded(rule, caps, &mut stash))
                .into_owned()
        });
        // later entries may hold tokens of earlier ones
        stash
            .iter()
            .enumerate()
            .rev()
            .fold(shielded, |acc, (i, parked)| acc.replace(&token(i), parked))
    }
}

fn token(index: usize) -> String {
    format!("\u{E000}{}\u{E001}", index)
}

fn park(stash: &mut Vec<String>, text: String) -> String {
    stash.push(text);
    token(stash.len() - 1)
}

fn render_shielded(rule: &TranslationRule, caps: &Captures, stash: &mut Vec<String>) -> String {
    let mut out = String::new();
    match rule.shield {
        Shield::Open => caps.expand(rule.template, &mut out),
        Shield::Whole => {
            caps.expand(rule.template, &mut out);
            return park(stash, out);
        }
        Shield::Group(n) => {
            let target = caps.get(n).map_or("", |m| m.as_str()).to_string();
            let template = rule
                .template
                .replace(&format!("${{{}}}", n), &park(stash, target));
            caps.expand(&template, &mut out);
        }
    }
    out
}

/// Translate with the process-wide default rule set.
pub fn to_telegram_html(text: &str) -> String {
    DEFAULT_TRANSLATOR.translate(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_order_is_pinned() {
        let translator = MarkupTranslator::new().unwrap();
        let names: Vec<&str> = translator.rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "code_block",
                "inline_code",
                "user_link",
                "link",
                "heading",
                "bold",
                "underline",
                "underline_plus",
                "italic_star",
                "italic_underscore",
                "strikethrough",
                "spoiler",
                "blockquote",
            ]
        );
    }

    #[test]
    fn built_in_rules_all_compile() {
        assert_eq!(MarkupTranslator::new().unwrap().rules().len(), RULES.len());
        assert_eq!(MarkupTranslator::shared().rules().len(), RULES.len());
    }

    #[test]
    fn plain_text_is_unchanged() {
        let text = "No markup here: 2 < 3 & 5 > 4, a lone * and a lone _ too.";
        assert_eq!(to_telegram_html(text), text);
        assert_eq!(to_telegram_html(""), "");
    }

    #[test]
    fn single_rules() {
        assert_eq!(to_telegram_html("**bold**"), "<b>bold</b>");
        assert_eq!(to_telegram_html("~~x~~"), "<s>x</s>");
        assert_eq!(to_telegram_html("__under__"), "<u>under</u>");
        assert_eq!(to_telegram_html("++under++"), "<u>under</u>");
        assert_eq!(to_telegram_html("*it*"), "<i>it</i>");
        assert_eq!(to_telegram_html("_it_"), "<i>it</i>");
        assert_eq!(
            to_telegram_html("||secret||"),
            r#"<span class="tg-spoiler">secret</span>"#
        );
        assert_eq!(to_telegram_html("`x = 1`"), "<code>x = 1</code>");
        assert_eq!(to_telegram_html("```let x = 1;```"), "<pre>let x = 1;</pre>");
    }

    #[test]
    fn links() {
        assert_eq!(
            to_telegram_html("see [Docs](https://example.com/page) now"),
            r#"see <a href="https://example.com/page">Docs</a> now"#
        );
        assert_eq!(
            to_telegram_html("[plain](http://example.com)"),
            r#"<a href="http://example.com">plain</a>"#
        );
        assert_eq!(
            to_telegram_html("ask [Bob](tg://user?id=42)"),
            r#"ask <a href="tg://user?id=42">Bob</a>"#
        );
        assert_eq!(to_telegram_html("[x](ftp://host)"), "[x](ftp://host)");
    }

    #[test]
    fn heading_and_blockquote_match_at_line_start_only() {
        assert_eq!(to_telegram_html("## Dosage"), "<b>Dosage</b>");
        assert_eq!(
            to_telegram_html("intro\n## Dosage\nbody"),
            "intro\n<b>Dosage</b>\nbody"
        );
        assert_eq!(to_telegram_html("> quoted"), "<blockquote>quoted</blockquote>");
        assert_eq!(
            to_telegram_html("first\n> second"),
            "first\n<blockquote>second</blockquote>"
        );
        assert_eq!(to_telegram_html("a > b"), "a > b");
    }

    #[test]
    fn multiple_matches_are_all_replaced() {
        assert_eq!(
            to_telegram_html("**a** and **b**"),
            "<b>a</b> and <b>b</b>"
        );
    }

    #[test]
    fn later_rules_see_earlier_output() {
        // heading wraps first, then the bold rule rewrites the inner markers
        assert_eq!(to_telegram_html("## **Title**"), "<b><b>Title</b></b>");
        assert_eq!(
            to_telegram_html("## see [docs](https://example.com)"),
            r#"<b>see <a href="https://example.com">docs</a></b>"#
        );
    }

    #[test]
    fn code_is_left_verbatim() {
        assert_eq!(
            to_telegram_html("`snake_case_name`"),
            "<code>snake_case_name</code>"
        );
        assert_eq!(
            to_telegram_html("```let **x** = a_b_c;```"),
            "<pre>let **x** = a_b_c;</pre>"
        );
        assert_eq!(
            to_telegram_html("`[a](https://x.com)` and *b*"),
            "<code>[a](https://x.com)</code> and <i>b</i>"
        );
    }

    #[test]
    fn link_targets_keep_emphasis_markers() {
        assert_eq!(
            to_telegram_html(
                "see [wiki](https://en.wikipedia.org/wiki/Serotonin_syndrome_risk) and [x](https://a.com/__init__)"
            ),
            r#"see <a href="https://en.wikipedia.org/wiki/Serotonin_syndrome_risk">wiki</a> and <a href="https://a.com/__init__">x</a>"#
        );
        assert_eq!(
            to_telegram_html("[a*b*c](https://a.com/*x*)"),
            r#"<a href="https://a.com/*x*">a<i>b</i>c</a>"#
        );
    }

    #[test]
    fn link_labels_are_still_formatted() {
        assert_eq!(
            to_telegram_html("[**Docs**](https://a.com/x_y_z)"),
            r#"<a href="https://a.com/x_y_z"><b>Docs</b></a>"#
        );
    }

    #[test]
    fn single_markers_match_lazily() {
        assert_eq!(to_telegram_html("*a* and *b*"), "<i>a</i> and <i>b</i>");
        assert_eq!(to_telegram_html("_a_ and _b_"), "<i>a</i> and <i>b</i>");
    }

    #[test]
    fn code_block_spans_lines() {
        assert_eq!(
            to_telegram_html("```\nfn main() {}\n```"),
            "<pre>\nfn main() {}\n</pre>"
        );
    }

    #[test]
    fn inline_rules_do_not_cross_newlines() {
        assert_eq!(to_telegram_html("~~a\nb~~"), "~~a\nb~~");
        assert_eq!(to_telegram_html("||a\nb||"), "||a\nb||");
    }
}
