use lazy_static::*;
use regex::Regex;
use std::borrow::Cow;

/// Maximum number of characters kept in a derived excerpt.
pub const EXCERPT_LENGTH: usize = 150;
pub const ELLIPSIS: &str = "...";

/// An article body, tagged with how it should be turned into markup.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Body<'a> {
    PlainText(&'a str),
    Markup(&'a str),
}

impl<'a> Body<'a> {
    /// Guess the body kind from its content: any angle bracket means markup.
    ///
    /// This cannot tell plain text containing a stray `<` from real markup.
    /// Records that need to be explicit should carry a `format` field.
    pub fn sniff(s: &'a str) -> Body<'a> {
        if s.contains(['<', '>']) {
            Body::Markup(s)
        } else {
            Body::PlainText(s)
        }
    }

    pub fn render(&self) -> String {
        match *self {
            Body::Markup(s) => s.to_string(),
            Body::PlainText("") => String::new(),
            Body::PlainText(s) => s
                .split("\n\n")
                .map(|paragraph| format!("<p>{}</p>", paragraph.trim()))
                .collect(),
        }
    }
}

pub fn format_content(s: &str) -> String {
    Body::sniff(s).render()
}

/// Remove anything that looks like a tag.
///
/// This is a lenient pattern match, not a parser: an unmatched `<` or `>` is
/// left in the output as is.
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    lazy_static! {
        static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    }
    TAG.replace_all(s, "")
}

/// First `EXCERPT_LENGTH` characters of `s`, followed by an ellipsis only
/// when something was cut off.
pub fn truncate(s: &str) -> String {
    match s.char_indices().nth(EXCERPT_LENGTH) {
        Some((end, _)) => format!("{}{}", &s[..end], ELLIPSIS),
        None => s.to_string(),
    }
}

/// `truncate` applied to `s` with tags stripped.
pub fn excerpt(s: &str) -> String {
    truncate(&strip_tags(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_plain_text_test() {
        assert_eq!(format_content("Hello\n\nWorld"), "<p>Hello</p><p>World</p>");
        assert_eq!(format_content("  one line  "), "<p>one line</p>");
        assert_eq!(
            format_content("first\nstill first\n\n second "),
            "<p>first\nstill first</p><p>second</p>"
        );
        assert_eq!(format_content("a\n\n\n\nb"), "<p>a</p><p></p><p>b</p>");
        assert_eq!(format_content(""), "");
    }

    #[test]
    fn format_markup_test() {
        assert_eq!(format_content("<p>Hi</p>"), "<p>Hi</p>");
        assert_eq!(format_content("a\n\n<b>b</b>"), "a\n\n<b>b</b>");
        // A stray bracket is enough to be treated as markup.
        assert_eq!(format_content("1 < 2\n\n3"), "1 < 2\n\n3");
        assert_eq!(format_content("2 > 1"), "2 > 1");
    }

    #[test]
    fn explicit_body_test() {
        assert_eq!(Body::PlainText("1 < 2").render(), "<p>1 < 2</p>");
        assert_eq!(Body::Markup("plain\n\ntext").render(), "plain\n\ntext");
        assert_eq!(Body::sniff("x"), Body::PlainText("x"));
        assert_eq!(Body::sniff("<x>"), Body::Markup("<x>"));
    }

    #[test]
    fn strip_tags_test() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_tags("no tags"), "no tags");
        // Known limitation: unbalanced brackets leak through.
        assert_eq!(strip_tags("a < b"), "a < b");
        assert_eq!(strip_tags("a > b <i>c</i>"), "a > b c");
    }

    #[test]
    fn excerpt_test() {
        assert_eq!(excerpt("<p>short</p>"), "short");

        let exact = "x".repeat(EXCERPT_LENGTH);
        assert_eq!(excerpt(&exact), exact);

        let long = "y".repeat(EXCERPT_LENGTH + 1);
        let e = excerpt(&long);
        assert_eq!(e, format!("{}...", "y".repeat(EXCERPT_LENGTH)));
        assert_eq!(e.chars().count(), EXCERPT_LENGTH + ELLIPSIS.len());

        // Tags do not count towards the limit.
        let tagged = format!("<p>{}</p>", exact);
        assert_eq!(excerpt(&tagged), exact);
    }

    #[test]
    fn truncate_keeps_tags_test() {
        assert_eq!(truncate("<b>short</b>"), "<b>short</b>");
        let long = format!("<i>{}</i>", "w".repeat(EXCERPT_LENGTH));
        assert_eq!(truncate(&long), format!("<i>{}...", "w".repeat(EXCERPT_LENGTH - 3)));
    }

    #[test]
    fn excerpt_counts_characters_test() {
        let s = "é".repeat(200);
        let e = excerpt(&s);
        assert!(e.ends_with(ELLIPSIS));
        assert_eq!(e.chars().count(), EXCERPT_LENGTH + ELLIPSIS.len());
    }

    #[test]
    fn excerpt_length_invariant_test() {
        for n in [0, 1, 149, 150, 151, 152, 400] {
            let content = "ab <i>c</i> ".repeat(n);
            let stripped = strip_tags(&content).chars().count();
            let e = excerpt(&content);
            assert!(e.chars().count() <= EXCERPT_LENGTH + ELLIPSIS.len());
            assert_eq!(e.ends_with(ELLIPSIS), stripped > EXCERPT_LENGTH, "n = {}", n);
        }
    }
}
