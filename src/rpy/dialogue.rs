//! Line classifier for Ren'Py dialogue statements.
//!
//! A statement body is matched against an ordered rule list; the first rule
//! that hits determines the shape. The matched text (and, for name-only
//! dialogue, the speaker) is spliced out of the line to learn a reusable
//! format template, with every other character kept verbatim so the original
//! line can be reconstructed exactly.

use once_cell::sync::Lazy;
use regex::Regex;

/// Optional clauses that may trail a dialogue statement, in source order:
/// a `nointeract` marker, one or more `with <transition>` clauses, and a
/// trailing parenthesized property assignment (e.g. `(who_color="#000")`).
/// These are opaque to the classifier and survive verbatim in the template.
const OPTIONAL_CLAUSES: &str = r"( nointeract)?(( with .+)+)?( \(\w+=.+\)+)?";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineShape {
    /// `"Name" "text"` -- both speaker and text are quoted literals.
    NameOnly,
    /// `ident "text"` -- speaker is a bare character identifier.
    Character,
    /// `"text"` -- no speaker.
    Narration,
    /// Anything else (control statements like `nvl clear`); passes through
    /// verbatim.
    Fallback,
}

/// Ordered rule table, tried top to bottom, first match wins.
static RULES: Lazy<[(LineShape, Regex); 3]> = Lazy::new(|| {
    let rule = |core: &str| format!("(?m)^{core}{OPTIONAL_CLAUSES}$");
    [
        (
            LineShape::NameOnly,
            Regex::new(&rule(r#""(.+)" "(.*)""#)).expect("name-only rule"),
        ),
        (
            LineShape::Character,
            Regex::new(&rule(r#"(.+) "(.*)""#)).expect("character rule"),
        ),
        (
            LineShape::Narration,
            Regex::new(&rule(r#""(.*)""#)).expect("narration rule"),
        ),
    ]
});

/// Parse result of one statement body.
///
/// `format` is the body with the spoken text replaced by `[what]` (and the
/// speaker by `[who]` for name-only dialogue). For multi-line bodies only the
/// first line carrying quoted text participates in extraction; the remaining
/// lines stay in the template as literal fragments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialogue {
    pub who: Option<String>,
    pub name_only: bool,
    pub what: Option<String>,
    pub format: String,
}

impl Dialogue {
    /// Classify one statement body. Never fails: a body matching no rule
    /// degrades to [`LineShape::Fallback`] with the body as its own template.
    pub fn parse(line: &str) -> Dialogue {
        for (shape, re) in RULES.iter() {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            return match shape {
                LineShape::NameOnly => {
                    let who = caps.get(1).expect("who group");
                    let what = caps.get(2).expect("what group");
                    Dialogue {
                        who: Some(who.as_str().to_string()),
                        name_only: true,
                        what: Some(what.as_str().to_string()),
                        format: format!(
                            "{}[who]{}[what]{}",
                            &line[..who.start()],
                            &line[who.end()..what.start()],
                            &line[what.end()..]
                        ),
                    }
                }
                LineShape::Character => {
                    let who = caps.get(1).expect("who group");
                    let what = caps.get(2).expect("what group");
                    Dialogue {
                        who: Some(who.as_str().to_string()),
                        name_only: false,
                        what: Some(what.as_str().to_string()),
                        format: format!("{}[what]{}", &line[..what.start()], &line[what.end()..]),
                    }
                }
                LineShape::Narration => {
                    let what = caps.get(1).expect("what group");
                    Dialogue {
                        who: None,
                        name_only: false,
                        what: Some(what.as_str().to_string()),
                        format: format!("{}[what]{}", &line[..what.start()], &line[what.end()..]),
                    }
                }
                LineShape::Fallback => unreachable!("fallback is not a rule"),
            };
        }
        Dialogue {
            who: None,
            name_only: false,
            what: None,
            format: line.to_string(),
        }
    }

    pub fn shape(&self) -> LineShape {
        match (&self.what, &self.who, self.name_only) {
            (None, _, _) => LineShape::Fallback,
            (Some(_), Some(_), true) => LineShape::NameOnly,
            (Some(_), Some(_), false) => LineShape::Character,
            (Some(_), None, _) => LineShape::Narration,
        }
    }

    /// Substitute this dialogue's own speaker/text back into its template.
    ///
    /// For every shape, including fallback, this reproduces the parsed line
    /// exactly. No escaping is applied: the extracted text is already in
    /// source-literal form.
    pub fn render(&self) -> String {
        let mut out = self.format.clone();
        if self.name_only {
            if let Some(who) = self.who.as_deref() {
                out = out.replace("[who]", who);
            }
        }
        if let Some(what) = self.what.as_deref() {
            out = out.replace("[what]", what);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dlg(who: Option<&str>, name_only: bool, what: Option<&str>, format: &str) -> Dialogue {
        Dialogue {
            who: who.map(str::to_string),
            name_only,
            what: what.map(str::to_string),
            format: format.to_string(),
        }
    }

    #[test]
    fn parse_name_only() {
        assert_eq!(
            Dialogue::parse(r#""Main Character" "Hello there.""#),
            dlg(Some("Main Character"), true, Some("Hello there."), r#""[who]" "[what]""#)
        );
        assert_eq!(
            Dialogue::parse(r#""Main Character" "Hello there." nointeract"#),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                r#""[who]" "[what]" nointeract"#
            )
        );
        assert_eq!(
            Dialogue::parse(r#""Main Character" "Hello there." with vpunch"#),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                r#""[who]" "[what]" with vpunch"#
            )
        );
        assert_eq!(
            Dialogue::parse(r##""Main Character" "Hello there." (who_color="#000")"##),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                r##""[who]" "[what]" (who_color="#000")"##
            )
        );
        assert_eq!(
            Dialogue::parse(
                r##""Main Character" "Hello there." (who_color="#000") with SomeTransition("some args")"##
            ),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                r##""[who]" "[what]" (who_color="#000") with SomeTransition("some args")"##
            )
        );
    }

    #[test]
    fn parse_name_only_multiline() {
        assert_eq!(
            Dialogue::parse("\"Main Character\" \"Hello there.\"\nnvl clear"),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                "\"[who]\" \"[what]\"\nnvl clear"
            )
        );
        assert_eq!(
            Dialogue::parse("nvl clear\n\"Main Character\" \"Hello there.\""),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                "nvl clear\n\"[who]\" \"[what]\""
            )
        );
        assert_eq!(
            Dialogue::parse("nvl clear\n\"Main Character\" \"Hello there.\" with vpunch"),
            dlg(
                Some("Main Character"),
                true,
                Some("Hello there."),
                "nvl clear\n\"[who]\" \"[what]\" with vpunch"
            )
        );
    }

    #[test]
    fn parse_character() {
        assert_eq!(
            Dialogue::parse(r#"mc "Hello there.""#),
            dlg(Some("mc"), false, Some("Hello there."), r#"mc "[what]""#)
        );
        assert_eq!(
            Dialogue::parse(r#"mc "Hello there." nointeract"#),
            dlg(Some("mc"), false, Some("Hello there."), r#"mc "[what]" nointeract"#)
        );
        assert_eq!(
            Dialogue::parse(r#"mc "Hello there." with vpunch"#),
            dlg(Some("mc"), false, Some("Hello there."), r#"mc "[what]" with vpunch"#)
        );
        assert_eq!(
            Dialogue::parse(r##"mc "Hello there." (who_color="#000")"##),
            dlg(
                Some("mc"),
                false,
                Some("Hello there."),
                r##"mc "[what]" (who_color="#000")"##
            )
        );
    }

    #[test]
    fn parse_character_multiline() {
        assert_eq!(
            Dialogue::parse("mc \"Hello there.\"\nnvl clear"),
            dlg(Some("mc"), false, Some("Hello there."), "mc \"[what]\"\nnvl clear")
        );
        assert_eq!(
            Dialogue::parse("nvl clear\nmc \"Hello there.\""),
            dlg(Some("mc"), false, Some("Hello there."), "nvl clear\nmc \"[what]\"")
        );
    }

    #[test]
    fn parse_narration() {
        assert_eq!(
            Dialogue::parse(r#""Hello there.""#),
            dlg(None, false, Some("Hello there."), r#""[what]""#)
        );
        assert_eq!(
            Dialogue::parse(r#""Hello there." nointeract"#),
            dlg(None, false, Some("Hello there."), r#""[what]" nointeract"#)
        );
        assert_eq!(
            Dialogue::parse(r#""Hello there." with vpunch"#),
            dlg(None, false, Some("Hello there."), r#""[what]" with vpunch"#)
        );
        assert_eq!(
            Dialogue::parse(r##""Hello there." (who_color="#000") with SomeTransition("some args")"##),
            dlg(
                None,
                false,
                Some("Hello there."),
                r##""[what]" (who_color="#000") with SomeTransition("some args")"##
            )
        );
    }

    #[test]
    fn parse_narration_multiline() {
        assert_eq!(
            Dialogue::parse("\"Hello there.\"\nnvl clear"),
            dlg(None, false, Some("Hello there."), "\"[what]\"\nnvl clear")
        );
        assert_eq!(
            Dialogue::parse("nvl clear\n\"Hello there.\""),
            dlg(None, false, Some("Hello there."), "nvl clear\n\"[what]\"")
        );
    }

    #[test]
    fn parse_non_dialogue_falls_through() {
        assert_eq!(Dialogue::parse("nvl clear"), dlg(None, false, None, "nvl clear"));
        assert_eq!(
            Dialogue::parse("khaskhdakjsdkj"),
            dlg(None, false, None, "khaskhdakjsdkj")
        );
        assert_eq!(
            Dialogue::parse("translate en strings:"),
            dlg(None, false, None, "translate en strings:")
        );
    }

    #[test]
    fn shapes() {
        assert_eq!(Dialogue::parse(r#""N" "t""#).shape(), LineShape::NameOnly);
        assert_eq!(Dialogue::parse(r#"mc "t""#).shape(), LineShape::Character);
        assert_eq!(Dialogue::parse(r#""t""#).shape(), LineShape::Narration);
        assert_eq!(Dialogue::parse("nvl clear").shape(), LineShape::Fallback);
    }

    #[test]
    fn round_trip_every_shape() {
        let lines = [
            r#""Main Character" "Hello there.""#,
            r#""Main Character" "Hello there." nointeract"#,
            r#""Main Character" "Hello there." with vpunch"#,
            r##""Main Character" "Hello there." (who_color="#000")"##,
            r##""Main Character" "Hello there." (who_color="#000") with SomeTransition("some args")"##,
            r#"mc "Hello there.""#,
            r#"mc "Hello there." nointeract"#,
            r#"mc "Hello there." with vpunch"#,
            r##"mc "Hello there." (who_color="#000")"##,
            r#""Hello there.""#,
            r#""Hello there." nointeract"#,
            r#""Hello there." with vpunch with dissolve"#,
            r##""Hello there." (who_color="#000")"##,
            "mc \"Hello there.\"\nnvl clear",
            "nvl clear\nmc \"Hello there.\"",
            "\"Main Character\" \"Hello there.\" with vpunch\nnvl clear",
            "nvl clear\n\"Hello there.\" (who_color=\"#000\")",
            "nvl clear",
            "khaskhdakjsdkj",
        ];
        for line in lines {
            assert_eq!(Dialogue::parse(line).render(), line, "round trip failed for {line:?}");
        }
    }

    #[test]
    fn round_trip_with_escaped_quotes_in_text() {
        let line = r#"mc "He said \"hi\" to me.""#;
        let d = Dialogue::parse(line);
        assert_eq!(d.what.as_deref(), Some(r#"He said \"hi\" to me."#));
        assert_eq!(d.render(), line);
    }
}
