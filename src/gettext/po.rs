//! Reader/writer for the on-disk PO catalog syntax.
//!
//! Covers the subset the converters exchange: `msgctxt`/`msgid`/`msgstr`
//! with multiline string continuation, `#:` source references, `#.`
//! extracted comments, and `#~`-prefixed obsolete entries. Plural forms are
//! out of scope.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};

use crate::gettext::catalog::{Catalog, Message};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    Str,
}

/// Parse PO text into a catalog. The header entry (empty msgid) is consumed
/// and dropped; the in-memory model has no use for it and the writer emits a
/// fresh one.
pub fn parse(content: &str) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::new();
    let mut entry = Message::default();
    let mut has_id = false;
    let mut field: Option<Field> = None;

    fn flush(
        catalog: &mut Catalog,
        entry: &mut Message,
        has_id: &mut bool,
        field: &mut Option<Field>,
    ) {
        if *has_id && !(entry.id.is_empty() && entry.context.is_none()) {
            catalog.add(std::mem::take(entry));
        } else {
            *entry = Message::default();
        }
        *has_id = false;
        *field = None;
    }

    for (idx, raw) in content.lines().enumerate() {
        let line_num = idx + 1;
        let mut line = raw.trim();
        if line.is_empty() {
            flush(&mut catalog, &mut entry, &mut has_id, &mut field);
            continue;
        }
        if let Some(rest) = line.strip_prefix("#~") {
            entry.obsolete = true;
            line = rest.trim_start();
            if line.is_empty() {
                continue;
            }
        }
        if let Some(rest) = line.strip_prefix("#.") {
            entry.comments.push(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("#:") {
            entry
                .source_refs
                .extend(rest.split_whitespace().map(str::to_string));
        } else if line.starts_with('#') {
            // translator comments, flags: ignored
        } else if let Some(rest) = line.strip_prefix("msgctxt ") {
            entry.context = Some(unquote(rest, line_num)?);
            field = Some(Field::Context);
        } else if let Some(rest) = line.strip_prefix("msgid ") {
            entry.id = unquote(rest, line_num)?;
            has_id = true;
            field = Some(Field::Id);
        } else if let Some(rest) = line.strip_prefix("msgstr ") {
            entry.translated = unquote(rest, line_num)?;
            field = Some(Field::Str);
        } else if line.starts_with('"') {
            let continued = unquote(line, line_num)?;
            match field {
                Some(Field::Context) => {
                    if let Some(ctx) = entry.context.as_mut() {
                        ctx.push_str(&continued);
                    }
                }
                Some(Field::Id) => entry.id.push_str(&continued),
                Some(Field::Str) => entry.translated.push_str(&continued),
                None => bail!("line {line_num}: string continuation outside any entry"),
            }
        } else {
            bail!("line {line_num}: unrecognized po line -- {line}");
        }
    }
    flush(&mut catalog, &mut entry, &mut has_id, &mut field);
    Ok(catalog)
}

pub fn read_path(path: &Path) -> anyhow::Result<Catalog> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse(&text).with_context(|| format!("parse {}", path.display()))
}

/// Serialize a catalog as PO text, preserving message order and field
/// semantics (`#.` comments, `#:` references, obsolete markers).
pub fn write(catalog: &Catalog) -> String {
    let mut out = String::new();
    out.push_str("msgid \"\"\nmsgstr \"\"\n\"Content-Type: text/plain; charset=UTF-8\\n\"\n");
    for msg in catalog.iter() {
        out.push('\n');
        for comment in &msg.comments {
            out.push_str("#. ");
            out.push_str(comment);
            out.push('\n');
        }
        for r in &msg.source_refs {
            out.push_str("#: ");
            out.push_str(r);
            out.push('\n');
        }
        let prefix = if msg.obsolete { "#~ " } else { "" };
        if let Some(ctx) = &msg.context {
            out.push_str(&format!("{prefix}msgctxt \"{}\"\n", quote(ctx)));
        }
        out.push_str(&format!("{prefix}msgid \"{}\"\n", quote(&msg.id)));
        out.push_str(&format!("{prefix}msgstr \"{}\"\n", quote(&msg.translated)));
    }
    out
}

pub fn write_path(catalog: &Catalog, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    fs::write(path, write(catalog)).with_context(|| format!("write {}", path.display()))
}

/// Strip surrounding quotes and unescape. Single pass, so `\\n` stays a
/// literal backslash-n instead of being double-unescaped into a newline.
fn unquote(s: &str, line_num: usize) -> anyhow::Result<String> {
    let s = s.trim();
    let Some(s) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        bail!("line {line_num}: expected quoted string, got {s}");
    };
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    Ok(result)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gettext::catalog::MessageKey;

    #[test]
    fn parse_simple() {
        let cat = parse("msgid \"Hello\"\nmsgstr \"Bonjour\"\n\nmsgid \"Bye\"\nmsgstr \"Salut\"\n")
            .expect("parse");
        assert_eq!(cat.len(), 2);
        let key = MessageKey {
            context: None,
            id: "Hello".to_string(),
        };
        assert_eq!(cat.get(&key).map(|m| m.translated.as_str()), Some("Bonjour"));
    }

    #[test]
    fn parse_context_and_metadata() {
        let text = "#. Eileen speaking\n#: game/script.rpy:10\nmsgctxt \"start_abc123\"\nmsgid \"Hello there.\"\nmsgstr \"Bonjour.\"\n";
        let cat = parse(text).expect("parse");
        assert_eq!(cat.len(), 1);
        let msg = cat.iter().next().expect("msg");
        assert_eq!(msg.context.as_deref(), Some("start_abc123"));
        assert_eq!(msg.comments, ["Eileen speaking"]);
        assert_eq!(msg.source_refs, ["game/script.rpy:10"]);
        assert!(!msg.obsolete);
    }

    #[test]
    fn parse_multiline_strings() {
        let text = "msgid \"\"\n\"Hello \"\n\"World\"\nmsgstr \"\"\n\"Bonjour \"\n\"Monde\"\n";
        let cat = parse(text).expect("parse");
        assert_eq!(cat.len(), 1);
        let msg = cat.iter().next().expect("msg");
        assert_eq!(msg.id, "Hello World");
        assert_eq!(msg.translated, "Bonjour Monde");
    }

    #[test]
    fn parse_obsolete_entry() {
        let text = "#~ msgid \"Old line\"\n#~ msgstr \"Vieille ligne\"\n";
        let cat = parse(text).expect("parse");
        assert_eq!(cat.len(), 1);
        assert!(cat.iter().next().expect("msg").obsolete);
    }

    #[test]
    fn parse_drops_header_entry() {
        let text = "msgid \"\"\nmsgstr \"\"\n\"Content-Type: text/plain\\n\"\n\nmsgid \"Hello\"\nmsgstr \"\"\n";
        let cat = parse(text).expect("parse");
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.iter().next().map(|m| m.id.as_str()), Some("Hello"));
    }

    #[test]
    fn parse_unescapes_without_double_pass() {
        let cat = parse("msgid \"line\\\\nend\"\nmsgstr \"a\\nb\"\n").expect("parse");
        let msg = cat.iter().next().expect("msg");
        assert_eq!(msg.id, "line\\nend");
        assert_eq!(msg.translated, "a\nb");
    }

    #[test]
    fn write_parse_round_trip() {
        let mut cat = Catalog::new();
        cat.add(Message {
            context: Some("start_abc123".to_string()),
            id: "He said \"hi\".".to_string(),
            translated: "Il a dit \"salut\".".to_string(),
            source_refs: vec!["game/script.rpy:10".to_string()],
            comments: vec!["Eileen speaking".to_string()],
            obsolete: false,
        });
        cat.add(Message {
            context: None,
            id: "Yes\nNo".to_string(),
            translated: "Oui\nNon".to_string(),
            source_refs: vec!["game/script.rpy:20".to_string()],
            comments: vec![],
            obsolete: true,
        });
        let text = write(&cat);
        let again = parse(&text).expect("reparse");
        assert_eq!(again.len(), 2);
        let msgs: Vec<_> = again.iter().collect();
        assert_eq!(msgs[0].id, "He said \"hi\".");
        assert_eq!(msgs[0].context.as_deref(), Some("start_abc123"));
        assert_eq!(msgs[0].comments, ["Eileen speaking"]);
        assert_eq!(msgs[1].id, "Yes\nNo");
        assert!(msgs[1].obsolete);
    }
}
