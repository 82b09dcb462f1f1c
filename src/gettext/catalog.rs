//! In-memory message catalog model, analogous to a gettext PO document.

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

/// Unique identity of a message within a catalog: optional context plus the
/// original-language text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    pub context: Option<String>,
    pub id: String,
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "[{ctx}] {}", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// One catalog entry. Source references are kept as raw `file:line` strings
/// and parsed at the point of use, where a malformed reference is fatal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub context: Option<String>,
    pub id: String,
    pub translated: String,
    pub source_refs: Vec<String>,
    pub comments: Vec<String>,
    pub obsolete: bool,
}

impl Message {
    pub fn key(&self) -> MessageKey {
        MessageKey {
            context: self.context.clone(),
            id: self.id.clone(),
        }
    }

    /// Parse the first source reference, if any. A present-but-malformed
    /// reference is an error; an absent one is not.
    pub fn first_reference(&self) -> anyhow::Result<Option<SourceReference>> {
        match self.source_refs.first() {
            None => Ok(None),
            Some(raw) => SourceReference::parse(raw).map(Some),
        }
    }
}

/// A `file:line` source location, ordered by file then line.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceReference {
    pub file: String,
    pub line: u32,
}

impl SourceReference {
    /// Split on the last colon; no colon at all is a fatal error.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let index = raw
            .rfind(':')
            .ok_or_else(|| anyhow!("invalid source reference: {raw}"))?;
        let line = raw[index + 1..]
            .parse()
            .with_context(|| format!("invalid source reference: {raw}"))?;
        Ok(Self {
            file: raw[..index].to_string(),
            line,
        })
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Ordered collection of messages with unique keys. Inserting a message whose
/// key already exists replaces the stored message in place; a catalog never
/// holds two retrievable entries under one key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    messages: Vec<Message>,
    index: HashMap<MessageKey, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, msg: Message) {
        let key = msg.key();
        match self.index.get(&key) {
            Some(&i) => self.messages[i] = msg,
            None => {
                self.index.insert(key, self.messages.len());
                self.messages.push(msg);
            }
        }
    }

    pub fn get(&self, key: &MessageKey) -> Option<&Message> {
        self.index.get(key).map(|&i| &self.messages[i])
    }

    pub fn get_mut(&mut self, key: &MessageKey) -> Option<&mut Message> {
        self.index.get(key).map(|&i| &mut self.messages[i])
    }

    pub fn contains(&self, key: &MessageKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(ctx: Option<&str>, id: &str, translated: &str) -> Message {
        Message {
            context: ctx.map(str::to_string),
            id: id.to_string(),
            translated: translated.to_string(),
            ..Message::default()
        }
    }

    #[test]
    fn duplicate_key_replaces_in_place() {
        let mut cat = Catalog::new();
        cat.add(msg(Some("s1"), "Hello", "Bonjour"));
        cat.add(msg(None, "Hello", "plain"));
        cat.add(msg(Some("s1"), "Hello", "Salut"));
        assert_eq!(cat.len(), 2);
        let key = MessageKey {
            context: Some("s1".to_string()),
            id: "Hello".to_string(),
        };
        assert_eq!(cat.get(&key).map(|m| m.translated.as_str()), Some("Salut"));
        // replacement keeps the original position
        assert_eq!(cat.iter().next().map(|m| m.translated.as_str()), Some("Salut"));
    }

    #[test]
    fn context_distinguishes_keys() {
        let mut cat = Catalog::new();
        cat.add(msg(Some("a"), "Hello", "1"));
        cat.add(msg(Some("b"), "Hello", "2"));
        cat.add(msg(None, "Hello", "3"));
        assert_eq!(cat.len(), 3);
    }

    #[test]
    fn source_reference_parsing() {
        let r = SourceReference::parse("game/script.rpy:42").expect("parse");
        assert_eq!(r.file, "game/script.rpy");
        assert_eq!(r.line, 42);
        assert_eq!(r.to_string(), "game/script.rpy:42");
        // last colon wins for windows-style paths
        let r = SourceReference::parse("C:/game/script.rpy:7").expect("parse");
        assert_eq!(r.file, "C:/game/script.rpy");
        assert_eq!(r.line, 7);
        assert!(SourceReference::parse("no-separator").is_err());
        assert!(SourceReference::parse("file:notanumber").is_err());
    }

    #[test]
    fn source_reference_ordering() {
        let mut refs = vec![
            SourceReference::parse("b.rpy:1").expect("parse"),
            SourceReference::parse("a.rpy:9").expect("parse"),
            SourceReference::parse("a.rpy:2").expect("parse"),
        ];
        refs.sort();
        let shown: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
        assert_eq!(shown, ["a.rpy:2", "a.rpy:9", "b.rpy:1"]);
    }
}
