//! RSS 2.0 / Atom parsing into a transient [`FeedSnapshot`].
//!
//! Hand-rolled over quick-xml rather than a feed crate: the normalizer
//! ([`crate::timestamp`]) needs the *raw* timestamp strings, and the usual
//! feed crates eagerly parse dates and throw the originals away. Entry order
//! is preserved exactly as the document lists it (feeds are newest-first).

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

/// One fetch's parsed feed. Transient — never persisted, no identity beyond
/// the fetch call that produced it.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Feed-level updated timestamp, raw (`<lastBuildDate>` for RSS,
    /// top-level `<updated>` for Atom). Many feeds omit it.
    pub updated_raw: Option<String>,
    /// Items in document order (newest first, as feeds publish them).
    pub items: Vec<FeedItem>,
}

/// A single raw feed item. Timestamps stay as the strings the feed served.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// First of `<pubDate>` / `<published>` / `<updated>` seen on the item.
    pub published_raw: Option<String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("document is neither RSS nor Atom")]
    NotAFeed,
}

/// Parse raw feed bytes into a [`FeedSnapshot`].
///
/// Handles both RSS 2.0 (`<rss><channel><item>`) and Atom
/// (`<feed><entry>`). Items missing a title or link are dropped — they
/// cannot satisfy the entry data model.
pub fn parse_feed(xml: &[u8]) -> Result<FeedSnapshot, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut saw_root = false;
    let mut in_item = false;
    let mut current_element = String::new();
    let mut current_item: Option<ItemBuilder> = None;

    let mut updated_raw: Option<String> = None;
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if !saw_root {
                    if name != "rss" && name != "feed" {
                        return Err(ParseError::NotAFeed);
                    }
                    saw_root = true;
                }
                if name == "item" || name == "entry" {
                    in_item = true;
                    current_item = Some(ItemBuilder::default());
                }
                if in_item && name == "link" {
                    // Atom puts the URL in attributes, not text
                    if let Some(ref mut item) = current_item {
                        item.take_atom_link(&e);
                    }
                }
                current_element = name;
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if in_item && name == "link" {
                    if let Some(ref mut item) = current_item {
                        item.take_atom_link(&e);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" || name == "entry" {
                    in_item = false;
                    if let Some(item) = current_item.take().and_then(ItemBuilder::build) {
                        items.push(item);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                record_text(
                    text,
                    &current_element,
                    in_item,
                    &mut current_item,
                    &mut updated_raw,
                );
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                record_text(
                    text,
                    &current_element,
                    in_item,
                    &mut current_item,
                    &mut updated_raw,
                );
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(ParseError::NotAFeed);
    }

    Ok(FeedSnapshot { updated_raw, items })
}

fn record_text(
    text: String,
    current_element: &str,
    in_item: bool,
    current_item: &mut Option<ItemBuilder>,
    updated_raw: &mut Option<String>,
) {
    if text.is_empty() {
        return;
    }
    if in_item {
        if let Some(item) = current_item {
            match current_element {
                "title" => item.title = Some(text),
                "link" => item.link = Some(text),
                "pubDate" | "published" | "updated" => {
                    item.published_raw.get_or_insert(text);
                }
                _ => {}
            }
        }
    } else if matches!(current_element, "lastBuildDate" | "updated") {
        updated_raw.get_or_insert(text);
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    published_raw: Option<String>,
}

impl ItemBuilder {
    fn take_atom_link(&mut self, e: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"href" => href = Some(String::from_utf8_lossy(&attr.value).to_string()),
                b"rel" => rel = Some(String::from_utf8_lossy(&attr.value).to_string()),
                _ => {}
            }
        }
        // rel absent defaults to "alternate" in Atom
        let is_alternate = rel.as_deref().map_or(true, |r| r == "alternate");
        if is_alternate {
            if let Some(href) = href {
                self.link.get_or_insert(href);
            }
        }
    }

    fn build(self) -> Option<FeedItem> {
        Some(FeedItem {
            title: self.title?,
            link: self.link?,
            published_raw: self.published_raw,
        })
    }
}
