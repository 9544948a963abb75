//! Streaming RSS 2.0 / Atom parser.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FeedError;

/// One `<item>` or `<entry>` as found in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Id,
    Title,
    Summary,
    Content,
    Link,
    Published,
    Updated,
    Category,
}

impl Slot {
    fn for_element(name: &[u8]) -> Option<Self> {
        match name {
            b"guid" | b"id" => Some(Slot::Id),
            b"title" => Some(Slot::Title),
            b"description" | b"summary" => Some(Slot::Summary),
            b"content" | b"encoded" => Some(Slot::Content),
            b"link" => Some(Slot::Link),
            b"pubDate" | b"published" | b"date" | b"issued" => Some(Slot::Published),
            b"updated" | b"modified" => Some(Slot::Updated),
            b"category" | b"subject" => Some(Slot::Category),
            _ => None,
        }
    }
}

struct Capture {
    slot: Slot,
    depth: usize,
    text: String,
}

/// Parse a feed document into its entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;
    // Depth of the open item/entry; only its direct children fill slots.
    let mut entry_depth = 0usize;
    let mut root_checked = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if !root_checked {
                    check_root(&e)?;
                    root_checked = true;
                }
                let name = e.local_name();
                if current.is_none() {
                    if is_entry(name.as_ref()) {
                        current = Some(FeedEntry::default());
                        entry_depth = depth;
                    }
                } else if capture.is_none() && depth == entry_depth + 1 {
                    if let (Some(entry), Some(slot)) =
                        (current.as_mut(), Slot::for_element(name.as_ref()))
                    {
                        read_attributes(entry, slot, &e)?;
                        capture = Some(Capture {
                            slot,
                            depth,
                            text: String::new(),
                        });
                    }
                }
            }
            Event::Empty(e) => {
                if !root_checked {
                    check_root(&e)?;
                    root_checked = true;
                }
                if capture.is_none() && depth == entry_depth {
                    if let (Some(entry), Some(slot)) =
                        (current.as_mut(), Slot::for_element(e.local_name().as_ref()))
                    {
                        read_attributes(entry, slot, &e)?;
                    }
                }
            }
            Event::Text(t) => {
                if let Some(cap) = &mut capture {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    // Separate text split by nested markup.
                    if depth > cap.depth && !cap.text.is_empty() {
                        cap.text.push(' ');
                    }
                    cap.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(cap) = &mut capture {
                    cap.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                if capture.as_ref().is_some_and(|cap| cap.depth == depth) {
                    if let (Some(cap), Some(entry)) = (capture.take(), current.as_mut()) {
                        store(entry, cap.slot, cap.text);
                    }
                } else if capture.is_none()
                    && depth == entry_depth
                    && is_entry(e.local_name().as_ref())
                {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_checked {
        return Err(FeedError::UnsupportedFormat(String::new()));
    }
    Ok(entries)
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn check_root(e: &BytesStart<'_>) -> Result<(), FeedError> {
    match e.local_name().as_ref() {
        b"rss" | b"feed" | b"RDF" => Ok(()),
        other => Err(FeedError::UnsupportedFormat(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

// Atom carries links and categories as attributes.
fn read_attributes(entry: &mut FeedEntry, slot: Slot, e: &BytesStart<'_>) -> Result<(), FeedError> {
    match slot {
        Slot::Link => {
            let rel = e.try_get_attribute("rel")?;
            let alternate = match &rel {
                Some(attr) => attr.unescape_value()? == "alternate",
                None => true,
            };
            if alternate && entry.link.is_none() {
                if let Some(href) = e.try_get_attribute("href")? {
                    entry.link = Some(href.unescape_value()?.into_owned());
                }
            }
        }
        Slot::Category => {
            if let Some(term) = e.try_get_attribute("term")? {
                push_category(entry, &term.unescape_value()?);
            }
        }
        _ => {}
    }
    Ok(())
}

fn store(entry: &mut FeedEntry, slot: Slot, text: String) {
    let text = text.trim().to_string();
    let first = |field: &mut Option<String>, text: String| {
        if field.is_none() && !text.is_empty() {
            *field = Some(text);
        }
    };
    match slot {
        Slot::Id => first(&mut entry.id, text),
        Slot::Title => first(&mut entry.title, text),
        Slot::Summary => first(&mut entry.summary, text),
        Slot::Content => first(&mut entry.content, text),
        Slot::Link => first(&mut entry.link, text),
        Slot::Published => first(&mut entry.published, text),
        Slot::Updated => first(&mut entry.updated, text),
        Slot::Category => push_category(entry, &text),
    }
}

fn push_category(entry: &mut FeedEntry, term: &str) {
    let term = term.trim();
    if !term.is_empty() && !entry.categories.iter().any(|c| c == term) {
        entry.categories.push(term.to_string());
    }
}
