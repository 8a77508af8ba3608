//! Ingested record shape and the one-JSON-line-at-a-time decoder.
//!
//! Mirrors the five-variant `type` field of the upstream dump (story, comment,
//! job, poll, pollopt). Only stories and comments carry fields this crate acts
//! on; job/poll/pollopt records are counted and otherwise ignored.

use eyre::{Context, Result, eyre};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Story,
    Comment,
    Job,
    Poll,
    PollOpt,
}

impl Kind {
    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "story" => Some(Kind::Story),
            "comment" => Some(Kind::Comment),
            "job" => Some(Kind::Job),
            "poll" => Some(Kind::Poll),
            "pollopt" => Some(Kind::PollOpt),
            _ => None,
        }
    }
}

/// A single decoded record. `source_file` is stamped on after parsing, since
/// it isn't part of the line itself.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub kind: Kind,
    pub deleted: bool,
    pub title: Option<String>,
    pub text: Option<String>,
    pub parent: Option<i64>,
    pub kids: Vec<i64>,
    pub source_file: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: i64,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    parent: Option<i64>,
    #[serde(default)]
    kids: Vec<i64>,
}

/// Parse one line of the dump. An unrecognized `type` is a fatal invariant
/// violation, per spec.
pub fn parse_line(line: &str, source_file: &str) -> Result<Item> {
    let raw: RawItem =
        serde_json::from_str(line).wrap_err_with(|| format!("malformed JSON in {source_file}"))?;

    let kind = Kind::from_raw(&raw.item_type)
        .ok_or_else(|| eyre!("unknown item type {:?} (id {})", raw.item_type, raw.id))?;

    Ok(Item {
        id: raw.id,
        kind,
        deleted: raw.deleted,
        title: raw.title,
        text: raw.text,
        parent: raw.parent,
        kids: raw.kids,
        source_file: source_file.to_string(),
    })
}
