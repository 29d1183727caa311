use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db::KeyValueStore;

use super::playback::{MediaKind, WatchTarget};

pub(crate) const HISTORY_STORAGE_KEY: &str = "watchHistory";
pub(crate) const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WatchHistoryEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) episode: Option<u32>,
    #[serde(alias = "date", deserialize_with = "deserialize_timestamp")]
    pub(crate) timestamp: String,
}

/// Movies have no season/episode, so their key degenerates to the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct HistoryKey {
    pub(crate) id: String,
    pub(crate) season: Option<u32>,
    pub(crate) episode: Option<u32>,
}

impl WatchHistoryEntry {
    pub(crate) fn for_target(target: &WatchTarget, timestamp: impl Into<String>) -> Self {
        Self {
            id: target.id.trim().to_string(),
            kind: target.kind,
            season: target.season,
            episode: target.episode,
            timestamp: timestamp.into(),
        }
    }

    pub(crate) fn now(target: &WatchTarget) -> Self {
        Self::for_target(target, Utc::now().to_rfc3339())
    }

    pub(crate) fn key(&self) -> HistoryKey {
        HistoryKey {
            id: self.id.clone(),
            season: self.season,
            episode: self.episode,
        }
    }

    pub(crate) fn target(&self) -> WatchTarget {
        let mut target = match self.kind {
            MediaKind::Movie => WatchTarget::movie(self.id.clone()),
            MediaKind::Tv => WatchTarget::tv(
                self.id.clone(),
                self.season.unwrap_or(1),
                self.episode.unwrap_or(1),
            ),
            MediaKind::Anime => WatchTarget::anime(self.id.clone(), self.episode.unwrap_or(1)),
        };
        if self.kind == MediaKind::Anime {
            target.season = self.season;
        }
        target
    }
}

impl HistoryKey {
    pub(crate) fn of_target(target: &WatchTarget) -> Self {
        Self {
            id: target.id.trim().to_string(),
            season: target.season,
            episode: target.episode,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => Ok(text),
        Scalar::Int(number) => Ok(number.to_string()),
    }
}

// Older entries stored epoch milliseconds instead of an ISO string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => Ok(text),
        Scalar::Int(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339())
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {millis}"))),
    }
}

/// Parses the persisted slot. Anything that is not a JSON array reads as an
/// empty history; individual unreadable entries are dropped.
pub(crate) fn parse_history(raw: &str) -> Vec<WatchHistoryEntry> {
    let values: Vec<Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(err) => {
            tracing::warn!(error = %err, "watch history is malformed; treating as empty");
            return Vec::new();
        }
    };

    let total = values.len();
    let entries: Vec<WatchHistoryEntry> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .filter(|entry: &WatchHistoryEntry| !entry.id.trim().is_empty())
        .collect();
    if entries.len() < total {
        tracing::warn!(
            skipped = total - entries.len(),
            "ignored malformed watch history entries"
        );
    }
    entries
}

pub(crate) fn serialize_history(entries: &[WatchHistoryEntry]) -> Result<String> {
    serde_json::to_string(entries).context("failed to serialize watch history")
}

/// Keeps the first (newest) entry for each key and bounds the list. Slots
/// written by older versions may hold duplicates or exceed the limit.
fn normalize_history(entries: Vec<WatchHistoryEntry>) -> Vec<WatchHistoryEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.key()))
        .take(HISTORY_LIMIT)
        .collect()
}

/// Puts the entry first, dropping anything sharing its key.
pub(crate) fn upsert_entry(
    mut entries: Vec<WatchHistoryEntry>,
    entry: WatchHistoryEntry,
) -> Vec<WatchHistoryEntry> {
    entries.insert(0, entry);
    normalize_history(entries)
}

/// The only persistent state the application mutates. Writes are
/// fire-and-forget: failures are logged and the caller carries on.
pub(crate) struct WatchHistory<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> WatchHistory<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub(crate) fn list(&self) -> Vec<WatchHistoryEntry> {
        match self.store.get_item(HISTORY_STORAGE_KEY) {
            Ok(Some(raw)) => parse_history(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read watch history");
                Vec::new()
            }
        }
    }

    pub(crate) fn record(&self, entry: WatchHistoryEntry) {
        self.write(upsert_entry(self.list(), entry));
    }

    /// Records `entry` in place of the entry `previous` pointed at, used when
    /// the episode changes while a title stays open.
    pub(crate) fn replace(&self, previous: &HistoryKey, entry: WatchHistoryEntry) {
        let mut entries = self.list();
        entries.retain(|existing| existing.key() != *previous);
        self.write(upsert_entry(entries, entry));
    }

    pub(crate) fn remove(&self, key: &HistoryKey) -> Result<bool> {
        Ok(self.remove_matching(|entry| entry.key() == *key)? > 0)
    }

    /// Removes every entry for a title regardless of season or episode.
    pub(crate) fn remove_title(&self, id: &str) -> Result<usize> {
        let id = id.trim();
        self.remove_matching(|entry| entry.id == id)
    }

    fn remove_matching(&self, matches: impl Fn(&WatchHistoryEntry) -> bool) -> Result<usize> {
        let mut entries = self.list();
        let before = entries.len();
        entries.retain(|existing| !matches(existing));
        let removed = before - entries.len();
        if removed == 0 {
            return Ok(0);
        }
        self.persist(entries)?;
        Ok(removed)
    }

    pub(crate) fn clear(&self) -> Result<()> {
        self.store.remove_item(HISTORY_STORAGE_KEY)?;
        Ok(())
    }

    fn write(&self, entries: Vec<WatchHistoryEntry>) {
        if let Err(err) = self.persist(entries) {
            tracing::warn!(error = %err, "failed to save watch history");
        }
    }

    // Every write goes through here so the stored slot stays unique and bounded.
    fn persist(&self, entries: Vec<WatchHistoryEntry>) -> Result<()> {
        let raw = serialize_history(&normalize_history(entries))?;
        self.store.set_item(HISTORY_STORAGE_KEY, &raw)
    }
}
