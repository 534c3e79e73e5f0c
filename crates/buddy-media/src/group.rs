//! Memory-resident cache of multi-attachment posts.
//!
//! Telegram delivers each attachment of an album as its own message sharing
//! a `media_group_id`. The cache keeps a snapshot of every member so a
//! mention on one of them (or a reply to one) can see the whole album.

use crate::classify::has_supported_media;
use buddy_core::message::IncomingMessage;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

type GroupKey = (i64, String);

struct GroupEntry {
    /// Keyed by message id, so iteration is in id order.
    messages: BTreeMap<i64, IncomingMessage>,
    updated: Instant,
}

/// Album cache guarded by a single mutex.
pub struct MediaGroupCache {
    entries: Mutex<HashMap<GroupKey, GroupEntry>>,
    ttl: Duration,
}

impl MediaGroupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Remember an album member. No-op for messages outside an album or
    /// without supported media. Sweeps expired entries.
    pub fn record(&self, msg: &IncomingMessage) {
        self.record_at(msg, Instant::now());
    }

    pub(crate) fn record_at(&self, msg: &IncomingMessage, now: Instant) {
        let Some(group_id) = msg.media_group_id.as_deref() else {
            return;
        };
        if group_id.is_empty() || !has_supported_media(msg) {
            return;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry((msg.chat.id, group_id.to_string()))
            .or_insert_with(|| GroupEntry {
                messages: BTreeMap::new(),
                updated: now,
            });
        entry.messages.insert(msg.message_id, msg.clone());
        entry.updated = now;

        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.updated) <= ttl);
        let swept = before - entries.len();
        if swept > 0 {
            debug!("media group cache: evicted {swept} stale entries");
        }
    }

    /// Snapshot of an album ordered by message id. Refreshes the entry.
    pub fn messages(&self, chat_id: i64, group_id: &str) -> Vec<IncomingMessage> {
        self.messages_at(chat_id, group_id, Instant::now())
    }

    pub(crate) fn messages_at(
        &self,
        chat_id: i64,
        group_id: &str,
        now: Instant,
    ) -> Vec<IncomingMessage> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(&(chat_id, group_id.to_string())) {
            Some(entry) => {
                entry.updated = now;
                entry.messages.values().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// The media messages a turn should look at.
    ///
    /// The message's own album (or the message itself) if it carries media;
    /// otherwise the replied-to message's album (or that message); otherwise
    /// nothing.
    pub fn collect_media_messages(&self, msg: &IncomingMessage) -> Vec<IncomingMessage> {
        if has_supported_media(msg) {
            return self.album_or_single(msg.chat.id, msg);
        }
        match msg.reply_to.as_deref() {
            Some(reply) if has_supported_media(reply) => self.album_or_single(msg.chat.id, reply),
            _ => Vec::new(),
        }
    }

    fn album_or_single(&self, chat_id: i64, msg: &IncomingMessage) -> Vec<IncomingMessage> {
        if let Some(group_id) = msg.media_group_id.as_deref().filter(|g| !g.is_empty()) {
            let album = self.messages(chat_id, group_id);
            if !album.is_empty() {
                return album;
            }
        }
        vec![msg.clone()]
    }

    /// Number of live albums.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, photo};

    const TTL: Duration = Duration::from_secs(3600);

    fn album_member(id: i64, group: &str) -> IncomingMessage {
        let mut msg = message(id);
        msg.media_group_id = Some(group.into());
        msg.photo = vec![photo(&format!("p{id}"))];
        msg
    }

    #[test]
    fn test_record_ignores_non_album_and_text() {
        let cache = MediaGroupCache::new(TTL);
        let mut single = message(1);
        single.photo = vec![photo("p")];
        cache.record(&single);

        let mut text_in_group = message(2);
        text_in_group.media_group_id = Some("g".into());
        cache.record(&text_in_group);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_messages_sorted_by_id() {
        let cache = MediaGroupCache::new(TTL);
        for id in [12, 10, 11] {
            cache.record(&album_member(id, "g"));
        }
        let ids: Vec<i64> = cache
            .messages(-100, "g")
            .iter()
            .map(|m| m.message_id)
            .collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert!(cache.messages(-100, "other").is_empty());
        assert!(cache.messages(-999, "g").is_empty());
    }

    #[test]
    fn test_stale_entry_swept_on_next_write() {
        let cache = MediaGroupCache::new(TTL);
        let start = Instant::now();
        cache.record_at(&album_member(1, "old"), start);

        let later = start + TTL + Duration::from_secs(1);
        cache.record_at(&album_member(2, "new"), later);

        assert!(cache.messages_at(-100, "old", later).is_empty());
        assert_eq!(cache.messages_at(-100, "new", later).len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_recent_entry_survives_sweeps() {
        let cache = MediaGroupCache::new(TTL);
        let start = Instant::now();
        cache.record_at(&album_member(1, "kept"), start);

        // Each read refreshes the entry, so it outlives several TTLs.
        let mut now = start;
        for i in 0..5 {
            now += TTL - Duration::from_secs(1);
            assert_eq!(cache.messages_at(-100, "kept", now).len(), 1);
            cache.record_at(&album_member(100 + i, "churn"), now);
        }
        assert_eq!(cache.messages_at(-100, "kept", now).len(), 1);
    }

    #[test]
    fn test_collect_own_album() {
        let cache = MediaGroupCache::new(TTL);
        cache.record(&album_member(1, "g"));
        cache.record(&album_member(2, "g"));
        let collected = cache.collect_media_messages(&album_member(2, "g"));
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn test_collect_uncached_album_member_returns_itself() {
        let cache = MediaGroupCache::new(TTL);
        let collected = cache.collect_media_messages(&album_member(5, "unseen"));
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].message_id, 5);
    }

    #[test]
    fn test_collect_from_reply() {
        let cache = MediaGroupCache::new(TTL);
        cache.record(&album_member(1, "g"));
        cache.record(&album_member(2, "g"));
        cache.record(&album_member(3, "g"));

        let mut question = message(10);
        question.text = Some("what is on these?".into());
        question.reply_to = Some(Box::new(album_member(2, "g")));
        assert_eq!(cache.collect_media_messages(&question).len(), 3);

        let mut single_photo = message(4);
        single_photo.photo = vec![photo("solo")];
        question.reply_to = Some(Box::new(single_photo));
        let collected = cache.collect_media_messages(&question);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].message_id, 4);
    }

    #[test]
    fn test_collect_nothing_for_plain_text() {
        let cache = MediaGroupCache::new(TTL);
        let mut msg = message(1);
        msg.reply_to = Some(Box::new(message(0)));
        assert!(cache.collect_media_messages(&msg).is_empty());
    }
}
