//! Message merge engine.
//!
//! Combines a cached message list with a freshly fetched batch into one
//! canonical list: deduplicated by id, ordered by send time.
//!
//! # Precedence
//!
//! The second list wins. Messages are inserted into an id-keyed map first
//! from `earlier`, then from `later`, and each insertion replaces whatever
//! the id held before. Callers pass the more authoritative collection
//! (usually the remote batch) as `later`.
//!
//! # Ordering
//!
//! Ascending by `sent_at` parsed to epoch milliseconds, unparseable values
//! counting as zero, then ascending by id. Ids are unique after
//! deduplication, so the order is total and the output does not depend on
//! how either input was ordered.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use sprig_core::CachedMessage;

/// Merge two message lists; `later` wins on shared ids.
///
/// Neither input is modified. Within a single list, a later duplicate
/// replaces an earlier one.
pub fn merge_messages<M: CachedMessage>(earlier: &[M], later: &[M]) -> Vec<M> {
    let mut by_id: BTreeMap<&str, &M> = BTreeMap::new();
    for message in earlier.iter().chain(later) {
        by_id.insert(message.id(), message);
    }

    let mut merged: Vec<M> = by_id.into_values().cloned().collect();
    sort_messages(&mut merged);
    merged
}

/// Deduplicate and order a single list.
pub fn dedupe_sorted<M: CachedMessage>(messages: &[M]) -> Vec<M> {
    merge_messages(messages, &[])
}

/// Sort in place by `(sent_at, id)`.
pub fn sort_messages<M: CachedMessage>(messages: &mut [M]) {
    messages.sort_by_cached_key(|m| (m.sent_at_millis(), m.id().to_owned()));
}

/// The ordering `merge_messages` produces.
pub fn compare_messages<M: CachedMessage>(a: &M, b: &M) -> Ordering {
    a.sent_at_millis()
        .cmp(&b.sent_at_millis())
        .then_with(|| a.id().cmp(b.id()))
}
