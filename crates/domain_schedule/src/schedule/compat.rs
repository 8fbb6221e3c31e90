//! On-disk representation of cached weeks.
//!
//! Records are written as `{ "timestamp": <ms>, "data": <WeekSnapshot> }`.
//! Older records may be a bare [WeekSnapshot]; for those the fetch time is used as save time.

use chrono::{DateTime, Utc};
use common_in_memory_cache::Entry;
use domain_schedule_models::WeekSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct WritingPersistentEntry<'a> {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    data: &'a WeekSnapshot,
}

pub(crate) fn writing(snapshot: &WeekSnapshot, saved_at: DateTime<Utc>) -> WritingPersistentEntry<'_> {
    WritingPersistentEntry {
        timestamp: saved_at,
        data: snapshot,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ReadingPersistentEntry {
    Current {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        data: WeekSnapshot,
    },
    Legacy(WeekSnapshot),
}

impl From<ReadingPersistentEntry> for Entry<WeekSnapshot> {
    fn from(value: ReadingPersistentEntry) -> Self {
        match value {
            ReadingPersistentEntry::Current { timestamp, data } => Entry::with_saved_at(data, timestamp),
            ReadingPersistentEntry::Legacy(data) => {
                let saved_at = data.fetched_at;
                Entry::with_saved_at(data, saved_at)
            }
        }
    }
}
