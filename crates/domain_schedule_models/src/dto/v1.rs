use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Stable identity of a group found by a search term.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct GroupIdentity {
    pub id: String,
    pub label: String,
}

/// One upstream lesson record, already normalized to a single canonical shape.
/// Every text field is an empty string when the upstream did not provide it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLesson {
    pub discipline: String,
    pub kind: String,
    pub begin: String,
    pub end: String,
    /// Short name used in `{teacher, room}` lines
    pub teacher: String,
    /// Full name, may be empty
    pub teacher_title: String,
    pub room: String,
    pub teacher_email: String,
    /// `YYYY.MM.DD` or `DD.MM.YYYY`
    pub date: String,
}

/// A `{teacher, room}` pair of a merged slot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct LessonLine {
    pub teacher: String,
    pub room: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct TeacherContact {
    pub name: String,
    pub email: String,
}

/// All raw lessons sharing discipline, kind, begin and end collapse into one slot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MergedLesson {
    pub discipline: String,
    pub kind: String,
    pub begin: String,
    pub end: String,
    /// Timetable position `1..=8`, or the position in the sorted day if the time is unusual
    pub pair_no: u8,
    pub is_foreign: bool,
    pub lines: Vec<LessonLine>,
    #[serde(default)]
    pub contacts: Vec<TeacherContact>,
}

/// Lessons of a single day, ordered by begin time.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct DaySchedule {
    pub lessons: Vec<MergedLesson>,
}

impl DaySchedule {
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }
}

/// Result of one upstream fetch of a Monday..Sunday range.
///
/// `by_date` is keyed by local `YYYY-MM-DD` date keys. Days without lessons are absent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekSnapshot {
    pub by_date: BTreeMap<String, DaySchedule>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
}

impl WeekSnapshot {
    pub fn new(by_date: BTreeMap<String, DaySchedule>) -> Self {
        Self {
            by_date,
            fetched_at: Utc::now(),
        }
    }

    /// Compares lessons only, `fetched_at` is ignored.
    /// Date keys are kept sorted by the map, so the order of days never matters.
    pub fn same_content(&self, other: &WeekSnapshot) -> bool {
        self.by_date == other.by_date
    }
}

/// `groupId::YYYY-MM-DD`, the date being the Monday the week starts with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub group_id: String,
    pub week_start: NaiveDate,
}

impl CacheKey {
    pub fn new<S: Into<String>>(group_id: S, week_start: NaiveDate) -> Self {
        Self {
            group_id: group_id.into(),
            week_start,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}",
            self.group_id,
            self.week_start.format("%Y-%m-%d")
        )
    }
}

impl Serialize for CacheKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
