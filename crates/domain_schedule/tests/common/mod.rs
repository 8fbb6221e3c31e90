#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common_errors::errors::CommonError;
use common_persistent_cache::PersistentCache;
use domain_schedule::{
    config::CacheConfig,
    dto::ruz::{RuzLesson, RuzSearchResult},
    ruz_api::ScheduleSource,
    schedule::mapping::merge_day_lessons,
    time::NaiveDateExt,
    usecases::ScheduleCache,
};
use domain_schedule_models::{CacheKey, RawLesson, WeekSnapshot};
use tempfile::TempDir;
use tokio::sync::Semaphore;

pub const GROUP_ID: &str = "42";
pub const OTHER_TERM: &str = "пи21-2";
pub const OTHER_GROUP_ID: &str = "43";

/// In-process upstream: one lesson on every Monday, counting requests per week.
pub struct FakeSource {
    discipline: Mutex<String>,
    fail: AtomicBool,
    gate: Option<Semaphore>,
    search_calls: AtomicUsize,
    schedule_calls: Mutex<HashMap<NaiveDate, usize>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            discipline: Mutex::new("Математика".to_owned()),
            fail: AtomicBool::new(false),
            gate: None,
            search_calls: AtomicUsize::new(0),
            schedule_calls: Mutex::new(HashMap::new()),
        }
    }

    /// Every schedule request waits for a permit from [FakeSource::open_gate].
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn open_gate(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn set_discipline(&self, discipline: &str) {
        *self.discipline.lock().unwrap() = discipline.to_owned();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn schedule_calls(&self, week_start: NaiveDate) -> usize {
        self.schedule_calls
            .lock()
            .unwrap()
            .get(&week_start)
            .copied()
            .unwrap_or_default()
    }

    pub fn lesson_for(&self, week_start: NaiveDate) -> RuzLesson {
        RuzLesson {
            discipline: Some(self.discipline.lock().unwrap().to_owned()),
            kind_of_work: Some("Лекции".to_owned()),
            begin_lesson: Some("08:30".to_owned()),
            end_lesson: Some("10:00".to_owned()),
            lecturer: Some("Иванов И.И.".to_owned()),
            auditorium: Some("101".to_owned()),
            date: Some(week_start.format("%Y.%m.%d").to_string()),
            ..Default::default()
        }
    }

    /// The snapshot this source currently produces for `week_start`.
    pub fn snapshot_for(&self, week_start: NaiveDate) -> WeekSnapshot {
        let day = merge_day_lessons(vec![RawLesson::from(self.lesson_for(week_start))]);
        let mut by_date = BTreeMap::new();
        by_date.insert(week_start.date_key(), day);
        WeekSnapshot::new(by_date)
    }
}

#[async_trait]
impl ScheduleSource for FakeSource {
    async fn search(&self, term: &str) -> anyhow::Result<Vec<RuzSearchResult>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let person = RuzSearchResult {
            id: Some("7".to_owned()),
            label: Some("Иванов И.И.".to_owned()),
            r#type: Some("person".to_owned()),
            ..Default::default()
        };
        if term == "нет такой" {
            return Ok(vec![person]);
        }
        let group = RuzSearchResult {
            id: Some(if term == OTHER_TERM { OTHER_GROUP_ID } else { GROUP_ID }.to_owned()),
            label: Some(term.to_uppercase()),
            r#type: Some("group".to_owned()),
            ..Default::default()
        };
        Ok(vec![person, group])
    }

    async fn schedule(
        &self,
        _group_id: &str,
        start: NaiveDate,
        _finish: NaiveDate,
    ) -> anyhow::Result<Vec<RuzLesson>> {
        *self.schedule_calls.lock().unwrap().entry(start).or_default() += 1;
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!(CommonError::gateway("upstream is down")));
        }
        Ok(vec![self.lesson_for(start)])
    }
}

pub struct TestContext {
    pub source: Arc<FakeSource>,
    pub cache: ScheduleCache,
    pub dir: TempDir,
}

impl TestContext {
    pub fn new(source: FakeSource) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::with_dir(source, dir)
    }

    pub fn with_dir(source: FakeSource, dir: TempDir) -> Self {
        let source = Arc::new(source);
        let config = CacheConfig::default().with_cache_dir(dir.path().to_path_buf());
        let cache = ScheduleCache::with_source(source.clone(), &config);
        Self { source, cache, dir }
    }

    pub fn key(&self, week_start: NaiveDate) -> CacheKey {
        CacheKey::new(GROUP_ID, week_start)
    }

    pub fn durable_path(&self, week_start: NaiveDate) -> std::path::PathBuf {
        self.dir
            .path()
            .join(GROUP_ID)
            .join(format!("{}.cache", week_start.date_key()))
    }

    /// Saved time of the durable record, in milliseconds.
    pub fn durable_timestamp(&self, week_start: NaiveDate) -> Option<i64> {
        let content = std::fs::read_to_string(self.durable_path(week_start)).ok()?;
        let record: serde_json::Value = serde_json::from_str(&content).ok()?;
        record["timestamp"].as_i64()
    }

    /// Wait until no upstream request is running for any of `week_starts`.
    pub async fn settle(&self, week_starts: &[NaiveDate]) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let mut busy = false;
                for week_start in week_starts {
                    busy |= self.cache.is_fetching(&self.key(*week_start)).await;
                }
                if !busy {
                    break;
                }
            }
        })
        .await
        .unwrap();
    }
}

/// Write a durable record for `week_start` saved `age` ago.
pub async fn seed_durable(dir: &TempDir, week_start: NaiveDate, snapshot: &WeekSnapshot, age: chrono::Duration) {
    let mut persistent_cache = PersistentCache::new(dir.path().to_path_buf());
    let record = serde_json::json!({
        "timestamp": (Utc::now() - age).timestamp_millis(),
        "data": snapshot,
    });
    persistent_cache
        .insert(format!("{GROUP_ID}/{}.cache", week_start.date_key()), &record)
        .await
        .unwrap();
}
