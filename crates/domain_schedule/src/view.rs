use std::{
    collections::HashMap,
    sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;
use domain_schedule_models::{CacheKey, DaySchedule, WeekSnapshot};
use log::debug;
use tokio::sync::{broadcast, Mutex};

use crate::time::NaiveDateExt;

/// Visible schedule state of the presentation layer.
///
/// Holds the weeks of one group only. Every week remembers the revision of the fetch
/// that produced it, an older fetch finishing late can never replace newer content.
pub struct ScheduleView {
    state: Mutex<ViewState>,
    /// Number of blocking loads per week, released by [LoadingGuard]
    loading: SyncMutex<HashMap<CacheKey, usize>>,
    events: broadcast::Sender<CacheKey>,
}

#[derive(Default)]
struct ViewState {
    group_id: Option<String>,
    weeks: HashMap<NaiveDate, AppliedWeek>,
}

struct AppliedWeek {
    snapshot: Arc<WeekSnapshot>,
    revision: u64,
}

impl ScheduleView {
    pub fn new(events_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(events_capacity.max(1));
        Self {
            state: Mutex::new(ViewState::default()),
            loading: SyncMutex::new(HashMap::new()),
            events,
        }
    }

    /// Switch the view to `group_id`, dropping everything shown for another group.
    pub async fn select_group(&self, group_id: &str) {
        let mut state = self.state.lock().await;
        if state.group_id.as_deref() == Some(group_id) {
            return;
        }
        debug!("View switched to group {group_id}");
        state.group_id = Some(group_id.to_owned());
        state.weeks.clear();
    }

    /// Show `snapshot` for the week of `key`.
    ///
    /// Returns `true` and notifies subscribers only if the revision is newer than the shown
    /// one and the content differs. A newer revision with the same content is remembered silently.
    pub async fn apply(&self, key: &CacheKey, snapshot: Arc<WeekSnapshot>, revision: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.group_id.as_deref() != Some(key.group_id.as_str()) {
            return false;
        }
        match state.weeks.get_mut(&key.week_start) {
            Some(shown) if revision <= shown.revision => return false,
            Some(shown) if shown.snapshot.same_content(&snapshot) => {
                shown.revision = revision;
                return false;
            }
            _ => {}
        }
        state
            .weeks
            .insert(key.week_start, AppliedWeek { snapshot, revision });
        drop(state);
        // no subscribers is fine
        let _ = self.events.send(key.to_owned());
        true
    }

    /// Mark `key` as loading until the returned guard is dropped.
    pub fn start_loading(&self, key: &CacheKey) -> LoadingGuard<'_> {
        *self.loading_counters().entry(key.to_owned()).or_default() += 1;
        LoadingGuard {
            view: self,
            key: key.to_owned(),
        }
    }

    fn finish_loading(&self, key: &CacheKey) {
        let mut loading = self.loading_counters();
        if let Some(counter) = loading.get_mut(key) {
            *counter -= 1;
            if *counter == 0 {
                loading.remove(key);
            }
        }
    }

    fn loading_counters(&self) -> MutexGuard<'_, HashMap<CacheKey, usize>> {
        self.loading.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lessons of `date`, or `None` if its week has not been loaded yet.
    /// A loaded week without lessons on `date` yields an empty [DaySchedule].
    pub async fn lessons_for(&self, date: NaiveDate) -> Option<DaySchedule> {
        let state = self.state.lock().await;
        state.weeks.get(&date.week_start()).map(|week| {
            week.snapshot
                .by_date
                .get(&date.date_key())
                .cloned()
                .unwrap_or_default()
        })
    }

    /// `true` while a blocking load of the selected group's week containing `date` runs.
    pub async fn is_loading_for(&self, date: NaiveDate) -> bool {
        let Some(group_id) = self.state.lock().await.group_id.to_owned() else {
            return false;
        };
        self.loading_counters()
            .contains_key(&CacheKey::new(group_id, date.week_start()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.events.subscribe()
    }
}

/// Loading mark of one week, see [ScheduleView::start_loading].
#[must_use]
pub struct LoadingGuard<'a> {
    view: &'a ScheduleView,
    key: CacheKey,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.view.finish_loading(&self.key);
    }
}
