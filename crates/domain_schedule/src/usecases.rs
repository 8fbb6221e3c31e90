use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use domain_schedule_models::{CacheKey, DaySchedule, GroupIdentity, WeekSnapshot};
use log::{debug, warn};
use tokio::sync::broadcast;

use crate::{
    id::repository::GroupIdRepository,
    schedule::{
        mediator::CacheLookup,
        policy::{decide, Decision},
        repository::ScheduleRepository,
    },
    time::{classify_week, NaiveDateExt},
    view::ScheduleView,
};

/// Options of [ScheduleCache::load_week].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Ignore cached data and block on the upstream
    pub force: bool,
    /// Hand the loaded week to the visible state
    pub apply_to_view: bool,
}

/// Answer of [ScheduleCache::load_week].
#[derive(Debug, Clone)]
pub struct LoadedWeek {
    pub group: GroupIdentity,
    pub cache_key: CacheKey,
    pub snapshot: Arc<WeekSnapshot>,
}

/// # ScheduleCache
///
/// Stale-while-revalidate cache of group timetables, one week per entry.
///
/// Weeks are kept in two tiers: a bounded in-memory LRU for every week touched,
/// and JSON files for the current week (and forcibly refreshed ones). A week older
/// than the soft TTL is served immediately and refreshed in the background, a week
/// older than the hard TTL is treated as absent. Past weeks are never revalidated.
/// Concurrent requests for the same week share one upstream request.
///
/// The instance is created once per application, see [crate::di].
pub struct ScheduleCache {
    pub(crate) group_id_repository: Arc<GroupIdRepository>,
    pub(crate) schedule_repository: Arc<ScheduleRepository>,
    pub(crate) view: Arc<ScheduleView>,
}

impl ScheduleCache {
    /// Resolve `term` into a group identity, using the session memo.
    pub async fn resolve_group_cached(&self, term: &str) -> anyhow::Result<GroupIdentity> {
        self.group_id_repository.resolve(term, false).await
    }

    /// Resolve `term` on the upstream even if it was resolved before.
    pub async fn resolve_group(&self, term: &str) -> anyhow::Result<GroupIdentity> {
        self.group_id_repository.resolve(term, true).await
    }

    /// Load the week containing `date` for the group found by `term`.
    ///
    /// Fails only if the group cannot be resolved or a blocking fetch fails
    /// while there is no usable cached week.
    pub async fn load_week(
        &self,
        term: &str,
        date: NaiveDate,
        options: LoadOptions,
    ) -> anyhow::Result<LoadedWeek> {
        debug!("ScheduleCache::load_week(term='{term}', date={date}, {options:?})");
        let group = self
            .group_id_repository
            .resolve(term, options.force)
            .await
            .with_context(|| "Error while resolving group")?;
        let cache_key = CacheKey::new(group.id.to_owned(), date.week_start());
        if options.apply_to_view {
            self.view.select_group(&group.id).await;
        }

        let cached = self.schedule_repository.get_from_cache(&cache_key).await;
        if let (Some(cached), true) = (&cached, options.apply_to_view) {
            // optimistic display before any network activity
            self.apply_to_view(&cache_key, cached).await;
        }

        let decision = decide(
            classify_week(cache_key.week_start),
            cached.as_ref().map(|it| (it.freshness, it.week.origin)),
            options.force,
        );
        debug!("Decision for {cache_key}: {decision:?}");

        let snapshot = match (decision, cached) {
            (Decision::Serve, Some(cached)) => cached.week.snapshot,
            (Decision::ServeAndRevalidate, Some(cached)) => {
                self.revalidate_in_background(cache_key.to_owned(), options.apply_to_view);
                cached.week.snapshot
            }
            (_, cached) => self.load_from_remote(&cache_key, cached, options).await?,
        };
        Ok(LoadedWeek {
            group,
            cache_key,
            snapshot,
        })
    }

    /// Lessons of `date` in the visible state.
    ///
    /// `None` means the week has not been loaded yet, which is not the same as a day without lessons.
    pub async fn get_lessons_for(&self, date: NaiveDate) -> Option<DaySchedule> {
        self.view.lessons_for(date).await
    }

    /// `true` while a blocking load of the week containing `date` is running.
    pub async fn is_loading_for(&self, date: NaiveDate) -> bool {
        self.view.is_loading_for(date).await
    }

    /// Receive the key of every week whose visible content changed.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.view.subscribe()
    }

    /// `true` while an upstream request for `key` is running, in the foreground or not.
    pub async fn is_fetching(&self, key: &CacheKey) -> bool {
        self.schedule_repository.is_in_flight(key).await
    }

    async fn load_from_remote(
        &self,
        cache_key: &CacheKey,
        cached: Option<CacheLookup>,
        options: LoadOptions,
    ) -> anyhow::Result<Arc<WeekSnapshot>> {
        let loading = options
            .apply_to_view
            .then(|| self.view.start_loading(cache_key));
        let result = self
            .schedule_repository
            .fetch(cache_key, options.force)
            .await;
        drop(loading);

        match (result, cached) {
            (Ok(outcome), _) => {
                if options.apply_to_view {
                    self.view
                        .apply(cache_key, outcome.week.snapshot.to_owned(), outcome.week.revision)
                        .await;
                }
                Ok(outcome.week.snapshot)
            }
            (Err(e), Some(cached)) => {
                // full error description is in the error message
                warn!("Serving cached {cache_key} after failed refresh: {e}");
                Ok(cached.week.snapshot)
            }
            (Err(e), None) => Err(anyhow!(e)).with_context(|| "Error while loading week from remote"),
        }
    }

    fn revalidate_in_background(&self, cache_key: CacheKey, apply_to_view: bool) {
        let schedule_repository = Arc::clone(&self.schedule_repository);
        let view = Arc::clone(&self.view);
        tokio::spawn(async move {
            match schedule_repository.fetch(&cache_key, false).await {
                Ok(outcome) if apply_to_view => {
                    view.apply(&cache_key, outcome.week.snapshot, outcome.week.revision)
                        .await;
                }
                Ok(_) => (),
                Err(e) => warn!("Background revalidation of {cache_key} failed: {e}"),
            }
        });
    }

    async fn apply_to_view(&self, cache_key: &CacheKey, cached: &CacheLookup) {
        self.view
            .apply(cache_key, cached.week.snapshot.to_owned(), cached.week.revision)
            .await;
    }
}
