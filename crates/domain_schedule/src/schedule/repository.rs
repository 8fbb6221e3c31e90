use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::{anyhow, Context};
use chrono::Utc;
use common_errors::errors::{CommonError, CommonErrorExt};
use domain_schedule_models::{CacheKey, RawLesson, WeekSnapshot};
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};

use crate::{
    ruz_api::ScheduleSource,
    time::{classify_week, NaiveDateExt, WeekClass},
};

use super::{
    inflight::{FetchOutcome, FetchResult, InFlightRegistry},
    mapping::group_week,
    mediator::{CacheLookup, CacheMediator, CachedWeek, Origin},
};

/// Why a week is being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Requested by a caller, either blocking or as a background revalidation
    Load { force: bool },
    /// Opportunistic adjacent-week fetch, never followed by further prefetches
    Prefetch,
}

pub struct ScheduleRepository {
    pub(crate) source: Arc<dyn ScheduleSource>,
    pub(crate) mediator: CacheMediator,
    pub(crate) in_flight: InFlightRegistry,
    pub(crate) revision: AtomicU64,
}

impl ScheduleRepository {
    pub async fn get_from_cache(&self, key: &CacheKey) -> Option<CacheLookup> {
        let lookup = self.mediator.get(key).await;
        match &lookup {
            Some(lookup) => debug!("Cache hit for {key} ({:?})", lookup.freshness),
            None => debug!("Cache miss for {key}"),
        }
        lookup
    }

    pub async fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.in_flight.contains(key).await
    }

    /// Fetch the week from the upstream, joining the pending fetch of the same key if any.
    ///
    /// The fetch runs on its own task: it completes and updates the cache even if
    /// every caller stops waiting for it.
    pub async fn fetch(self: &Arc<Self>, key: &CacheKey, force: bool) -> FetchResult {
        let this = Arc::clone(self);
        let owned_key = key.to_owned();
        let (pending, started) = self
            .in_flight
            .begin(key, move || this.run_fetch(owned_key, FetchMode::Load { force }))
            .await;
        if started {
            tokio::spawn(pending.clone());
        } else {
            debug!("Joined pending fetch of {key}");
        }
        pending.await
    }

    fn run_fetch(self: Arc<Self>, key: CacheKey, mode: FetchMode) -> BoxFuture<'static, FetchResult> {
        async move {
            let result = self
                .fetch_and_store(&key, mode)
                .await
                .map_err(|e| e.to_common_error());
            match (&result, mode) {
                (Ok(_), FetchMode::Load { .. }) => self.schedule_prefetches(&key).await,
                (Err(e), FetchMode::Prefetch) => warn!("Prefetch of {key} failed: {e}"),
                _ => (),
            }
            self.in_flight.end(&key).await;
            result
        }
        .boxed()
    }

    async fn fetch_and_store(&self, key: &CacheKey, mode: FetchMode) -> anyhow::Result<FetchOutcome> {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let week_end = key
            .week_start
            .with_days_offset(6)
            .ok_or_else(|| anyhow!(CommonError::user("Week is out of the supported date range")))?;
        debug!("Getting {key} from remote (revision {revision}, {mode:?})...");

        let lessons = self
            .source
            .schedule(&key.group_id, key.week_start, week_end)
            .await
            .with_context(|| format!("Error while getting {key} from remote"))?;
        let raw_lessons = lessons.into_iter().map(RawLesson::from).collect::<Vec<_>>();
        let snapshot = WeekSnapshot::new(group_week(raw_lessons));

        let previous = self.mediator.get(key).await;
        let (snapshot, changed) = match previous {
            Some(previous) if previous.week.snapshot.same_content(&snapshot) => {
                (previous.week.snapshot, false)
            }
            _ => (Arc::new(snapshot), true),
        };

        // the week class is evaluated at completion, a fetch may cross midnight on Sunday
        let forced = matches!(mode, FetchMode::Load { force: true });
        if changed && (classify_week(key.week_start) == WeekClass::Current || forced) {
            match self.mediator.persist(key, &snapshot, Utc::now()).await {
                Ok(()) => info!("Saved {key} to the durable tier"),
                Err(e) => warn!("{e:#}"),
            }
        }

        let week = CachedWeek {
            snapshot,
            revision,
            origin: Origin::Network,
        };
        self.mediator.insert_in_memory(key.to_owned(), week.clone()).await;
        Ok(FetchOutcome { week, changed })
    }

    async fn schedule_prefetches(self: &Arc<Self>, key: &CacheKey) {
        let mut offsets = vec![];
        if classify_week(key.week_start) == WeekClass::Current {
            offsets.push(-7);
        }
        offsets.push(7);

        for offset in offsets {
            let Some(week_start) = key.week_start.with_days_offset(offset) else {
                continue;
            };
            let adjacent = CacheKey::new(key.group_id.to_owned(), week_start);
            if !self.mediator.is_absent(&adjacent).await {
                continue;
            }
            let this = Arc::clone(self);
            let owned_key = adjacent.to_owned();
            if let Some(pending) = self
                .in_flight
                .begin_exclusive(&adjacent, move || this.run_fetch(owned_key, FetchMode::Prefetch))
                .await
            {
                info!("Prefetching {adjacent}");
                tokio::spawn(pending);
            }
        }
    }
}
