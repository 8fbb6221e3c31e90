use std::{
    collections::HashMap,
    sync::{atomic::AtomicU64, Arc},
};

use tokio::sync::Mutex;

use crate::{
    config::{CacheConfig, RuzApiConfig},
    id::repository::GroupIdRepository,
    ruz_api::{RuzApi, ScheduleSource},
    schedule::{inflight::InFlightRegistry, mediator::CacheMediator, repository::ScheduleRepository},
    usecases::ScheduleCache,
    view::ScheduleView,
};

const VIEW_EVENTS_CAPACITY: usize = 64;

impl GroupIdRepository {
    pub fn new(source: Arc<dyn ScheduleSource>) -> Self {
        Self {
            source,
            memo: Mutex::new(HashMap::new()),
        }
    }
}

impl ScheduleRepository {
    pub fn new(source: Arc<dyn ScheduleSource>, config: &CacheConfig) -> Self {
        Self {
            source,
            mediator: CacheMediator::new(config),
            in_flight: InFlightRegistry::default(),
            revision: AtomicU64::new(0),
        }
    }
}

impl ScheduleCache {
    pub fn new(
        group_id_repository: Arc<GroupIdRepository>,
        schedule_repository: Arc<ScheduleRepository>,
        view: Arc<ScheduleView>,
    ) -> Self {
        Self {
            group_id_repository,
            schedule_repository,
            view,
        }
    }

    /// Wire the whole cache around `source`.
    pub fn with_source(source: Arc<dyn ScheduleSource>, config: &CacheConfig) -> Self {
        Self::new(
            Arc::new(GroupIdRepository::new(Arc::clone(&source))),
            Arc::new(ScheduleRepository::new(source, config)),
            Arc::new(ScheduleView::new(VIEW_EVENTS_CAPACITY)),
        )
    }
}

/// Create the production cache talking to the timetable API.
pub fn create_schedule_cache(
    cache_config: &CacheConfig,
    api_config: RuzApiConfig,
) -> anyhow::Result<ScheduleCache> {
    let client = RuzApi::create_http_client(&api_config)?;
    let source: Arc<dyn ScheduleSource> = Arc::new(RuzApi::new(client, api_config));
    Ok(ScheduleCache::with_source(source, cache_config))
}
