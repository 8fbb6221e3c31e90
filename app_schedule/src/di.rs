use anyhow::Context;
use domain_schedule::{
    config::{CacheConfig, RuzApiConfig},
    di::create_schedule_cache,
};
use log::info;

use crate::AppSchedule;

pub struct AppComponent;

impl AppComponent {
    pub fn create_app() -> anyhow::Result<AppSchedule> {
        let cache_config = CacheConfig::default();
        let api_config = RuzApiConfig::default();
        info!(
            "Timetable API at {}, durable cache at {}",
            api_config.base_url,
            cache_config.cache_dir.display()
        );

        let schedule_cache = create_schedule_cache(&cache_config, api_config)
            .with_context(|| "DI error while creating schedule cache")?;

        Ok(AppSchedule { schedule_cache })
    }
}
