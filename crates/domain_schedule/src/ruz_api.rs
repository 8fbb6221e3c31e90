use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use common_errors::errors::CommonError;
use log::debug;
use reqwest::{redirect::Policy, Client, ClientBuilder};

use crate::{
    config::RuzApiConfig,
    dto::ruz::{RuzLesson, RuzSearchResult},
};

/// Source of raw timetable data.
///
/// The production implementation is [RuzApi], tests substitute their own.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Free-text search over groups, persons and rooms.
    async fn search(&self, term: &str) -> anyhow::Result<Vec<RuzSearchResult>>;

    /// Lessons of the group for the inclusive `start..=finish` range.
    async fn schedule(
        &self,
        group_id: &str,
        start: NaiveDate,
        finish: NaiveDate,
    ) -> anyhow::Result<Vec<RuzLesson>>;
}

pub struct RuzApi {
    client: Client,
    config: RuzApiConfig,
}

impl RuzApi {
    pub fn new(client: Client, config: RuzApiConfig) -> Self {
        Self { client, config }
    }

    /// Build the http client used to talk to the upstream.
    pub fn create_http_client(config: &RuzApiConfig) -> anyhow::Result<Client> {
        ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .redirect(Policy::none())
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .connect_timeout(std::time::Duration::from_millis(config.connect_timeout_ms))
            .pool_max_idle_per_host(3)
            .build()
            .map_err(|e| anyhow!(CommonError::internal(e)))
            .with_context(|| "Error while building http client")
    }

    fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.config.date_format).to_string()
    }
}

#[async_trait]
impl ScheduleSource for RuzApi {
    async fn search(&self, term: &str) -> anyhow::Result<Vec<RuzSearchResult>> {
        let base_url = &self.config.base_url;
        debug!("Searching '{term}' on remote...");
        self.client
            .get(format!("{base_url}/search"))
            .query(&[("term", term)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| anyhow!(CommonError::gateway(e)))
            .with_context(|| "Error while executing a search request to the timetable API")?
            .json::<Vec<RuzSearchResult>>()
            .await
            .map_err(|e| anyhow!(CommonError::internal(e)))
            .with_context(|| "Error while deserializing search results")
    }

    async fn schedule(
        &self,
        group_id: &str,
        start: NaiveDate,
        finish: NaiveDate,
    ) -> anyhow::Result<Vec<RuzLesson>> {
        let base_url = &self.config.base_url;
        let start = self.format_date(start);
        let finish = self.format_date(finish);
        let lng = self.config.lng.to_string();
        debug!("Getting schedule of group {group_id} for {start}..{finish} from remote...");
        self.client
            .get(format!("{base_url}/schedule/group/{group_id}"))
            .query(&[("start", start), ("finish", finish), ("lng", lng)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| anyhow!(CommonError::gateway(e)))
            .with_context(|| "Error while executing a schedule request to the timetable API")?
            .json::<Vec<RuzLesson>>()
            .await
            .map_err(|e| anyhow!(CommonError::internal(e)))
            .with_context(|| "Error while deserializing schedule response")
    }
}
