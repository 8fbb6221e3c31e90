use std::{collections::HashMap, sync::Arc};

use anyhow::{bail, ensure, Context};
use common_errors::errors::CommonError;
use domain_schedule_models::GroupIdentity;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;

use crate::ruz_api::ScheduleSource;

static SPACES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Resolves search terms into group identities.
///
/// Resolved terms are memoized for the lifetime of the repository, without expiration.
pub struct GroupIdRepository {
    pub(crate) source: Arc<dyn ScheduleSource>,
    pub(crate) memo: Mutex<HashMap<String, GroupIdentity>>,
}

impl GroupIdRepository {
    /// Resolve `term` to the first search result classified as a group.
    ///
    /// With `force` the memo is bypassed and overwritten with the fresh result.
    pub async fn resolve(&self, term: &str, force: bool) -> anyhow::Result<GroupIdentity> {
        let term = normalize_term(term);
        ensure!(!term.is_empty(), CommonError::user("Group name must not be empty"));

        if !force {
            if let Some(identity) = self.memo.lock().await.get(&term) {
                debug!("Got group '{term}' from memo");
                return Ok(identity.to_owned());
            }
        }

        debug!("Resolving group '{term}' on remote...");
        let results = self
            .source
            .search(&term)
            .await
            .with_context(|| format!("Error while resolving group '{term}'"))?;
        let Some(identity) = results
            .iter()
            .filter(|result| result.is_group())
            .find_map(|result| result.to_group_identity(&term))
        else {
            bail!(CommonError::not_found(format!("Group '{term}' not found")));
        };

        self.memo
            .lock()
            .await
            .insert(term, identity.to_owned());
        Ok(identity)
    }
}

fn normalize_term(term: &str) -> String {
    SPACES_PATTERN.replace_all(term.trim(), " ").into_owned()
}
