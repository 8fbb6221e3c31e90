use std::collections::BTreeMap;

use actix_web::{
    web::{Data, Json, Path, Query},
    HttpResponse, Responder,
};
use anyhow::anyhow;
use chrono::NaiveDate;
use common_errors::errors::CommonError;
use domain_schedule::usecases::LoadOptions;
use domain_schedule_models::{CacheKey, DaySchedule, GroupIdentity};
use serde::{Deserialize, Serialize};

use crate::{AppSchedule, AppScheduleError};

/// Health check method
/// Returns `200 OK` with text `"I'm alive"` if service is alive
#[actix_web::get("v1/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("I'm alive :)")
}

#[derive(Deserialize)]
struct GroupQuery {
    #[serde(default)]
    force: bool,
}

#[actix_web::get("v1/group/{term}")]
async fn get_group_v1(
    path: Path<String>,
    query: Query<GroupQuery>,
    state: Data<AppSchedule>,
) -> Result<Json<GroupIdentity>, AppScheduleError> {
    let term = path.into_inner();
    let group = if query.force {
        state.schedule_cache.resolve_group(&term).await?
    } else {
        state.schedule_cache.resolve_group_cached(&term).await?
    };
    Ok(Json(group))
}

#[derive(Deserialize)]
struct WeekQuery {
    #[serde(default)]
    force: bool,
    #[serde(default = "default_apply")]
    apply: bool,
}

fn default_apply() -> bool {
    true
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WeekResponse {
    id: String,
    label: String,
    cache_key: CacheKey,
    week_start: String,
    by_date: BTreeMap<String, DaySchedule>,
}

#[actix_web::get("v1/group/{term}/week/{date}")]
async fn get_week_v1(
    path: Path<(String, String)>,
    query: Query<WeekQuery>,
    state: Data<AppSchedule>,
) -> Result<Json<WeekResponse>, AppScheduleError> {
    let (term, date) = path.into_inner();
    let date = parse_date(&date)?;
    let options = LoadOptions {
        force: query.force,
        apply_to_view: query.apply,
    };
    let loaded = state.schedule_cache.load_week(&term, date, options).await?;
    Ok(Json(WeekResponse {
        id: loaded.group.id,
        label: loaded.group.label,
        week_start: loaded.cache_key.week_start.format("%Y-%m-%d").to_string(),
        cache_key: loaded.cache_key,
        by_date: loaded.snapshot.by_date.to_owned(),
    }))
}

#[derive(Serialize)]
struct DayResponse {
    date: String,
    loading: bool,
    /// `null` until the week of `date` is loaded
    lessons: Option<DaySchedule>,
}

#[actix_web::get("v1/day/{date}")]
async fn get_day_v1(
    path: Path<String>,
    state: Data<AppSchedule>,
) -> Result<Json<DayResponse>, AppScheduleError> {
    let date = parse_date(&path.into_inner())?;
    Ok(Json(DayResponse {
        date: date.format("%Y-%m-%d").to_string(),
        loading: state.schedule_cache.is_loading_for(date).await,
        lessons: state.schedule_cache.get_lessons_for(date).await,
    }))
}

fn parse_date(value: &str) -> Result<NaiveDate, AppScheduleError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppScheduleError::from(anyhow!(CommonError::user(format!("Invalid date '{value}': {e}")))))
}
