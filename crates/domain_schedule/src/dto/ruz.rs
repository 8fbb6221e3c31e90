//! Upstream (RUZ timetable API) response models and their normalization.
//!
//! The upstream schema is loose: the same value may come under different field names,
//! numbers may come instead of strings and `null` may come instead of anything.
//! All of that is handled here, the rest of the crate only sees
//! [GroupIdentity] and [RawLesson].

use domain_schedule_models::{GroupIdentity, RawLesson};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{
    de::{self, Visitor},
    Deserialize,
};
use serde_json::Value;

static GROUP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)group").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuzSearchResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group_oid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub oid: Option<String>,
    /// Group name
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    /// `group` | `person` | `auditorium` ...
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub r#type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default)]
    pub group: Option<Value>,
}

impl RuzSearchResult {
    /// A result is a group if its type/kind/category mentions "group"
    /// or if it carries a truthy `group` attribute.
    pub fn is_group(&self) -> bool {
        let category = first_non_empty([&self.r#type, &self.kind, &self.category]);
        GROUP_PATTERN.is_match(&category) || self.group.as_ref().is_some_and(is_truthy)
    }

    /// Returns `None` if the result has no usable identifier.
    /// The label falls back to the search `term` itself.
    pub fn to_group_identity(&self, term: &str) -> Option<GroupIdentity> {
        let id = first_non_empty([&self.id, &self.group_oid, &self.oid]);
        if id.is_empty() {
            return None;
        }
        let label = match first_non_empty([&self.label, &self.text]) {
            label if label.is_empty() => term.to_owned(),
            label => label,
        };
        Some(GroupIdentity { id, label })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuzLesson {
    #[serde(default, deserialize_with = "lenient_string")]
    pub discipline: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind_of_work: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lesson_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub begin_lesson: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_lesson: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lecturer: Option<String>,
    #[serde(default, rename = "lecturer_name", deserialize_with = "lenient_string")]
    pub lecturer_name: Option<String>,
    #[serde(default, rename = "lecturer_title", deserialize_with = "lenient_string")]
    pub lecturer_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lecturer_email: Option<String>,
    #[serde(default, rename = "lecturer_email", deserialize_with = "lenient_string")]
    pub lecturer_email_snake: Option<String>,
    /// Place
    #[serde(default, deserialize_with = "lenient_string")]
    pub auditorium: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub room: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
}

impl From<RuzLesson> for RawLesson {
    fn from(value: RuzLesson) -> Self {
        let teacher_email = match first_non_empty([&value.lecturer_email, &value.lecturer_email_snake]) {
            email if email.eq_ignore_ascii_case("null") => String::new(),
            email => email,
        };
        RawLesson {
            discipline: first_non_empty([&value.discipline]),
            kind: first_non_empty([&value.kind_of_work, &value.lesson_type]),
            begin: first_non_empty([&value.begin_lesson]),
            end: first_non_empty([&value.end_lesson]),
            teacher: first_non_empty([&value.lecturer, &value.lecturer_name, &value.lecturer_title]),
            teacher_title: first_non_empty([&value.lecturer_title, &value.lecturer_name]),
            room: first_non_empty([&value.auditorium, &value.room]),
            teacher_email,
            date: first_non_empty([&value.date]),
        }
    }
}

/// First value that is present and not blank, trimmed. Empty string if there is none.
fn first_non_empty<const N: usize>(values: [&Option<String>; N]) -> String {
    values
        .into_iter()
        .flatten()
        .map(|it| it.trim())
        .find(|it| !it.is_empty())
        .unwrap_or_default()
        .to_owned()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|it| it != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

struct LenientStringVisitor;

impl<'de> Visitor<'de> for LenientStringVisitor {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string, a number, a boolean or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(LenientStringVisitor)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_any(LenientStringVisitor)
}
