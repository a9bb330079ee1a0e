use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Active,
    #[default]
    Private,
    Closed,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobLocation {
    Remote,
    Hybrid,
    Onsite,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum JobTiming {
    FullTime,
    PartTime,
    Contract,
}

/// Raw `jobs` row. Enum columns and the `CHAR(36)` id are parsed in [`Job::try_from`].
#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub experience_required: i32,
    pub status: String,
    pub location: String,
    pub timing: String,
    pub about: String,
    pub responsibilities: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": "0b6f2d0e-6a0e-4a53-9d9e-2f3e0c1f7a11",
        "title": "Backend Engineer",
        "category": "Engineering",
        "experience_required": 3,
        "status": "active",
        "location": "remote",
        "timing": "full-time",
        "about": "Build and run our APIs.",
        "responsibilities": "Design services; review code.",
        "created_at": "2026-01-05 09:30:00",
        "updated_at": "2026-01-05 09:30:00",
        "last_date": null
    })
)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub experience_required: i32,
    pub status: JobStatus,
    pub location: JobLocation,
    pub timing: JobTiming,
    pub about: String,
    pub responsibilities: String,
    #[serde(with = "datetime_format")]
    #[schema(value_type = String, example = "2026-01-05 09:30:00")]
    pub created_at: NaiveDateTime,
    #[serde(with = "datetime_format")]
    #[schema(value_type = String, example = "2026-01-05 09:30:00")]
    pub updated_at: NaiveDateTime,
    #[serde(with = "datetime_format::option")]
    #[schema(value_type = Option<String>, nullable = true)]
    pub last_date: Option<NaiveDateTime>,
}

fn decode_err<E>(column: &str, e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    }
}

impl TryFrom<JobRow> for Job {
    type Error = sqlx::Error;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: Uuid::parse_str(&row.id).map_err(|e| decode_err("id", e))?,
            title: row.title,
            category: row.category,
            experience_required: row.experience_required,
            status: JobStatus::from_str(&row.status).map_err(|e| decode_err("status", e))?,
            location: JobLocation::from_str(&row.location).map_err(|e| decode_err("location", e))?,
            timing: JobTiming::from_str(&row.timing).map_err(|e| decode_err("timing", e))?,
            about: row.about,
            responsibilities: row.responsibilities,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_date: row.last_date,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewJob {
    #[validate(length(min = 1, max = 255, message = "Field cannot be empty"))]
    #[schema(example = "Backend Engineer")]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Field cannot be empty"))]
    #[schema(example = "Engineering")]
    pub category: String,
    #[validate(range(min = 0, message = "Must not be negative"))]
    #[schema(example = 3)]
    pub experience_required: i32,
    /// Defaults to `private`.
    pub status: Option<JobStatus>,
    pub location: JobLocation,
    pub timing: JobTiming,
    #[validate(length(min = 1, message = "Field cannot be empty"))]
    pub about: String,
    #[validate(length(min = 1, message = "Field cannot be empty"))]
    pub responsibilities: String,
    #[serde(default, with = "datetime_format::option")]
    #[schema(value_type = Option<String>, example = "2026-03-31 23:59:59")]
    pub last_date: Option<NaiveDateTime>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateJob {
    #[validate(length(min = 1, max = 255, message = "Field cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Field cannot be empty"))]
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Must not be negative"))]
    pub experience_required: Option<i32>,
    pub status: Option<JobStatus>,
    pub location: Option<JobLocation>,
    pub timing: Option<JobTiming>,
    #[validate(length(min = 1, message = "Field cannot be empty"))]
    pub about: Option<String>,
    #[validate(length(min = 1, message = "Field cannot be empty"))]
    pub responsibilities: Option<String>,
    /// Absent leaves the deadline alone; `null` clears it.
    #[serde(default, deserialize_with = "datetime_format::nullable::deserialize")]
    #[schema(value_type = Option<String>)]
    pub last_date: Option<Option<NaiveDateTime>>,
}

impl UpdateJob {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.experience_required.is_none()
            && self.status.is_none()
            && self.location.is_none()
            && self.timing.is_none()
            && self.about.is_none()
            && self.responsibilities.is_none()
            && self.last_date.is_none()
    }
}

/// `YYYY-MM-DD HH:MM:SS` on the way out; a few common shapes on the way in.
pub mod datetime_format {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(FORMAT).to_string())
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}"))),
                None => Ok(None),
            }
        }
    }

    /// Wraps a present field in `Some`, so `null` becomes `Some(None)`.
    /// Pair with `#[serde(default)]` to keep absent fields as `None`.
    pub mod nullable {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<Option<NaiveDateTime>>, D::Error> {
            super::option::deserialize(d).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> JobRow {
        let ts = datetime_format::parse("2026-01-05 09:30:00").unwrap();
        JobRow {
            id: "0b6f2d0e-6a0e-4a53-9d9e-2f3e0c1f7a11".into(),
            title: "Backend Engineer".into(),
            category: "Engineering".into(),
            experience_required: 3,
            status: "active".into(),
            location: "hybrid".into(),
            timing: "part-time".into(),
            about: "APIs".into(),
            responsibilities: "Ship".into(),
            created_at: ts,
            updated_at: ts,
            last_date: None,
        }
    }

    #[test]
    fn timing_uses_hyphenated_names() {
        assert_eq!(JobTiming::FullTime.to_string(), "full-time");
        assert_eq!(JobTiming::from_str("part-time").unwrap(), JobTiming::PartTime);
        assert!(JobTiming::from_str("fulltime").is_err());
        assert_eq!(serde_json::to_value(JobTiming::Contract).unwrap(), json!("contract"));
    }

    #[test]
    fn status_defaults_to_private() {
        assert_eq!(JobStatus::default(), JobStatus::Private);
    }

    #[test]
    fn row_converts_and_serializes_timestamps() {
        let job = Job::try_from(row()).unwrap();
        assert_eq!(job.location, JobLocation::Hybrid);
        let body = serde_json::to_value(&job).unwrap();
        assert_eq!(body["created_at"], "2026-01-05 09:30:00");
        assert_eq!(body["timing"], "part-time");
        assert!(body["last_date"].is_null());
    }

    #[test]
    fn row_with_bad_enum_is_rejected() {
        let mut bad = row();
        bad.location = "moon".into();
        assert!(Job::try_from(bad).is_err());
    }

    #[test]
    fn new_job_accepts_date_only_last_date() {
        let job: NewJob = serde_json::from_value(json!({
            "title": "Designer",
            "category": "Design",
            "experience_required": 1,
            "location": "onsite",
            "timing": "contract",
            "about": "Make things pretty",
            "responsibilities": "Figma",
            "last_date": "2026-03-31"
        }))
        .unwrap();
        assert_eq!(job.status, None);
        assert_eq!(
            job.last_date.unwrap().format(datetime_format::FORMAT).to_string(),
            "2026-03-31 00:00:00"
        );
        assert!(job.validate().is_ok());
    }

    #[test]
    fn update_job_emptiness() {
        assert!(UpdateJob::default().is_empty());
        let update: UpdateJob = serde_json::from_value(json!({ "status": "closed" })).unwrap();
        assert!(!update.is_empty());
        assert_eq!(update.status, Some(JobStatus::Closed));
    }

    #[test]
    fn update_job_tells_null_last_date_from_absent() {
        let absent: UpdateJob = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert_eq!(absent.last_date, None);

        let cleared: UpdateJob = serde_json::from_value(json!({ "last_date": null })).unwrap();
        assert_eq!(cleared.last_date, Some(None));
        assert!(!cleared.is_empty());

        let set: UpdateJob = serde_json::from_value(json!({ "last_date": "2026-04-01" })).unwrap();
        assert_eq!(set.last_date, Some(datetime_format::parse("2026-04-01 00:00:00")));
    }

    #[test]
    fn new_job_rejects_unknown_location() {
        let res = serde_json::from_value::<NewJob>(json!({
            "title": "x", "category": "y", "experience_required": 0,
            "location": "mars", "timing": "contract", "about": "a", "responsibilities": "b"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn new_job_validation_catches_empty_and_negative() {
        let job = NewJob {
            title: String::new(),
            category: "c".into(),
            experience_required: -1,
            status: None,
            location: JobLocation::Remote,
            timing: JobTiming::FullTime,
            about: "a".into(),
            responsibilities: "r".into(),
            last_date: None,
        };
        let errs = job.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("experience_required"));
    }
}
