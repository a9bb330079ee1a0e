use chrono::Utc;
use sqlx::{Executor, MySql, MySqlPool};
use tracing::debug;
use uuid::Uuid;

use crate::{
    model::job::{Job, JobLocation, JobRow, JobStatus, JobTiming, NewJob, UpdateJob},
    utils::db_utils::{UpdateBuilder, execute_update},
};

const JOB_COLUMNS: &str = "id, title, category, experience_required, status, location, timing, \
                           about, responsibilities, created_at, updated_at, last_date";

#[derive(Debug, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub location: Option<JobLocation>,
    pub timing: Option<JobTiming>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl JobFilter {
    /// WHERE clause plus its positional string bindings.
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut bindings = Vec::new();

        if let Some(status) = self.status {
            conditions.push("status = ?");
            bindings.push(status.to_string());
        }

        if let Some(location) = self.location {
            conditions.push("location = ?");
            bindings.push(location.to_string());
        }

        if let Some(timing) = self.timing {
            conditions.push("timing = ?");
            bindings.push(timing.to_string());
        }

        if let Some(category) = &self.category {
            conditions.push("category = ?");
            bindings.push(category.clone());
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push("(title LIKE ? OR category LIKE ? OR about LIKE ?)");
            let like = format!("%{search}%");
            bindings.push(like.clone());
            bindings.push(like.clone());
            bindings.push(like);
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (clause, bindings)
    }
}

pub async fn list(
    pool: &MySqlPool,
    filter: &JobFilter,
    limit: u32,
    offset: u32,
) -> Result<(Vec<Job>, i64), sqlx::Error> {
    let (where_clause, bindings) = filter.where_clause();

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM jobs {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting jobs");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {JOB_COLUMNS} FROM jobs {where_clause} ORDER BY created_at DESC, id LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, limit, offset, "Fetching jobs");

    let mut data_query = sqlx::query_as::<_, JobRow>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    let jobs = data_query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Job::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((jobs, total))
}

pub async fn get_by_id<'c, E>(executor: E, id: Uuid) -> Result<Option<Job>, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?");
    sqlx::query_as::<_, JobRow>(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?
        .map(Job::try_from)
        .transpose()
}

async fn lock_by_id<'c, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let found = sqlx::query_scalar::<_, String>("SELECT id FROM jobs WHERE id = ? FOR UPDATE")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

/// Insert and read back in one transaction; dropping `tx` on error rolls it back.
pub async fn create(pool: &MySqlPool, new: &NewJob) -> Result<Job, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO jobs
        (id, title, category, experience_required, status, location, timing,
         about, responsibilities, created_at, updated_at, last_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new.title)
    .bind(&new.category)
    .bind(new.experience_required)
    .bind(new.status.unwrap_or_default().to_string())
    .bind(new.location.to_string())
    .bind(new.timing.to_string())
    .bind(&new.about)
    .bind(&new.responsibilities)
    .bind(now)
    .bind(now)
    .bind(new.last_date)
    .execute(&mut *tx)
    .await?;

    let job = get_by_id(&mut *tx, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;
    Ok(job)
}

/// Applies only the fields present in `changes` and bumps `updated_at`.
/// With nothing to change the job is returned as stored.
/// Returns `None` when the job does not exist.
pub async fn update(
    pool: &MySqlPool,
    id: Uuid,
    changes: &UpdateJob,
) -> Result<Option<Job>, sqlx::Error> {
    let builder = UpdateBuilder::new("jobs")
        .set_opt("title", changes.title.clone())
        .set_opt("category", changes.category.clone())
        .set_opt("experience_required", changes.experience_required)
        .set_opt("status", changes.status.map(|s| s.to_string()))
        .set_opt("location", changes.location.map(|l| l.to_string()))
        .set_opt("timing", changes.timing.map(|t| t.to_string()))
        .set_opt("about", changes.about.clone())
        .set_opt("responsibilities", changes.responsibilities.clone())
        .set_opt("last_date", changes.last_date);

    if builder.is_empty() {
        return get_by_id(pool, id).await;
    }

    apply_update(pool, id, builder.set("updated_at", Utc::now().naive_utc())).await
}

pub async fn set_status(
    pool: &MySqlPool,
    id: Uuid,
    status: JobStatus,
) -> Result<Option<Job>, sqlx::Error> {
    let builder = UpdateBuilder::new("jobs")
        .set("status", status.to_string())
        .set("updated_at", Utc::now().naive_utc());

    apply_update(pool, id, builder).await
}

async fn apply_update(
    pool: &MySqlPool,
    id: Uuid,
    builder: UpdateBuilder,
) -> Result<Option<Job>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if !lock_by_id(&mut *tx, id).await? {
        return Ok(None);
    }

    execute_update(&mut *tx, builder.build("id", id.to_string())).await?;
    let job = get_by_id(&mut *tx, id).await?;

    tx.commit().await?;
    Ok(job)
}

/// Returns the removed job, or `None` when it did not exist.
pub async fn delete(pool: &MySqlPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(job) = get_by_id(&mut *tx, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(job))
}
