use sqlx::{Executor, MySql, MySqlPool};

use crate::model::{
    role::Role,
    user::{User, UserRow},
};

const USER_COLUMNS: &str = "id, username, email, hashed_password, role";

pub async fn get_by_email<'c, E>(executor: E, email: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(email)
        .fetch_optional(executor)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn get_by_id<'c, E>(executor: E, id: u64) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn username_exists(pool: &MySqlPool, username: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn email_exists(pool: &MySqlPool, email: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub hashed_password: &'a str,
    pub role: Role,
}

pub async fn create(pool: &MySqlPool, user: NewUser<'_>) -> Result<User, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO users (username, email, hashed_password, role) VALUES (?, ?, ?, ?)",
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.hashed_password)
    .bind(user.role.to_string())
    .execute(&mut *tx)
    .await?;

    let created = get_by_id(&mut *tx, result.last_insert_id())
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;
    Ok(created)
}

pub async fn list(pool: &MySqlPool, limit: u32, offset: u32) -> Result<(Vec<User>, i64), sqlx::Error> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT ? OFFSET ?");
    let users = sqlx::query_as::<_, UserRow>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((users, total))
}

/// Returns the updated user, or `None` when no such id exists.
pub async fn set_role(pool: &MySqlPool, id: u64, role: Role) -> Result<Option<User>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if get_by_id(&mut *tx, id).await?.is_none() {
        return Ok(None);
    }

    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.to_string())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let updated = get_by_id(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Returns the removed user, or `None` when no such id exists.
pub async fn delete(pool: &MySqlPool, id: u64) -> Result<Option<User>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(user) = get_by_id(&mut *tx, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(user))
}

/// MySQL reports duplicate keys as SQLSTATE 23000.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.code().as_deref() == Some("23000")
        }
        _ => false,
    }
}
