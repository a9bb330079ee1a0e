use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Executor, MySql};

use crate::models::Claims;

fn expires_at(claims: &Claims) -> NaiveDateTime {
    DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
        .unwrap_or_else(Utc::now)
        .naive_utc()
}

pub async fn store<'c, E>(executor: E, claims: &Claims) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(expires_at(claims))
    .execute(executor)
    .await?;
    Ok(())
}

/// Revokes `jti` only if it is currently live. `true` means this call consumed it,
/// so two concurrent refreshes with the same token cannot both succeed.
pub async fn consume<'c, E>(executor: E, jti: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > ?
        "#,
    )
    .bind(jti)
    .bind(Utc::now().naive_utc())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Idempotent; unknown or already revoked ids are fine.
pub async fn revoke<'c, E>(executor: E, jti: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(jti)
        .execute(executor)
        .await?;
    Ok(())
}
