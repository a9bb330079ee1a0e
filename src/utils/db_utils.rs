use chrono::NaiveDateTime;
use sqlx::{Executor, MySql};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    /// `None` binds SQL `NULL`.
    DateTime(Option<NaiveDateTime>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(Some(v))
    }
}

impl From<Option<NaiveDateTime>> for SqlValue {
    fn from(v: Option<NaiveDateTime>) -> Self {
        SqlValue::DateTime(v)
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Partial UPDATE builder
/// ===============================
/// Column names come from code, never from the request body; only values are bound.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    sets: Vec<(&'static str, SqlValue)>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
        }
    }

    /// Adds `column = ?` when `value` is present.
    pub fn set_opt<V: Into<SqlValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.sets.push((column, v.into()));
        }
        self
    }

    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: V) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn build(self, id_column: &'static str, id: impl Into<SqlValue>) -> SqlUpdate {
        let set_clause = self
            .sets
            .iter()
            .map(|(col, _)| format!("{col} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table, set_clause, id_column
        );

        let mut values: Vec<SqlValue> = self.sets.into_iter().map(|(_, v)| v).collect();
        values.push(id.into());

        SqlUpdate { sql, values }
    }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'c, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_present_columns_are_emitted() {
        let update = UpdateBuilder::new("jobs")
            .set_opt("title", Some("Staff Engineer"))
            .set_opt::<String>("category", None)
            .set_opt("experience_required", Some(5))
            .build("id", "abc");

        assert_eq!(
            update.sql,
            "UPDATE jobs SET title = ?, experience_required = ? WHERE id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::Text("Staff Engineer".into()),
                SqlValue::Int(5),
                SqlValue::Text("abc".into()),
            ]
        );
    }

    #[test]
    fn cleared_datetime_binds_null() {
        let update = UpdateBuilder::new("jobs")
            .set_opt("last_date", Some(None::<NaiveDateTime>))
            .build("id", "abc");

        assert_eq!(update.sql, "UPDATE jobs SET last_date = ? WHERE id = ?");
        assert_eq!(update.values[0], SqlValue::DateTime(None));
    }

    #[test]
    fn empty_builder_reports_empty() {
        let builder = UpdateBuilder::new("jobs").set_opt::<i32>("experience_required", None);
        assert!(builder.is_empty());
        assert!(!builder.set("title", "x").is_empty());
    }
}
