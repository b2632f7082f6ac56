//! Access to the `meta` key/value table.
//!
//! Values are stored as their `ToString` rendering and parsed back with
//! `FromStr`; the table itself is created by the consuming application's
//! migrations:
//!
//! ```sql
//! create table meta (key text primary key not null, value text not null);
//! ```

use std::str::FromStr;

use crate::MetaError;

pub async fn save<T>(
    exec: impl sqlx::SqliteExecutor<'_>,
    key: &str,
    value: T,
) -> Result<(), MetaError>
where
    T: ToString,
{
    sqlx::query(
        r#"
        insert into meta(key, value)
        values (?, ?)
        on conflict (key) do update set
        value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn get<T>(exec: impl sqlx::SqliteExecutor<'_>, key: &str) -> Result<T, MetaError>
where
    T: FromStr,
{
    get_optional(exec, key)
        .await?
        .ok_or_else(|| MetaError::NotFound(key.to_string()))
}

/// Like [`get`] but an absent key is `Ok(None)` rather than an error.
pub async fn get_optional<T>(
    exec: impl sqlx::SqliteExecutor<'_>,
    key: &str,
) -> Result<Option<T>, MetaError>
where
    T: FromStr,
{
    sqlx::query_scalar::<_, String>(
        r#"
        select value from meta where key = ?
        "#,
    )
    .bind(key)
    .fetch_optional(exec)
    .await?
    .map(|value| value.parse().map_err(|_| MetaError::DecodeError))
    .transpose()
}
