//! Lazy, untracked queries over one collection.
//!
//! A [`Query`] is a value: builder methods return a new query and nothing touches the
//! database until one of the executors (`fetch_all`, `first`, `any`, `count`) runs.
//! Field filters address the serialized body through SQLite's `json_extract`.

use std::marker::PhantomData;

use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::StorageError;
use whatevers_core::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
enum Filter {
    Id(Uuid),
    FieldEq { field: String, value: Value },
}

/// Composable query handle over the collection backing `T`.
pub struct Query<T> {
    pool: SqlitePool,
    filters: Vec<Filter>,
    order_by: Option<(String, SortOrder)>,
    limit: Option<i64>,
    offset: Option<i64>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Query<T> {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            filters: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.filters.push(Filter::Id(id));
        self
    }

    /// Keeps records whose `field` equals `value`. Nested fields use dots (`owner.name`).
    /// A `null` value matches missing fields too.
    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::FieldEq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Sorts by `field`; ties and unsorted queries fall back to insertion order.
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by = Some((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.max(0));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset.max(0));
        self
    }

    pub async fn fetch_all(&self) -> Result<Vec<T>, StorageError> {
        let mut builder = self.select("SELECT body FROM entities")?;
        self.push_order_and_page(&mut builder)?;

        let bodies: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;

        debug!(collection = T::COLLECTION, count = bodies.len(), "Fetched entities");
        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StorageError::from))
            .collect()
    }

    /// First match in query order, or `None`.
    pub async fn first(&self) -> Result<Option<T>, StorageError> {
        let found = self.clone().limit(1).fetch_all().await?;
        Ok(found.into_iter().next())
    }

    pub async fn any(&self) -> Result<bool, StorageError> {
        let mut builder = self.select("SELECT EXISTS (SELECT 1 FROM entities")?;
        self.push_order_and_page(&mut builder)?;
        builder.push(")");
        let found: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(found != 0)
    }

    /// Number of matches. Ignores ordering; honors limit and offset.
    pub async fn count(&self) -> Result<i64, StorageError> {
        let mut builder = self.select("SELECT COUNT(*) FROM (SELECT rowid FROM entities")?;
        self.push_order_and_page(&mut builder)?;
        builder.push(")");
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn select(&self, head: &str) -> Result<QueryBuilder<'static, Sqlite>, StorageError> {
        let mut builder = QueryBuilder::new(head);
        builder.push(" WHERE collection = ");
        builder.push_bind(T::COLLECTION);

        for filter in &self.filters {
            match filter {
                Filter::Id(id) => {
                    builder.push(" AND id = ");
                    builder.push_bind(id.to_string());
                }
                Filter::FieldEq { field, value } => {
                    builder.push(" AND json_extract(body, ");
                    builder.push_bind(json_path(field)?);
                    builder.push(")");
                    push_comparison(&mut builder, field, value)?;
                }
            }
        }

        Ok(builder)
    }

    fn push_order_and_page(
        &self,
        builder: &mut QueryBuilder<'static, Sqlite>,
    ) -> Result<(), StorageError> {
        builder.push(" ORDER BY ");
        if let Some((field, order)) = &self.order_by {
            builder.push("json_extract(body, ");
            builder.push_bind(json_path(field)?);
            builder.push(match order {
                SortOrder::Ascending => ") ASC, ",
                SortOrder::Descending => ") DESC, ",
            });
        }
        builder.push("rowid ASC");

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                builder.push(" LIMIT ");
                builder.push_bind(limit);
                builder.push(" OFFSET ");
                builder.push_bind(offset);
            }
            (Some(limit), None) => {
                builder.push(" LIMIT ");
                builder.push_bind(limit);
            }
            (None, Some(offset)) => {
                builder.push(" LIMIT -1 OFFSET ");
                builder.push_bind(offset);
            }
            (None, None) => {}
        }
        Ok(())
    }
}

fn push_comparison(
    builder: &mut QueryBuilder<'static, Sqlite>,
    field: &str,
    value: &Value,
) -> Result<(), StorageError> {
    match value {
        Value::Null => {
            builder.push(" IS NULL");
        }
        Value::Bool(b) => {
            builder.push(" = ");
            builder.push_bind(i64::from(*b));
        }
        Value::Number(n) => {
            builder.push(" = ");
            if let Some(i) = n.as_i64() {
                builder.push_bind(i);
            } else if n.is_f64() {
                builder.push_bind(n.as_f64().unwrap_or(f64::NAN));
            } else {
                // SQLite integers are 64-bit signed
                return Err(StorageError::InvalidQuery(format!(
                    "value {} for '{}' is out of range",
                    n, field
                )));
            }
        }
        Value::String(s) => {
            builder.push(" = ");
            builder.push_bind(s.clone());
        }
        Value::Array(_) | Value::Object(_) => {
            // json_extract returns containers as minified JSON text
            builder.push(" = json(");
            builder.push_bind(value.to_string());
            builder.push(")");
        }
    }
    Ok(())
}

fn json_path(field: &str) -> Result<String, StorageError> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if !valid {
        return Err(StorageError::InvalidQuery(format!(
            "'{}' is not a valid field name",
            field
        )));
    }
    Ok(format!("$.{}", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_path_accepts_nested_fields() {
        assert_eq!(json_path("name").unwrap(), "$.name");
        assert_eq!(json_path("owner.first_name").unwrap(), "$.owner.first_name");
    }

    #[test]
    fn test_json_path_rejects_odd_names() {
        for field in ["", "1st", "a..b", "a-b", "name'", "$.name", "a[0]"] {
            assert!(
                matches!(json_path(field), Err(StorageError::InvalidQuery(_))),
                "accepted {field:?}"
            );
        }
    }

    #[test]
    fn test_unsigned_beyond_i64_is_rejected() {
        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new("SELECT 1");
        let err = push_comparison(&mut builder, "weight", &Value::from(u64::MAX)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery(msg) if msg.contains("weight")));

        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new("SELECT 1");
        assert!(push_comparison(&mut builder, "weight", &Value::from(i64::MAX as u64)).is_ok());
        assert!(push_comparison(&mut builder, "weight", &Value::from(2.5)).is_ok());
    }
}
