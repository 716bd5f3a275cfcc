use super::{ContentRepository, StoreError};
use crate::models::fields::item_fields;
use crate::models::{Content, FieldValue, Filter, FilterOp, NaturalKey, Patch};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;
use tracing::debug;

/// Postgres repository for one content kind.
///
/// Column names come only from the kind's static schema; every value is a bound
/// parameter.
pub struct PgContentRepository<T> {
    pool: PgPool,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Content> PgContentRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _kind: PhantomData,
        }
    }
}

impl<T> Clone for PgContentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _kind: PhantomData,
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: FieldValue) {
    match value {
        FieldValue::Text(s) => qb.push_bind(s),
        FieldValue::TextList(items) => qb.push_bind(items),
        FieldValue::SmallInt(n) => qb.push_bind(n),
        FieldValue::Timestamp(ts) => qb.push_bind(ts),
    };
}

fn column_list<T: Content>() -> String {
    T::FIELDS
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_key_predicate<T: Content>(qb: &mut QueryBuilder<'_, Postgres>, key: &NaturalKey) {
    let [first, second] = T::KEY_FIELDS;
    qb.push(" WHERE ")
        .push(first)
        .push(" = ")
        .push_bind(key.first.clone())
        .push(" AND ")
        .push(second)
        .push(" = ")
        .push_bind(key.second.clone());
}

fn schema_column<T: Content>(field: &str) -> Result<&'static str, StoreError> {
    T::field(field)
        .map(|spec| spec.name)
        .ok_or_else(|| StoreError::Io(format!("unknown column {}", field)))
}

#[async_trait]
impl<T: Content> ContentRepository<T> for PgContentRepository<T> {
    async fn create(&self, item: &T) -> Result<(), StoreError> {
        let fields = item_fields(item).map_err(|e| StoreError::Io(e.to_string()))?;

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        qb.push(T::TABLE)
            .push(" (")
            .push(column_list::<T>())
            .push(") VALUES (");
        for (i, (_, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(")");

        qb.build().execute(&self.pool).await?;
        debug!(table = T::TABLE, "Inserted record");
        Ok(())
    }

    async fn update(&self, key: &NaturalKey, patch: &Patch) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(T::TABLE).push(" SET ");
        for (i, (field, value)) in patch.changes().iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(schema_column::<T>(field)?).push(" = ");
            push_value(&mut qb, value.clone());
        }
        push_key_predicate::<T>(&mut qb, key);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, key: &NaturalKey) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(T::TABLE);
        push_key_predicate::<T>(&mut qb, key);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn find_one(&self, key: &NaturalKey) -> Result<T, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(column_list::<T>()).push(" FROM ").push(T::TABLE);
        push_key_predicate::<T>(&mut qb, key);

        qb.build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_many(&self, filter: &Filter, limit: i64) -> Result<Vec<T>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(column_list::<T>()).push(" FROM ").push(T::TABLE);

        for (i, cond) in filter.conditions().iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            let column = schema_column::<T>(&cond.field)?;
            match cond.op {
                FilterOp::Eq => {
                    qb.push(column).push(" = ");
                    push_value(&mut qb, cond.value.clone());
                }
                FilterOp::Contains => {
                    push_value(&mut qb, cond.value.clone());
                    qb.push(" = ANY(").push(column).push(")");
                }
            }
        }

        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);

        let items = qb.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok(items)
    }
}
