//! Rendering list queries to Postgres
//!
//! Column names come only from the entity whitelist; every operand is bound.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, Postgres, QueryBuilder};

use super::fields::{FieldKind, FieldValue, Queryable};
use super::filter::{Combinator, Filter};
use super::ListQuery;
use crate::utils::errors::Result;

fn column<T: Queryable>(field: &str) -> Result<String> {
    let spec = T::field(field)?;
    Ok(match spec.kind {
        FieldKind::Enum(_) => format!("{}::text", spec.name),
        _ => spec.name.to_string(),
    })
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            builder.push("NULL");
        }
        FieldValue::Integer(v) => {
            builder.push_bind(*v);
        }
        FieldValue::Text(v) => {
            builder.push_bind(v.clone());
        }
        FieldValue::Boolean(v) => {
            builder.push_bind(*v);
        }
        FieldValue::Date(v) => {
            builder.push_bind(*v);
        }
        FieldValue::Time(v) => {
            builder.push_bind(*v);
        }
        FieldValue::Timestamp(v) => {
            builder.push_bind(*v);
        }
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filter<T: Queryable>(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) -> Result<()> {
    match filter {
        Filter::Equals { field, value: FieldValue::Null } => {
            builder.push(column::<T>(field)?).push(" IS NULL");
        }
        Filter::Equals { field, value } => {
            builder.push(column::<T>(field)?).push(" = ");
            push_value(builder, value);
        }
        Filter::In { values, .. } if values.is_empty() => {
            builder.push("FALSE");
        }
        Filter::In { field, values } => {
            builder.push(column::<T>(field)?).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
        }
        Filter::Search { term, fields, combinator } => {
            let joiner = match combinator {
                Combinator::And => " AND ",
                Combinator::Or => " OR ",
            };
            let pattern = like_pattern(term);
            builder.push("(");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                builder
                    .push("CAST(")
                    .push(T::field(field)?.name)
                    .push(" AS TEXT) ILIKE ")
                    .push_bind(pattern.clone());
            }
            builder.push(")");
        }
    }
    Ok(())
}

fn push_where<T: Queryable>(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) -> Result<()> {
    for (i, filter) in query.filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_filter::<T>(builder, filter)?;
    }
    Ok(())
}

/// `SELECT * ... ORDER BY ... LIMIT ... OFFSET ...` for one page
pub fn select_page<T: Queryable>(query: &ListQuery) -> Result<QueryBuilder<'static, Postgres>> {
    query.validate::<T>()?;

    let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", T::TABLE));
    push_where::<T>(&mut builder, query)?;

    builder.push(" ORDER BY ");
    for (i, sort) in query.effective_sort::<T>().iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        let nulls = match sort.direction {
            super::SortDirection::Asc => "NULLS FIRST",
            super::SortDirection::Desc => "NULLS LAST",
        };
        builder
            .push(column::<T>(&sort.field)?)
            .push(" ")
            .push(sort.direction.as_sql())
            .push(" ")
            .push(nulls);
    }

    builder
        .push(" LIMIT ")
        .push_bind(i64::from(query.page_size))
        .push(" OFFSET ")
        .push_bind(query.offset() as i64);

    Ok(builder)
}

/// `SELECT COUNT(*)` under the same filters
pub fn select_count<T: Queryable>(query: &ListQuery) -> Result<QueryBuilder<'static, Postgres>> {
    query.validate::<T>()?;

    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
    push_where::<T>(&mut builder, query)?;
    Ok(builder)
}

/// Run a list query and return one page plus the total match count
pub async fn fetch_page<T>(pool: &PgPool, query: &ListQuery) -> Result<(Vec<T>, u64)>
where
    T: Queryable + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count = select_count::<T>(query)?;
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut page = select_page::<T>(query)?;
    let items = page.build_query_as::<T>().fetch_all(pool).await?;

    Ok((items, total.max(0) as u64))
}
