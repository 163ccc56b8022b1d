//! Turns a [`ListQuery`] into SeaORM filters, ordering and a page window.

use std::str::FromStr;

use chrono::DateTime;
use sea_orm::{
    ColumnTrait, ColumnType, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Value, sea_query::SimpleExpr,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    error::{AppError, AppResult},
    response::Meta,
    routes::params::{FilterCondition, FilterOp, ListQuery},
};

/// Resolves a query field to a column, treating `hidden` names as unknown.
fn resolve<E: EntityTrait>(field: &str, hidden: &[&str]) -> Option<E::Column> {
    if hidden.contains(&field) {
        return None;
    }
    <E::Column as FromStr>::from_str(field).ok()
}

pub fn apply_filters<E>(
    select: Select<E>,
    query: &ListQuery,
    hidden: &[&str],
) -> AppResult<Select<E>>
where
    E: EntityTrait,
{
    let mut condition = Condition::all();
    let mut applied = false;
    for filter in &query.filters {
        let Some(column) = resolve::<E>(&filter.field, hidden) else {
            tracing::debug!(field = %filter.field, "skipping filter on unknown field");
            continue;
        };
        let value = typed_value(&column, filter)?;
        condition = condition.add(compare(column, filter.op, value));
        applied = true;
    }
    if applied {
        Ok(select.filter(condition))
    } else {
        Ok(select)
    }
}

pub fn apply_sort<E>(mut select: Select<E>, query: &ListQuery, hidden: &[&str]) -> Select<E>
where
    E: EntityTrait,
{
    for key in query.sort_keys() {
        match resolve::<E>(&key.field, hidden) {
            Some(column) => {
                let order = if key.descending { Order::Desc } else { Order::Asc };
                select = select.order_by(column, order);
            }
            None => tracing::debug!(field = %key.field, "skipping sort on unknown field"),
        }
    }
    select
}

/// Runs the filtered count and the sorted page against the same conditions.
pub async fn fetch_page<E>(
    db: &OrmConn,
    select: Select<E>,
    query: &ListQuery,
    hidden: &[&str],
) -> AppResult<(Vec<E::Model>, Meta)>
where
    E: EntityTrait<Model: Sync>,
{
    let select = apply_filters(select, query, hidden)?;
    let total = select.clone().count(db).await?;
    let (page, limit, offset) = query.pagination();

    let models = apply_sort(select, query, hidden)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok((models, Meta::new(page, limit, total)))
}

fn compare<C: ColumnTrait>(column: C, op: FilterOp, value: Value) -> SimpleExpr {
    match op {
        FilterOp::Eq => column.eq(value),
        FilterOp::Ne => column.ne(value),
        FilterOp::Gt => column.gt(value),
        FilterOp::Gte => column.gte(value),
        FilterOp::Lt => column.lt(value),
        FilterOp::Lte => column.lte(value),
    }
}

/// Parses the raw query value into the column's own type so Postgres compares like with like.
fn typed_value<C: ColumnTrait>(column: &C, filter: &FilterCondition) -> AppResult<Value> {
    let raw = filter.value.trim();
    let invalid = || {
        AppError::BadRequest(format!(
            "invalid value for {}: {}",
            filter.field, filter.value
        ))
    };

    let definition = column.def();
    let value = match definition.get_column_type() {
        ColumnType::SmallInteger => raw.parse::<i16>().map(Value::from).map_err(|_| invalid())?,
        ColumnType::Integer => raw.parse::<i32>().map(Value::from).map_err(|_| invalid())?,
        ColumnType::BigInteger => raw.parse::<i64>().map(Value::from).map_err(|_| invalid())?,
        ColumnType::Float => raw.parse::<f32>().map(Value::from).map_err(|_| invalid())?,
        ColumnType::Double => raw.parse::<f64>().map(Value::from).map_err(|_| invalid())?,
        ColumnType::Boolean => parse_bool(raw).map(Value::from).ok_or_else(invalid)?,
        ColumnType::Uuid => Uuid::parse_str(raw).map(Value::from).map_err(|_| invalid())?,
        ColumnType::TimestampWithTimeZone | ColumnType::Timestamp => {
            DateTime::parse_from_rfc3339(raw)
                .map(Value::from)
                .map_err(|_| invalid())?
        }
        ColumnType::Array(_) | ColumnType::Json | ColumnType::JsonBinary => {
            return Err(AppError::BadRequest(format!(
                "filtering on {} is not supported",
                filter.field
            )));
        }
        _ => Value::from(filter.value.clone()),
    };
    Ok(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
