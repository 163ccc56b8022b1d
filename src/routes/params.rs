//! Query-string vocabulary shared by every list endpoint.
//!
//! `page`, `limit`, `sort`, `fields` and `filter` are reserved. Any other key
//! is a filter on a field, either `field=value` or `field[op]=value`.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_SORT: &str = "-created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    /// Accepts both `gte` and the `$gte` spelling used inside a JSON `filter`.
    pub fn parse(token: &str) -> AppResult<Self> {
        match token.trim().trim_start_matches('$') {
            "eq" => Ok(FilterOp::Eq),
            "ne" => Ok(FilterOp::Ne),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            other => Err(AppError::BadRequest(format!(
                "unsupported filter operator: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let fields: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect();
        if fields.is_empty() {
            return Ok(Projection::All);
        }

        let excluded = fields.iter().filter(|field| field.starts_with('-')).count();
        if excluded == fields.len() {
            Ok(Projection::Exclude(
                fields
                    .iter()
                    .map(|field| field.trim_start_matches('-').to_string())
                    .collect(),
            ))
        } else if excluded == 0 {
            Ok(Projection::Include(
                fields.iter().map(|field| field.to_string()).collect(),
            ))
        } else {
            Err(AppError::BadRequest(
                "fields cannot mix included and excluded names".into(),
            ))
        }
    }

    /// Applies the projection to one serialized record. `id` survives every inclusion list.
    pub fn apply(&self, item: Value) -> Value {
        let Value::Object(object) = item else {
            return item;
        };
        match self {
            Projection::All => Value::Object(object),
            Projection::Include(fields) => Value::Object(
                object
                    .into_iter()
                    .filter(|(key, _)| key == "id" || fields.iter().any(|field| field == key))
                    .collect::<Map<String, Value>>(),
            ),
            Projection::Exclude(fields) => Value::Object(
                object
                    .into_iter()
                    .filter(|(key, _)| !fields.iter().any(|field| field == key))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub filters: Vec<FilterCondition>,
}

impl ListQuery {
    pub fn from_pairs<I>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = ListQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page = parse_number("page", &value)?,
                "limit" => query.limit = parse_number("limit", &value)?,
                "sort" => query.sort = parse_sort(&value),
                "fields" => query.projection = Projection::parse(&value)?,
                "filter" => query.filters.extend(parse_json_filter(&value)?),
                _ => query.filters.push(parse_keyed_filter(&key, value)?),
            }
        }
        Ok(query)
    }

    /// Returns `(page, limit, offset)`.
    pub fn pagination(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = (page - 1).saturating_mul(limit);
        (page, limit, offset)
    }

    /// Requested sort keys, or newest first.
    pub fn sort_keys(&self) -> Vec<SortKey> {
        if self.sort.is_empty() {
            parse_sort(DEFAULT_SORT)
        } else {
            self.sort.clone()
        }
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        ListQuery::from_pairs(pairs)
    }
}

fn parse_number(name: &str, raw: &str) -> AppResult<Option<u64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("{name} must be a positive integer")))
}

fn parse_sort(raw: &str) -> Vec<SortKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty() && *key != "-")
        .map(|key| match key.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                descending: true,
            },
            None => SortKey {
                field: key.trim_start_matches('+').to_string(),
                descending: false,
            },
        })
        .collect()
}

fn parse_keyed_filter(key: &str, value: String) -> AppResult<FilterCondition> {
    let (field, op) = match key.split_once('[') {
        Some((field, rest)) => {
            let token = rest.strip_suffix(']').ok_or_else(|| {
                AppError::BadRequest(format!("malformed filter key: {key}"))
            })?;
            (field, FilterOp::parse(token)?)
        }
        None => (key, FilterOp::Eq),
    };
    Ok(FilterCondition {
        field: field.trim().to_string(),
        op,
        value,
    })
}

/// `filter={"price":{"$gte":100},"is_active":true}`
fn parse_json_filter(raw: &str) -> AppResult<Vec<FilterCondition>> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|err| AppError::BadRequest(format!("filter is not valid JSON: {err}")))?;
    let Value::Object(fields) = parsed else {
        return Err(AppError::BadRequest("filter must be a JSON object".into()));
    };

    let mut conditions = Vec::new();
    for (field, criteria) in fields {
        match criteria {
            Value::Object(operators) => {
                for (op, value) in operators {
                    conditions.push(FilterCondition {
                        field: field.clone(),
                        op: FilterOp::parse(&op)?,
                        value: scalar_to_string(&field, value)?,
                    });
                }
            }
            value => conditions.push(FilterCondition {
                value: scalar_to_string(&field, value)?,
                field,
                op: FilterOp::Eq,
            }),
        }
    }
    Ok(conditions)
}

fn scalar_to_string(field: &str, value: Value) -> AppResult<String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(AppError::BadRequest(format!(
            "filter value for {field} must be a string, number or boolean"
        ))),
    }
}
