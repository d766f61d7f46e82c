//! JSON request parameters
//!
//! `filter_params` is a JSON object mapping a column to a value or a list of
//! values, plus an optional `"search"` list of `{"term", "columns", "type"}`
//! objects. `sorting_params` is a JSON array of single-key objects such as
//! `[{"created_at": "desc"}]`.

use serde::Deserialize;
use serde_json::Value;

use super::fields::Queryable;
use super::filter::{Combinator, Filter, Sort};
use crate::utils::errors::{BookingError, Result};

const SEARCH_KEY: &str = "search";

#[derive(Debug, Deserialize)]
struct SearchParam {
    term: String,
    columns: Vec<String>,
    #[serde(rename = "type")]
    combinator: Combinator,
}

fn parse_json(raw: &str) -> Result<Option<Value>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| BookingError::InvalidInput(format!("Invalid parameters: {}", e)))
}

/// Parse `filter_params` into typed filters for entity `T`
pub fn parse_filter_params<T: Queryable>(raw: &str) -> Result<Vec<Filter>> {
    let Some(value) = parse_json(raw)? else {
        return Ok(Vec::new());
    };
    let Value::Object(params) = value else {
        return Err(BookingError::InvalidInput("Invalid parameters: expected a JSON object".to_string()));
    };

    let mut filters = Vec::new();
    for (key, value) in params {
        if key == SEARCH_KEY {
            let searches: Vec<SearchParam> = serde_json::from_value(value)
                .map_err(|_| BookingError::InvalidInput("Invalid search parameter.".to_string()))?;
            for search in searches {
                let filter = Filter::Search {
                    term: search.term,
                    fields: search.columns,
                    combinator: search.combinator,
                };
                filter.validate::<T>()?;
                filters.push(filter);
            }
            continue;
        }

        let spec = T::field(&key)?;
        let filter = match value {
            Value::Array(values) => Filter::In {
                field: key,
                values: values.iter().map(|v| spec.parse(v)).collect::<Result<_>>()?,
            },
            other => Filter::Equals { value: spec.parse(&other)?, field: key },
        };
        filters.push(filter);
    }

    Ok(filters)
}

/// Parse `sorting_params` into sort directives for entity `T`
pub fn parse_sorting_params<T: Queryable>(raw: &str) -> Result<Vec<Sort>> {
    let Some(value) = parse_json(raw)? else {
        return Ok(Vec::new());
    };
    let Value::Array(params) = value else {
        return Err(BookingError::InvalidInput("Invalid parameters: expected a JSON array".to_string()));
    };

    params
        .into_iter()
        .map(|param| {
            let single = match param {
                Value::Object(map) if map.len() == 1 => map.into_iter().next(),
                _ => None,
            };
            let (field, direction) = single.ok_or_else(|| {
                BookingError::InvalidInput("Each sorting parameter must be a single key-value pair.".to_string())
            })?;

            T::field(&field)?;
            let direction = direction
                .as_str()
                .ok_or_else(|| BookingError::InvalidInput("Invalid sorting parameter.".to_string()))?
                .parse()?;
            Ok(Sort { field, direction })
        })
        .collect()
}
