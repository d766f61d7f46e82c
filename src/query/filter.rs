//! Typed filter and sort expressions

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::fields::{FieldValue, Queryable};
use crate::utils::errors::{BookingError, Result};

/// How a search term combines across several fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    /// Every field must contain the term
    And,
    /// At least one field must contain the term
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals { field: String, value: FieldValue },
    In { field: String, values: Vec<FieldValue> },
    Search { term: String, fields: Vec<String>, combinator: Combinator },
}

impl Filter {
    pub fn equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Equals { field: field.to_string(), value: value.into() }
    }

    pub fn any_of<V: Into<FieldValue>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn search(term: &str, fields: &[&str], combinator: Combinator) -> Self {
        Filter::Search {
            term: term.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            combinator,
        }
    }

    /// Check field names and operand types against the entity whitelist
    pub fn validate<T: Queryable>(&self) -> Result<()> {
        match self {
            Filter::Equals { field, value } => T::field(field)?.accepts(value),
            Filter::In { field, values } => {
                let spec = T::field(field)?;
                values.iter().try_for_each(|value| spec.accepts(value))
            }
            Filter::Search { term, fields, .. } => {
                if term.trim().is_empty() {
                    return Err(BookingError::InvalidInput("Search term must not be empty".to_string()));
                }
                if fields.is_empty() {
                    return Err(BookingError::InvalidInput("Search needs at least one column".to_string()));
                }
                fields.iter().try_for_each(|field| T::field(field).map(|_| ()))
            }
        }
    }

    pub fn matches<T: Queryable>(&self, row: &T) -> bool {
        match self {
            Filter::Equals { field, value } => row.field_value(field) == *value,
            Filter::In { field, values } => {
                let actual = row.field_value(field);
                values.iter().any(|value| *value == actual)
            }
            Filter::Search { term, fields, combinator } => {
                let needle = term.to_lowercase();
                let contains = |field: &String| {
                    row.field_value(field)
                        .search_text()
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                };
                match combinator {
                    Combinator::And => fields.iter().all(contains),
                    Combinator::Or => fields.iter().any(contains),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(BookingError::InvalidInput(format!("Invalid sort direction: {}", other))),
        }
    }
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Asc }
    }

    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Desc }
    }

    pub fn compare<T: Queryable>(&self, a: &T, b: &T) -> Ordering {
        let ordering = a
            .field_value(&self.field)
            .partial_cmp(&b.field_value(&self.field))
            .unwrap_or(Ordering::Equal);

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}
