//! Static field whitelists for the queryable entities
//!
//! Every filter and sort field is resolved against these tables before it
//! reaches SQL, so column names are never taken from the caller verbatim.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::models::{EventDate, Reservation, ReservationStatus, WaitingListEntry, WaitingListStatus};
use crate::utils::errors::{BookingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind, nullable: false }
}

const fn nullable(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind, nullable: true }
}

/// A typed column value, used both for filter operands and in-memory rows
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Text form used for case-insensitive search
    pub fn search_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Integer(v) => Some(v.to_string()),
            FieldValue::Text(v) => Some(v.to_lowercase()),
            FieldValue::Boolean(v) => Some(v.to_string()),
            FieldValue::Date(v) => Some(v.to_string()),
            FieldValue::Time(v) => Some(v.to_string()),
            FieldValue::Timestamp(v) => Some(v.to_rfc3339()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<ReservationStatus> for FieldValue {
    fn from(value: ReservationStatus) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

impl From<WaitingListStatus> for FieldValue {
    fn from(value: WaitingListStatus) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl FieldSpec {
    /// Check that an already-typed operand fits this column
    pub fn accepts(&self, value: &FieldValue) -> Result<()> {
        let fits = match (self.kind, value) {
            (_, FieldValue::Null) => self.nullable,
            (FieldKind::Integer, FieldValue::Integer(_)) => true,
            (FieldKind::Text, FieldValue::Text(_)) => true,
            (FieldKind::Boolean, FieldValue::Boolean(_)) => true,
            (FieldKind::Date, FieldValue::Date(_)) => true,
            (FieldKind::Time, FieldValue::Time(_)) => true,
            (FieldKind::Timestamp, FieldValue::Timestamp(_)) => true,
            (FieldKind::Enum(variants), FieldValue::Text(v)) => variants.contains(&v.as_str()),
            _ => false,
        };

        if fits {
            Ok(())
        } else if matches!(value, FieldValue::Null) {
            Err(BookingError::InvalidInput(format!("Column {} cannot be null.", self.name)))
        } else {
            Err(BookingError::InvalidInput(format!("Invalid value for column {}: {:?}.", self.name, value)))
        }
    }

    /// Parse a JSON operand into a typed value for this column
    pub fn parse(&self, raw: &Value) -> Result<FieldValue> {
        let invalid = || BookingError::InvalidInput(format!("Invalid value for column {}: {}.", self.name, raw));

        let value = match (self.kind, raw) {
            (_, Value::Null) => FieldValue::Null,
            (FieldKind::Integer, Value::Number(n)) => FieldValue::Integer(n.as_i64().ok_or_else(invalid)?),
            (FieldKind::Integer, Value::String(s)) => FieldValue::Integer(s.trim().parse().map_err(|_| invalid())?),
            (FieldKind::Text, Value::String(s)) => FieldValue::Text(s.clone()),
            (FieldKind::Enum(_), Value::String(s)) => FieldValue::Text(s.clone()),
            (FieldKind::Boolean, Value::Bool(b)) => FieldValue::Boolean(*b),
            (FieldKind::Boolean, Value::String(s)) => match s.as_str() {
                "true" => FieldValue::Boolean(true),
                "false" => FieldValue::Boolean(false),
                _ => return Err(invalid()),
            },
            (FieldKind::Date, Value::String(s)) => {
                FieldValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?)
            }
            (FieldKind::Time, Value::String(s)) => {
                FieldValue::Time(NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| invalid())?)
            }
            (FieldKind::Timestamp, Value::String(s)) => FieldValue::Timestamp(parse_timestamp(s).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };

        self.accepts(&value)?;
        Ok(value)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// An entity the query layer can filter, sort and paginate
pub trait Queryable {
    /// Table the entity is stored in
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn fields() -> &'static [FieldSpec];

    /// Value of a whitelisted field on this row
    fn field_value(&self, field: &str) -> FieldValue;

    fn field(name: &str) -> Result<&'static FieldSpec> {
        Self::fields()
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| BookingError::InvalidInput(format!("Invalid column '{}' for table {}", name, Self::TABLE)))
    }

    fn primary_key_value(&self) -> FieldValue {
        self.field_value(Self::PRIMARY_KEY)
    }
}

const RESERVATION_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("event_id", FieldKind::Integer),
    field("event_date_id", FieldKind::Integer),
    field("user_id", FieldKind::Integer),
    field("number_of_students", FieldKind::Integer),
    field("number_of_teachers", FieldKind::Integer),
    field("total_seats", FieldKind::Integer),
    nullable("special_requirements", FieldKind::Text),
    field("contact_info", FieldKind::Text),
    field("status", FieldKind::Enum(&ReservationStatus::ALL)),
    field("local_reservation_code", FieldKind::Text),
    field("created_at", FieldKind::Timestamp),
    field("updated_at", FieldKind::Timestamp),
    nullable("cancelled_at", FieldKind::Timestamp),
];

impl Queryable for Reservation {
    const TABLE: &'static str = "reservation";

    fn fields() -> &'static [FieldSpec] {
        RESERVATION_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "id" => self.id.into(),
            "event_id" => self.event_id.into(),
            "event_date_id" => self.event_date_id.into(),
            "user_id" => self.user_id.into(),
            "number_of_students" => self.number_of_students.into(),
            "number_of_teachers" => self.number_of_teachers.into(),
            "total_seats" => self.total_seats.into(),
            "special_requirements" => self.special_requirements.clone().into(),
            "contact_info" => self.contact_info.clone().into(),
            "status" => self.status.into(),
            "local_reservation_code" => self.local_reservation_code.clone().into(),
            "created_at" => FieldValue::Timestamp(self.created_at),
            "updated_at" => FieldValue::Timestamp(self.updated_at),
            "cancelled_at" => self.cancelled_at.map(FieldValue::Timestamp).unwrap_or(FieldValue::Null),
            _ => FieldValue::Null,
        }
    }
}

const WAITING_LIST_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("event_date_id", FieldKind::Integer),
    field("event_id", FieldKind::Integer),
    field("user_id", FieldKind::Integer),
    field("number_of_students", FieldKind::Integer),
    field("number_of_teachers", FieldKind::Integer),
    nullable("special_requirements", FieldKind::Text),
    field("contact_info", FieldKind::Text),
    field("status", FieldKind::Enum(&WaitingListStatus::ALL)),
    field("position", FieldKind::Integer),
    field("created_at", FieldKind::Timestamp),
];

impl Queryable for WaitingListEntry {
    const TABLE: &'static str = "waiting_list";

    fn fields() -> &'static [FieldSpec] {
        WAITING_LIST_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "id" => self.id.into(),
            "event_date_id" => self.event_date_id.into(),
            "event_id" => self.event_id.into(),
            "user_id" => self.user_id.into(),
            "number_of_students" => self.number_of_students.into(),
            "number_of_teachers" => self.number_of_teachers.into(),
            "special_requirements" => self.special_requirements.clone().into(),
            "contact_info" => self.contact_info.clone().into(),
            "status" => self.status.into(),
            "position" => self.position.into(),
            "created_at" => FieldValue::Timestamp(self.created_at),
            _ => FieldValue::Null,
        }
    }
}

const EVENT_DATE_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("event_id", FieldKind::Integer),
    field("date", FieldKind::Date),
    field("time", FieldKind::Time),
    field("capacity", FieldKind::Integer),
    field("available_spots", FieldKind::Integer),
    field("locked", FieldKind::Boolean),
    nullable("lock_time", FieldKind::Timestamp),
];

impl Queryable for EventDate {
    const TABLE: &'static str = "event_date";

    fn fields() -> &'static [FieldSpec] {
        EVENT_DATE_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "id" => self.id.into(),
            "event_id" => self.event_id.into(),
            "date" => FieldValue::Date(self.date),
            "time" => FieldValue::Time(self.time),
            "capacity" => self.capacity.into(),
            "available_spots" => self.available_spots.into(),
            "locked" => self.locked.into(),
            "lock_time" => self.lock_time.map(FieldValue::Timestamp).unwrap_or(FieldValue::Null),
            _ => FieldValue::Null,
        }
    }
}
