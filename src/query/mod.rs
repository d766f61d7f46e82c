//! Reservation and waiting-list query layer
//!
//! Filtering, sorting and pagination shared by both storage backends. A
//! [`ListQuery`] is validated against the entity's field whitelist, then
//! either rendered to SQL ([`sql`]) or evaluated in memory ([`ListQuery::apply`]).

pub mod fields;
pub mod filter;
pub mod params;
pub mod sql;

pub use fields::{FieldKind, FieldSpec, FieldValue, Queryable};
pub use filter::{Combinator, Filter, Sort, SortDirection};
pub use params::{parse_filter_params, parse_sorting_params};

use crate::utils::errors::{BookingError, Result};
use crate::utils::helpers::calculate_offset;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<Sort>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size, ..Self::default() }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    /// A copy of this query narrowed by one more filter
    pub fn scoped(&self, filter: Filter) -> Self {
        self.clone().filter(filter)
    }

    pub fn offset(&self) -> u64 {
        calculate_offset(self.page as usize, self.page_size as usize) as u64
    }

    /// Reject unknown fields, mistyped operands and empty pages
    pub fn validate<T: Queryable>(&self) -> Result<()> {
        if self.page < 1 {
            return Err(BookingError::InvalidInput("Page must be at least 1".to_string()));
        }
        if self.page_size < 1 {
            return Err(BookingError::InvalidInput("Page size must be at least 1".to_string()));
        }

        for filter in &self.filters {
            filter.validate::<T>()?;
        }
        for sort in &self.sort {
            T::field(&sort.field)?;
        }
        Ok(())
    }

    /// Sort directives in application order, ending with the primary key
    pub fn effective_sort<T: Queryable>(&self) -> Vec<Sort> {
        let mut sort = self.sort.clone();
        if !sort.iter().any(|s| s.field == T::PRIMARY_KEY) {
            sort.push(Sort::asc(T::PRIMARY_KEY));
        }
        sort
    }

    /// Evaluate the query over in-memory rows, returning one page and the total
    pub fn apply<T, I>(&self, rows: I) -> Result<(Vec<T>, u64)>
    where
        T: Queryable,
        I: IntoIterator<Item = T>,
    {
        self.validate::<T>()?;

        let mut matched: Vec<T> = rows
            .into_iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .collect();
        let total = matched.len() as u64;

        let sort = self.effective_sort::<T>();
        matched.sort_by(|a, b| {
            sort.iter()
                .map(|s| s.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let page = matched
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect();

        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reservation, ReservationStatus};
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn reservation(id: i64, user_id: i64, seats: i32, status: ReservationStatus, contact: &str) -> Reservation {
        Reservation {
            id,
            event_id: 1,
            event_date_id: 1,
            user_id,
            number_of_students: seats,
            number_of_teachers: 0,
            total_seats: seats,
            special_requirements: None,
            contact_info: contact.to_string(),
            status,
            local_reservation_code: format!("CODE{:04}", id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            cancelled_at: None,
        }
    }

    fn rows() -> Vec<Reservation> {
        vec![
            reservation(3, 10, 4, ReservationStatus::Pending, "alpha@school.example"),
            reservation(1, 11, 2, ReservationStatus::Confirmed, "beta@school.example"),
            reservation(2, 10, 4, ReservationStatus::Cancelled, "gamma@other.example"),
            reservation(4, 12, 1, ReservationStatus::Pending, "delta@school.example"),
        ]
    }

    #[test]
    fn test_default_sort_is_primary_key() {
        let (items, total) = ListQuery::default().apply(rows()).unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sort_ties_break_on_primary_key() {
        let query = ListQuery::default().sort_by(Sort::desc("total_seats"));
        let (items, _) = query.apply(rows()).unwrap();
        assert_eq!(items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_status_sorts_by_name() {
        let query = ListQuery::default().sort_by(Sort::asc("status"));
        let (items, _) = query.apply(rows()).unwrap();
        assert_eq!(items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_equals_and_in_filters() {
        let query = ListQuery::default()
            .filter(Filter::equals("user_id", 10i64))
            .filter(Filter::any_of("status", [ReservationStatus::Pending, ReservationStatus::Confirmed]));
        let (items, total) = query.apply(rows()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, 3);
    }

    #[test]
    fn test_search_combinators() {
        let or = ListQuery::default().filter(Filter::search("school", &["contact_info", "local_reservation_code"], Combinator::Or));
        assert_eq!(or.apply(rows()).unwrap().1, 3);

        let and = ListQuery::default().filter(Filter::search("school", &["contact_info", "local_reservation_code"], Combinator::And));
        assert_eq!(and.apply(rows()).unwrap().1, 0);

        let case = ListQuery::default().filter(Filter::search("GAMMA", &["contact_info"], Combinator::Or));
        assert_eq!(case.apply(rows()).unwrap().1, 1);
    }

    #[test]
    fn test_pagination_reports_full_total() {
        let (items, total) = ListQuery::new(2, 3).apply(rows()).unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 4);

        let (beyond, total) = ListQuery::new(5, 3).apply(rows()).unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 4);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let bad_filter = ListQuery::default().filter(Filter::equals("seats", 1i64));
        assert_matches!(bad_filter.apply(rows()), Err(BookingError::InvalidInput(_)));

        let bad_sort = ListQuery::default().sort_by(Sort::asc("name"));
        assert_matches!(bad_sort.apply(rows()), Err(BookingError::InvalidInput(_)));

        let bad_value = ListQuery::default().filter(Filter::equals("status", "rejected"));
        assert_matches!(bad_value.apply(rows()), Err(BookingError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_page_is_rejected() {
        assert_matches!(ListQuery::new(0, 10).apply(rows()), Err(BookingError::InvalidInput(_)));
        assert_matches!(ListQuery::new(1, 0).apply(rows()), Err(BookingError::InvalidInput(_)));
    }
}
