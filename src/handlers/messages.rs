//! Success messages returned in `ApiResponse::message`

pub const RESERVATION_CREATED: &str = "Reservation created successfully";
pub const RESERVATION_UPDATED: &str = "Reservation updated successfully";
pub const RESERVATION_CANCELLED: &str = "Reservation cancelled successfully";
pub const RESERVATION_CONFIRMED: &str = "Reservation confirmed successfully";
pub const RESERVATION_RETRIEVED: &str = "Reservation retrieved successfully";
pub const RESERVATION_FOUND: &str = "Reservation found successfully";
pub const ALL_RESERVATIONS_RETRIEVED: &str = "All reservations retrieved successfully";
pub const USER_RESERVATIONS_RETRIEVED: &str = "User reservations retrieved successfully";
pub const EVENT_RESERVATIONS_RETRIEVED: &str = "Reservations retrieved successfully";
pub const USER_EVENT_RESERVATIONS_RETRIEVED: &str = "User event reservations retrieved successfully";

pub const WAITING_LIST_ADDED: &str = "Added to waiting list successfully";
pub const WAITING_LIST_PROCESSED: &str = "Waiting list processed successfully";
pub const WAITING_LIST_RETRIEVED: &str = "Waiting list retrieved successfully";
pub const WAITING_LIST_REORDERED: &str = "Waiting list reordered successfully";
pub const WAITING_LIST_ENTRY_RETRIEVED: &str = "Waiting list entry retrieved successfully";
pub const WAITING_LIST_ENTRY_UPDATED: &str = "Waiting list entry updated successfully";
pub const WAITING_LIST_ENTRY_DELETED: &str = "Waiting list entry deleted successfully";

pub const EVENT_DATE_RETRIEVED: &str = "Event date retrieved successfully";
pub const EVENT_DATES_RETRIEVED: &str = "Event dates retrieved successfully";
pub const EVENT_DATE_LOCK_UPDATED: &str = "Event date lock updated successfully";
pub const EVENT_DATE_RESIZED: &str = "Event date capacity updated successfully";
