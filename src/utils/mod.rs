pub mod calendar;
pub mod login_id_cache;
pub mod login_id_filter;
