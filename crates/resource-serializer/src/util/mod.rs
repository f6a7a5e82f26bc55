//! Utility modules for resource serialization.

pub mod datetime;

pub use datetime::{
    format_date, format_datetime_offset, format_duration, format_time_of_day, local_micros,
};
