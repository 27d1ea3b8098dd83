pub mod calendar;
pub mod slot;
