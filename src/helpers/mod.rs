pub mod calendar;
pub mod client;
pub mod slots;
