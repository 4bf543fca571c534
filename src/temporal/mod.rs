//! Temporal expression resolution.
//!
//! Turns the date phrases observed in analytics questions into inclusive
//! timestamp ranges: relative keywords ("сегодня", "прошлая неделя"), exact
//! dates ("15 января 2024", "15.01.2024"), explicit ranges ("с ... по ..."),
//! trailing periods ("за последние 7 дней") and quarters ("3 квартал 2024").
//!
//! The vocabulary is fixed to the observed set; this is not a general date
//! parser.

mod range;
mod resolver;

pub use range::TemporalRange;
pub use resolver::TemporalResolver;
