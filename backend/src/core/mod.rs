//! Core engine primitives: calendar and cycle context

pub mod calendar;
