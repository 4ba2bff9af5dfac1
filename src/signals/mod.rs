//! Client signals: elapsed time, rule-based scoring and follow-up cadence.
//!
//! Everything in here is a pure function of a record snapshot and an explicit
//! `now`. Nothing reads the wall clock or touches the record store.

pub mod cadence;
pub mod elapsed;
pub mod scoring;
