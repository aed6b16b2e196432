//! Part math and upload planning.
//!
//! Splits a file into fixed-size parts with 1-based part numbers and
//! half-open byte ranges, covering the file exactly once. The plan is the
//! unit of work the transfer engine drains.

mod part;

pub use part::{plan_parts, Part};
