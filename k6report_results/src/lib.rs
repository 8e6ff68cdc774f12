//! Crate regarding k6 'results' files
//!
//! A results file is the streaming JSON output of a k6 run: JSON objects
//! written back to back with no enclosing array. This crate reads those
//! files, folds them into per-source summaries and reduces the summaries
//! into a single [`reduce::Report`] with threshold verdicts.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![allow(clippy::multiple_crate_versions)]

pub mod aggregate;
pub mod naming;
pub mod record;
pub mod reduce;
pub mod stats;
pub mod stream;
pub mod threshold;
