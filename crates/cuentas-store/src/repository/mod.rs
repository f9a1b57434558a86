//! # Repository Module
//!
//! SQL-backed repositories. The counter is the only persisted entity.
//!
//! - [`SqliteSequenceStore`] - the `invoice_counter` row

pub mod counter;

pub use counter::SqliteSequenceStore;
