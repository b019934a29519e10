//! `marquee-recon`: composite-key record reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns new tables.
//! No CLI or file IO.

pub mod antijoin;
pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod join;
pub mod key;
pub mod load;
pub mod merge;
pub mod model;
pub mod recipes;

pub use antijoin::filter_duplicates;
pub use config::{JobKind, ReconConfig};
pub use engine::{run, ReconInput, ReconReport};
pub use error::ReconError;
pub use group::{group_by_key, reconcile, DuplicateGroup, Reconciler};
pub use join::left_join;
pub use key::{derive_key, CompositeKey, KeyExtractor, NullKeyPolicy};
pub use load::{load_csv_table, parse_gross, write_csv};
pub use merge::{MergeRule, MergeSpec, CONCAT_DELIMITER};
pub use model::{Column, Record, Schema, Table, Value, ValueType};
pub use recipes::{add_rereleases, filter_cross_table, merge_character_actors, Role};
