//! memory engine of the lexem analyzer: snapshotted stack and heap with copy-on-write
//! backtracking, reference counting and a spatial garbage collector.

pub mod analyzer;
pub mod errors;
pub mod intervals;
pub mod memory;
pub mod values;
