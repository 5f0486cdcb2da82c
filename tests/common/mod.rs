mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from plantcount for tests
pub use plantcount::{
    CountConfig, CountOutcome, PlantCounter, PlantError, RecordStore, ResultReporter, RunRecord,
};
