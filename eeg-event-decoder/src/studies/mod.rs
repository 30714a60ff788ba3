//! Study-specific helpers

pub mod semantics;

pub use semantics::{
    condition_from_filename, group_subject_files, merged_event_id, Condition, SubjectFiles,
};
