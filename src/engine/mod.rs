//! Tree algorithms: deep merge and structural diff.
//!
//! Both are pure functions over `ConfigTree`; the store and the reconciler
//! own all I/O and state.

pub mod diff;
pub mod merge;

pub use diff::{apply, diff, diff_mappings, DiffEntry};
pub use merge::{merge, MergeOutcome};
