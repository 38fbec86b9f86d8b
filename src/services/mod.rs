pub mod ai;
pub mod batch;
pub mod changelog;
pub mod diff;
pub mod encoding;
pub mod flatten;
pub mod locale_file;
pub mod merge;
pub mod snapshot;
pub mod sync;
