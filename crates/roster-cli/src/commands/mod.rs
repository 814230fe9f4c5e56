pub mod format;
pub mod ingest;
pub mod list;
pub mod run;
pub mod show;
pub mod status;
