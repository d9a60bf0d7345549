//! Core engine: the publish run, its cron triggers, and the restart loop.

pub mod publisher;
pub mod scheduler;
pub mod supervisor;
