//! Core building blocks: job parameters, report rendering, archive member selection,
//! the completed-URL log, the archive pipeline, the STAC model and the size backfill.
//! These are consumed by the high-level `api` module.
pub mod catalog;
pub mod params;
pub mod pipeline;
pub mod processed;
pub mod report;
pub mod selection;
pub mod sizes;
