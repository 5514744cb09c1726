// Schools module - school accounts and the spotted board

pub mod export;
pub mod school_models;
mod school_service;

pub use school_models::{CsvExport, Dashboard, School, SpottedFeed};
pub use school_service::{SchoolError, SchoolService, SchoolStore};
