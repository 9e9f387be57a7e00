//! Checks websites' privacy policies for mentions of sensitive-data phrases.
//!
//! Pipeline: [`source`] reads the site list, [`processor`] fetches each
//! site's policy page through [`fetch`] and [`extract`], [`matcher`] looks
//! for the phrases, and [`export`] writes Y/N/NA results to a file or back
//! to the spreadsheet via [`sheets`].

pub mod config;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod matcher;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod sheets;
pub mod source;

pub use config::Settings;
pub use pipeline::{run, RunConfig, RunSummary};
pub use record::{Flag, ResultRecord};
