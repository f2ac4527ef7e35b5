//! Records café sales from free-text messages into a Google Sheets ledger.
//!
//! A message goes through [`pipeline::SalesPipeline`]: the product catalog is
//! read from the products sheet, a prompt is sent to the completion oracle,
//! the JSON in its reply is extracted and normalized into seven-column rows,
//! and the rows are written to the entries sheet.

pub mod catalog;
pub mod config;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod prompt;
pub mod sheets;
pub mod validate;
pub mod writer;
