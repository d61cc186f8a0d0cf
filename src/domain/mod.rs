//! Domain - Pure Data Structures
//!
//! These types don't perform I/O and represent the list core's business
//! domain: records, filters, pages, windowing and scoring.

pub mod config;
pub mod filter;
pub mod lead;
pub mod page;
pub mod record;
pub mod score;
pub mod window;
