//! Dealflow List Core
//!
//! Client-side paging, windowing and scoring for the deal CRM: infinite
//! scroll over remote collections (`PagedLoader` / `PageCursor`), the render
//! window of long lists (`WindowedList`), and the composite opportunity score
//! of a lead (`ScoreCalculator`).

pub mod constants;
pub mod domain;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod services;
pub mod state;

pub use domain::score::{ScoreCalculator, score_opportunity};
pub use domain::window::WindowedList;
pub use error::{Error, FetchError, Result};
pub use services::{LoadOutcome, PageSource, PagedLoader};
pub use state::{AccumulatedList, PageCursor};
