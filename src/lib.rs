//! Campaign performance grid: filter, sort, paginate and export an in-memory
//! campaign dataset, with a terminal front end.

pub mod config;
pub mod controller;
pub mod domain;
pub mod export;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod presentation;
pub mod table;
pub mod ui;
