//! Geoflow Engine Library
//!
//! Scheduling and execution of AI analysis workflows for the geospatial
//! catalog.

pub mod app;
pub mod clients;
pub mod errors;
pub mod execute;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod schedule;
pub mod server;
pub mod steps;
pub mod storage;
pub mod store;
pub mod utils;
pub mod workers;
