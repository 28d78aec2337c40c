//! HTTP control API models for the geoflow engine

pub mod models;
