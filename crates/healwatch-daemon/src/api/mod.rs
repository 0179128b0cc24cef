//! Outward API surfaces

pub mod rest;
