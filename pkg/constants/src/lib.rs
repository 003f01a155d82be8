//! Centralized constants for bigip-ipam.
//!
//! Annotation keys, record naming, store layout and process defaults
//! live here so that every crate agrees on the same strings.

pub mod annotations;
pub mod env;
pub mod network;
pub mod paths;
pub mod record;
pub mod state;
