//! Resource model shared by the controller, the state store and the API.

pub mod annotation;
pub mod config;
pub mod configmap;
pub mod event;
pub mod ipaddress;
pub mod meta;
pub mod service;
pub mod validate;
pub mod virtual_server;

pub use meta::{ObjectMeta, OwnerReference, Resource};
