//! HTTP request handlers organized by resource

pub mod documents;
pub mod health;
pub mod libraries;
pub mod permissions;
