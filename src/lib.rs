//! linkhub: link-attribution and lead-capture gateway
//!
//! Mints short-lived tracking tokens for outbound marketing clicks, redirects
//! users to a destination channel, and reconciles inbound webhook events back
//! to the originating token to form Lead records, with at most one lead per
//! click enforced by the storage layer.

pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod structs;
pub mod system;
pub mod utils;
