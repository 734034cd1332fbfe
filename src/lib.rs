// Library exports for trendmorph
// The binary and the integration tests both build on these modules

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod state;
pub mod trends;
