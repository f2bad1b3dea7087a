//! API handlers for the tokengate service.
//!
//! `auth` owns login, logout and the access guard; the remaining modules are
//! plain handlers that run either in front of or behind that guard.

pub mod auth;
pub mod health;
pub mod hello;
pub mod protected;
