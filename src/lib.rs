//! docman - document management backend shell
//!
//! This library provides settings, the process-scoped logging subsystem and the
//! HTTP application shell.

pub mod config;
pub mod http;
pub mod logging;
