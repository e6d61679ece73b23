//! App launcher - a small dashboard for apps hosted behind JupyterHub
//!
//! This library provides:
//! - A client for the JupyterHub REST API (current user, create, start, stop and delete named servers)
//! - The "Your Apps" catalog built from servers flagged as apps
//! - The "Create Apps" form that provisions a new app server
//! - A server-rendered page and the HTTP server that serves it

pub mod actions;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod form;
pub mod hub;
pub mod server;

#[cfg(test)]
mod testing;
