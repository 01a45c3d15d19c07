//! `flowcast` subcommands.

pub mod common;
pub mod config;
pub mod forecast;
pub mod route;
pub mod traffic;
