// lib.rs

pub mod alarm;
pub mod api;
pub mod app;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod mutation;
pub mod notify;
pub mod reminder;
pub mod store;
pub mod task;
pub mod tui;

pub use crate::error::{Error, Result};
