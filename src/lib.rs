#[macro_use]
extern crate rust_i18n;

pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod events;
pub mod shutdown;
pub mod startup;
pub mod suggestions;
pub mod web;

// Initialize i18n
i18n!("locales", fallback = "en");
