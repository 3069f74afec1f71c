//! # Telebazaar
//!
//! A classifieds marketplace Telegram bot for phones and gadgets: a
//! multi-step sell workflow (category, brand, model, price, description,
//! city, photo, phone, manual payment, receipt), a moderation lifecycle
//! (pending, approved/rejected, sold) and a companion mini-app JSON API
//! backed by the same advertisement service.

pub mod api;
pub mod app;
pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod lifecycle;
pub mod localization;
pub mod workflow;

pub use app::App;
pub use errors::{AppError, AppResult};
