//! API Routes
//!
//! Route handlers organized by functionality.

pub mod auth;
pub mod draw;
pub mod groceries;
pub mod hats;
pub mod health;
pub mod meals;
pub mod shopping;
