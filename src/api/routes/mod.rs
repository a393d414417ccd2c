//! API Routes
//!
//! Route handlers organized by functionality.

pub mod dashboard;
pub mod documents;
pub mod files;
pub mod health;
pub mod investors;
pub mod messages;
pub mod pages;
