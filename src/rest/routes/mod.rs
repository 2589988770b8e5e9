//! REST API route handlers.

pub mod health;
pub mod pages;
pub mod wizards;
