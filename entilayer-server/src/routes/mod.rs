//! Route handlers organized by resource

pub mod entities;
pub mod health;
