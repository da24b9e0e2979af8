//! Wire types shared by the Treats store and its HTTP layer.

pub mod api;
pub mod models;
