pub mod admin;
pub mod auth;
pub mod channels;
pub mod dms;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod scheduler;
pub mod standups;
pub mod users;
