pub mod api;
pub mod auth;
pub mod availability;
pub mod demo;
pub mod error;
pub mod orders;
pub mod reconcile;
pub mod store;
pub mod sweeper;
