//! # QuickCart order server
//! This module hosts the HTTP surface for the QuickCart order service. It is responsible for:
//! * Accepting new orders from authenticated customers and initiating payment for them.
//! * Listening for incoming webhook events from Stripe and reconciling order state against them.
//! * Exposing fetch, search, and operator endpoints for orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/auth`: Issues access tokens for the order endpoints.
//! * `/api/orders` and friends: The order lifecycle endpoints.
//! * `/webhook/stripe`: The webhook route for receiving payment events from Stripe.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod stripe_routes;

#[cfg(test)]
mod endpoint_tests;
