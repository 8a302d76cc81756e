//! Business layer of the auth gateway.
//! - Validates inbound bodies and orchestrates the account and token services.
//! - Talks to downstream services through one shared HTTP client.
//! - Classifies failures into stable codes and the problem envelope.

pub mod auth;
pub mod classify;
pub mod downstream;
pub mod observability;
pub mod problem;
pub mod proxy;
pub mod validation;
