//! Auth workflows: request/response types, typed errors, downstream provider
//! seams and the orchestrating service.

pub mod domain;
pub mod errors;
pub mod providers;
pub mod service;

pub use errors::AuthError;
pub use service::AuthService;
