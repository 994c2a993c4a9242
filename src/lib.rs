//! Concierge library exports for testing

pub mod core;
pub mod runtime;
pub mod services;
pub mod transport;

#[cfg(test)]
pub mod test_support;
