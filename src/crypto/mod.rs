//! Cryptographic services for request and credential verification.

pub mod hmac;
pub mod signature;
pub mod token;
