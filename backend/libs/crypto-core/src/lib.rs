//! Token primitives shared by reel services.

pub mod jwt;

pub use jwt::{Claims, JwtKeys};
