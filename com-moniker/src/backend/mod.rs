//! COM-backed implementation of [`MonikerProvider`](crate::MonikerProvider).

pub mod client;
pub mod resolver;
