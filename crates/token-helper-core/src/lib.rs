//! Core abstractions for the token helper: the `Cipher` capability and the
//! `TokenStore` that keeps a single token encrypted on disk.
//! This crate does no cryptography of its own and stays free of vendor clients.

pub mod cipher;
pub mod input;
pub mod store;
pub mod token_file;
