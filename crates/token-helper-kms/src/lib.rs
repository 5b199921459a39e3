//! Google Cloud KMS implementation of the `Cipher` capability.
//! Talks to the KMS REST API with `reqwest`; access tokens come from the
//! usual Google credential sources.

pub mod credentials;
pub mod gcp;
