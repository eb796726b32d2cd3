//! auth
//!
//! Editor authentication against the source-control host.
//!
//! A credential is accepted only when the host recognises it *and* the
//! account behind it is a collaborator on the site repository. See
//! [`AccessVerifier`] for the exact sequence.

mod errors;
mod verifier;

pub use errors::AuthError;
pub use verifier::AccessVerifier;
