//! External service integrations.
//!
//! Email delivery over SMTP or the Gmail API, and the OAuth credential the
//! Gmail API transport needs.

pub mod credentials;
pub mod email;
pub mod gmail;
