//! Security-handler interface.
//!
//! Cipher implementations live outside the core; this module defines the
//! contract the registry and document need from them: credentials,
//! permissions decoded from `/P`, the authentication outcome, and the
//! decryption hooks applied to strings and stream bodies during
//! resolution.

use crate::error::Result;
use crate::object::ObjectRef;
use bitflags::bitflags;

/// Credentials supplied to [`SecurityHandler::authenticate`].
#[derive(Debug, Clone)]
pub enum Credentials {
    /// User or owner password
    Password(String),
    /// Certificate-based credentials (public-key security handlers)
    Certificate {
        /// DER-encoded certificate
        certificate: Vec<u8>,
        /// Private key material
        key: Vec<u8>,
    },
}

bitflags! {
    /// User access permissions from the encryption dictionary `/P` entry
    /// (PDF 32000-1:2008, Table 22).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        /// Print the document
        const PRINT = 1 << 2;
        /// Modify contents
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics
        const COPY = 1 << 4;
        /// Add or modify annotations and form fields
        const ANNOTATE = 1 << 5;
        /// Fill in existing form fields
        const FILL_FORMS = 1 << 8;
        /// Extract for accessibility
        const EXTRACT_ACCESSIBLE = 1 << 9;
        /// Assemble (insert, rotate, delete pages)
        const ASSEMBLE = 1 << 10;
        /// Print at full resolution
        const PRINT_HIGH_RES = 1 << 11;
    }
}

impl Permissions {
    /// Decode the signed 32-bit `/P` value.
    pub fn from_p_value(p: i64) -> Self {
        Permissions::from_bits_truncate(p as u32)
    }
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    /// Whether any password was accepted
    pub authenticated: bool,
    /// Whether the owner password was accepted
    pub is_owner: bool,
    /// Granted permissions
    pub permissions: Permissions,
}

impl AuthResult {
    /// The result for an unencrypted or unauthenticated document.
    pub fn denied() -> Self {
        Self {
            authenticated: false,
            is_owner: false,
            permissions: Permissions::empty(),
        }
    }

    /// Full access, as for an unencrypted document.
    pub fn full_access() -> Self {
        Self {
            authenticated: true,
            is_owner: true,
            permissions: Permissions::all(),
        }
    }
}

/// Contract between the core and an installed security handler.
///
/// The registry calls the decrypt hooks while resolving objects of an
/// authenticated document; strings and stream bodies only, keyed by the
/// owning indirect object so the handler can derive per-object keys.
pub trait SecurityHandler: std::fmt::Debug {
    /// Attempt to authenticate with the given credentials.
    fn authenticate(&mut self, credentials: &Credentials) -> Result<AuthResult>;

    /// Whether a previous authentication succeeded.
    fn is_authenticated(&self) -> bool;

    /// Decrypt a string value belonging to object `owner`.
    fn decrypt_string(&self, owner: ObjectRef, data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a stream payload belonging to object `owner`.
    fn decrypt_stream(&self, owner: ObjectRef, data: &[u8]) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_from_p() {
        // /P with print and copy granted (PDF 32000-1 numbers bits from 1)
        let p = Permissions::from_p_value(0b0001_0100);
        assert!(p.contains(Permissions::PRINT));
        assert!(p.contains(Permissions::COPY));
        assert!(!p.contains(Permissions::MODIFY));
    }

    #[test]
    fn test_negative_p_value() {
        // /P is stored as a signed integer with high bits set
        let p = Permissions::from_p_value(-44);
        assert!(p.contains(Permissions::PRINT));
        assert!(p.contains(Permissions::COPY));
        assert!(!p.contains(Permissions::MODIFY));
    }

    #[test]
    fn test_auth_result_defaults() {
        assert!(!AuthResult::denied().authenticated);
        assert!(AuthResult::full_access().permissions.contains(Permissions::MODIFY));
    }
}
