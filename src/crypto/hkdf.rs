// SPDX-License-Identifier: MIT OR Apache-2.0

//! HKDF key-derivation (RFC 5869) with SHA2-256.
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

/// Derives key material of the requested length from input key material and a context label.
///
/// The `info` label separates derivations for different purposes from each other, make sure it is
/// unique per use-case within the protocol.
pub fn hkdf<const N: usize>(
    salt: Option<&[u8]>,
    ikm: &[u8],
    info: &[u8],
) -> Result<[u8; N], HkdfError> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut out = [0u8; N];
    hkdf.expand(info, &mut out)
        .map_err(|_| HkdfError::InvalidOutputLength)?;
    Ok(out)
}

#[derive(Debug, Error)]
pub enum HkdfError {
    #[error("requested output size is too large for hkdf expansion")]
    InvalidOutputLength,
}

#[cfg(test)]
mod tests {
    use super::hkdf;

    #[test]
    fn deterministic_derivation() {
        let okm_1: [u8; 32] = hkdf(None, b"input key material", b"test").unwrap();
        let okm_2: [u8; 32] = hkdf(None, b"input key material", b"test").unwrap();
        assert_eq!(okm_1, okm_2);
    }

    #[test]
    fn context_separates_derivations() {
        let okm_1: [u8; 32] = hkdf(None, b"input key material", b"context a").unwrap();
        let okm_2: [u8; 32] = hkdf(None, b"input key material", b"context b").unwrap();
        assert_ne!(okm_1, okm_2);
    }
}
