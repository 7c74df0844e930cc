// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

use crate::crypto::{Rng, RngError};

/// Fixed-size container for secret bytes: file keys and X25519 scalars.
///
/// The bytes are zeroised when the container drops, compared in constant time and never shown in
/// debug output. Access stays crate-private so secret material cannot leak through the public
/// API. Side-channel resistance remains best-effort, it depends on the hardware and the
/// surrounding deployment as much as on this code.
#[derive(Clone, Eq, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct Secret<const N: usize>(#[serde(with = "serde_bytes")] [u8; N]);

impl<const N: usize> Secret<N> {
    pub(crate) fn random(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self(rng.random_bytes()?))
    }

    pub(crate) fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> PartialEq for Secret<N> {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison.
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl<const N: usize> fmt::Debug for Secret<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret<{N}>([redacted])")
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::Secret;

    #[test]
    fn equality_and_redaction() {
        let secret = Secret::from_bytes([1u8; 32]);
        assert_eq!(secret, Secret::from_bytes([1u8; 32]));
        assert_ne!(secret, Secret::from_bytes([2u8; 32]));

        // Secret bytes never appear in debug output.
        assert_eq!(format!("{secret:?}"), "Secret<32>([redacted])");
    }

    #[test]
    fn random_secrets_differ() {
        let rng = Rng::from_seed([3; 32]);
        let secret_1: Secret<32> = Secret::random(&rng).unwrap();
        let secret_2: Secret<32> = Secret::random(&rng).unwrap();
        assert_ne!(secret_1, secret_2);
    }
}
