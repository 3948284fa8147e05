//! In-memory holder for the long-lived access token
//!
//! The token is kept XOR-masked with a random pad so that the plain value
//! does not sit in memory between requests. Both buffers are wiped on drop.
//! The only way to read it back is [`Credential::authorization`], which
//! produces a single header value that is itself wiped when dropped.

use std::fmt;

use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{InputError, InputResult};

const BEARER_PREFIX: &str = "Bearer ";

/// Bearer token for the Home Assistant REST API
pub struct Credential {
    pad: Zeroizing<Vec<u8>>,
    masked: Zeroizing<Vec<u8>>,
}

impl Credential {
    /// Store a token, rejecting empty or whitespace-only values
    pub fn new(token: &str) -> InputResult<Self> {
        if token.trim().is_empty() {
            return Err(InputError::EmptyToken);
        }

        let mut pad = Zeroizing::new(vec![0u8; token.len()]);
        rand::thread_rng().fill_bytes(&mut pad);

        let masked = token
            .bytes()
            .zip(pad.iter())
            .map(|(byte, key)| byte ^ key)
            .collect();

        Ok(Self {
            pad,
            masked: Zeroizing::new(masked),
        })
    }

    /// Produce the `Authorization` header value for one request
    ///
    /// The returned buffer is sized up front so the plain token is never
    /// reallocated, and it is zeroed when the caller drops it.
    pub fn authorization(&self) -> Zeroizing<String> {
        let plain: Zeroizing<Vec<u8>> = Zeroizing::new(
            self.masked
                .iter()
                .zip(self.pad.iter())
                .map(|(byte, key)| byte ^ key)
                .collect(),
        );

        let mut header = Zeroizing::new(String::with_capacity(BEARER_PREFIX.len() + plain.len()));
        header.push_str(BEARER_PREFIX);
        // Masked bytes came from a &str, so this never allocates a lossy copy
        header.push_str(&String::from_utf8_lossy(&plain));
        header
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
