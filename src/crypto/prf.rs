//! TLS pseudorandom functions (RFC 5246 5, RFC 2246 5).
//!
//! DTLS 1.2 negotiations use the SHA-256 PRF (or SHA-384 for the suites
//! that specify it); DTLS 1.0 uses the split-secret MD5 xor SHA-1
//! construction inherited from TLS 1.0/1.1.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384};

use crate::alert::AlertDescription;
use crate::buffer::{Buf, ToBuf};
use crate::error::Error;
use crate::message::{CipherSuite, ProtocolVersion};

/// PRF selector stored in the security parameters once the cipher suite is
/// known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfAlgorithm {
    /// TLS 1.0/1.1 MD5 xor SHA-1 split-secret PRF.
    TlsPrfLegacy,
    /// TLS 1.2 PRF with HMAC-SHA256.
    TlsPrfSha256,
    /// TLS 1.2 PRF with HMAC-SHA384 (RFC 5289 suites).
    TlsPrfSha384,
}

impl PrfAlgorithm {
    /// PRF implied by the negotiated suite and version. Only DTLS 1.2 uses
    /// the per-suite hash; anything earlier is pinned to the legacy PRF.
    pub fn for_cipher_suite(suite: CipherSuite, version: ProtocolVersion) -> PrfAlgorithm {
        if version != ProtocolVersion::DTLS1_2 {
            PrfAlgorithm::TlsPrfLegacy
        } else if suite.uses_sha384_prf() {
            PrfAlgorithm::TlsPrfSha384
        } else {
            PrfAlgorithm::TlsPrfSha256
        }
    }
}

// P_hash (RFC 5246 5): HMAC chaining A(i) = HMAC(secret, A(i-1)),
// output = HMAC(secret, A(1) + seed) + HMAC(secret, A(2) + seed) + ...
fn p_hash<M>(secret: &[u8], label_seed: &[u8], output: &mut [u8]) -> Result<(), Error>
where
    M: Mac + hmac::digest::KeyInit,
{
    let new_mac = || {
        <M as Mac>::new_from_slice(secret).map_err(|e| {
            Error::alert(AlertDescription::InternalError, format!("HMAC init: {}", e))
        })
    };

    // A(1) = HMAC(secret, label + seed)
    let mut mac = new_mac()?;
    mac.update(label_seed);
    let mut a = mac.finalize().into_bytes();

    let mut written = 0;
    while written < output.len() {
        let mut mac = new_mac()?;
        mac.update(&a);
        mac.update(label_seed);
        let chunk = mac.finalize().into_bytes();

        let remaining = output.len() - written;
        let to_copy = remaining.min(chunk.len());
        output[written..written + to_copy].copy_from_slice(&chunk[..to_copy]);
        written += to_copy;

        if written < output.len() {
            let mut mac = new_mac()?;
            mac.update(&a);
            a = mac.finalize().into_bytes();
        }
    }

    Ok(())
}

/// `PRF(secret, label, seed)` producing `output_len` bytes.
pub fn prf(
    algorithm: PrfAlgorithm,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Buf, Error> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label.as_bytes());
    label_seed.extend_from_slice(seed);

    let mut output = vec![0u8; output_len];

    match algorithm {
        PrfAlgorithm::TlsPrfSha256 => {
            p_hash::<Hmac<Sha256>>(secret, &label_seed, &mut output)?;
        }
        PrfAlgorithm::TlsPrfSha384 => {
            p_hash::<Hmac<Sha384>>(secret, &label_seed, &mut output)?;
        }
        PrfAlgorithm::TlsPrfLegacy => {
            // RFC 2246 5: split the secret, P_MD5 over the first half xor
            // P_SHA1 over the second half, halves overlapping when odd.
            let half = (secret.len() + 1) / 2;
            let s1 = &secret[..half];
            let s2 = &secret[secret.len() - half..];

            p_hash::<Hmac<Md5>>(s1, &label_seed, &mut output)?;

            let mut sha_out = vec![0u8; output_len];
            p_hash::<Hmac<Sha1>>(s2, &label_seed, &mut sha_out)?;

            for (o, s) in output.iter_mut().zip(sha_out.iter()) {
                *o ^= s;
            }
        }
    }

    Ok(output.to_buf())
}

/// `master_secret = PRF(premaster, "master secret", client_random +
/// server_random, 48)` (RFC 5246 8.1).
pub fn calculate_master_secret(
    algorithm: PrfAlgorithm,
    premaster_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
) -> Result<Buf, Error> {
    let mut seed = Vec::with_capacity(client_random.len() + server_random.len());
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);

    prf(algorithm, premaster_secret, "master secret", &seed, 48)
}

/// Finished verify_data: the PRF over the transcript hash, truncated to
/// `verify_data_length` (RFC 5246 7.4.9).
pub fn calculate_verify_data(
    algorithm: PrfAlgorithm,
    master_secret: &[u8],
    label: &str,
    transcript_hash: &[u8],
    verify_data_length: usize,
) -> Result<Vec<u8>, Error> {
    let out = prf(
        algorithm,
        master_secret,
        label,
        transcript_hash,
        verify_data_length,
    )?;
    Ok(out.to_vec())
}
