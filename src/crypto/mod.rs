//! PRF support for the Finished exchange and master secret derivation.
//!
//! Record protection, key exchange arithmetic and certificate handling are
//! the embedding stack's concern and stay behind the policy traits.

mod prf;

pub use prf::{calculate_master_secret, calculate_verify_data, prf, PrfAlgorithm};
