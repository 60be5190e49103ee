// ─────────────────────────────────────────────────────────────────────
// Resonance — Client SDK
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Caller-facing API over [`resonance_core::ResonanceCore`].
//!
//! ```ignore
//! let core = Arc::new(ResonanceCore::new(CoreConfig::default())?);
//! let client = ResonanceClient::new(core);
//! let body = client.submit(|| fetch(url), &TaskHint::new("fetch")).await;
//! ```

pub mod client;
pub mod token_bucket;

pub use client::{ClientError, ExplainFeatures, Explanation, HedgeOutcome, ResonanceClient};
pub use token_bucket::TokenBucket;
