/*
 * lib.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Astrolabio, a Gemini protocol client.
 *
 * Astrolabio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Astrolabio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Astrolabio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Astrolabio core: Gemini client with trust-on-first-use certificate pinning.
//!
//! ```no_run
//! # async fn run() -> astrolabio_core::Result<()> {
//! use std::sync::Arc;
//! use astrolabio_core::{config, GeminiClient, TrustStore};
//!
//! let path = config::default_known_hosts_path().unwrap_or_else(|| "known_hosts.json".into());
//! let store = TrustStore::open(path)?;
//! let client = GeminiClient::new(Arc::new(store));
//! let mut response = client.get("gemini://geminiprotocol.net/").await?;
//! if response.status().is_success() {
//!     let body = response.read_body().await?;
//!     println!("{}", String::from_utf8_lossy(&body));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod trust;
pub mod uri;

pub use error::{GeminiError, RejectReason, Result};
pub use protocol::gemini::{Category, GeminiClient, Response, StatusCode};
pub use trust::{
    CertificateRecord, DefaultTrustPolicy, FnTrustPolicy, TrustDecision, TrustLevel, TrustOutcome,
    TrustPolicy, TrustStore,
};
