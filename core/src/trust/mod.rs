/*
 * mod.rs
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

//! Server certificate trust (TOFU): known hosts records, decision policy, persisted store.

pub mod policy;
pub mod record;
pub mod store;

pub use policy::{DefaultTrustPolicy, FnTrustPolicy, TrustDecision, TrustPolicy};
pub use record::{fingerprint, CertificateRecord, KnownHosts, TrustLevel, KNOWN_HOSTS_VERSION};
pub use store::{TrustOutcome, TrustStore};
