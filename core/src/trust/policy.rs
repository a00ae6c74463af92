/*
 * policy.rs
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

//! Trust decisions. The store asks the policy whenever a host is new or its certificate
//! changed. Implementations are called with the store locked and must return promptly.

use crate::trust::record::{CertificateRecord, TrustLevel};

/// Outcome of a trust prompt: accept or not, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustDecision {
    pub accept: bool,
    pub trust: TrustLevel,
}

impl TrustDecision {
    pub fn accept(trust: TrustLevel) -> Self {
        Self { accept: true, trust }
    }

    pub fn reject(trust: TrustLevel) -> Self {
        Self {
            accept: false,
            trust,
        }
    }
}

/// Strategy consulted by the trust store. The default methods trust new hosts permanently
/// and refuse changed certificates.
pub trait TrustPolicy: Send + Sync {
    /// First certificate seen for `host`.
    fn on_first_seen(&self, host: &str, candidate: &CertificateRecord) -> TrustDecision {
        let _ = (host, candidate);
        TrustDecision::accept(TrustLevel::Permanent)
    }

    /// `host` presents a certificate different from the stored one.
    fn on_certificate_changed(
        &self,
        host: &str,
        old: &CertificateRecord,
        new: &CertificateRecord,
    ) -> TrustDecision {
        let _ = (host, old, new);
        TrustDecision::reject(TrustLevel::Once)
    }
}

/// Trust on first use, fail closed on change.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTrustPolicy;

impl TrustPolicy for DefaultTrustPolicy {}

/// Policy from two closures, for callers that do not want to define a type.
pub struct FnTrustPolicy<F, C>
where
    F: Fn(&str, &CertificateRecord) -> TrustDecision + Send + Sync,
    C: Fn(&str, &CertificateRecord, &CertificateRecord) -> TrustDecision + Send + Sync,
{
    pub on_first_seen: F,
    pub on_certificate_changed: C,
}

impl<F, C> TrustPolicy for FnTrustPolicy<F, C>
where
    F: Fn(&str, &CertificateRecord) -> TrustDecision + Send + Sync,
    C: Fn(&str, &CertificateRecord, &CertificateRecord) -> TrustDecision + Send + Sync,
{
    fn on_first_seen(&self, host: &str, candidate: &CertificateRecord) -> TrustDecision {
        (self.on_first_seen)(host, candidate)
    }

    fn on_certificate_changed(
        &self,
        host: &str,
        old: &CertificateRecord,
        new: &CertificateRecord,
    ) -> TrustDecision {
        (self.on_certificate_changed)(host, old, new)
    }
}
