/*
 * store.rs
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

//! Trust-on-first-use store: hostname -> last accepted certificate, persisted as JSON.
//!
//! One lock guards the whole map. Verification holds the write lock for the entire decision
//! (policy call and flush included), so concurrent verifications serialize and the file is
//! never written by two threads at once. Files are written to a sibling temporary file and
//! renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio_rustls::rustls::pki_types::CertificateDer;
use tracing::{debug, info, warn};

use crate::config::{ensure_private_dir, open_private_file_for_write};
use crate::error::{GeminiError, RejectReason, Result};
use crate::trust::policy::{DefaultTrustPolicy, TrustPolicy};
use crate::trust::record::{CertificateRecord, KnownHosts};

/// Which transition a successful verification took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustOutcome {
    /// Host was unknown; its certificate is now stored.
    FirstSeen,
    /// Fingerprint matched the stored one; only the last-seen time changed.
    Matched,
    /// Host presented a new certificate and the policy accepted it.
    Changed,
}

/// Known hosts store. Construct once and share (e.g. `Arc<TrustStore>`) with every request.
pub struct TrustStore {
    path: PathBuf,
    known: RwLock<KnownHosts>,
    policy: Box<dyn TrustPolicy>,
}

impl TrustStore {
    /// Open the store at `path` with the default policy. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let known = read_known_hosts(&path)?.unwrap_or_default();
        debug!(path = %path.display(), hosts = known.hosts.len(), "loaded known hosts");
        Ok(Self {
            path,
            known: RwLock::new(known),
            policy: Box::new(DefaultTrustPolicy),
        })
    }

    /// Replace the trust policy.
    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: TrustPolicy + 'static,
    {
        self.policy = Box::new(policy);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, KnownHosts> {
        self.known.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KnownHosts> {
        self.known.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-read the file, replacing the in-memory map. A missing file empties the store.
    pub fn load(&self) -> Result<()> {
        let mut known = self.write();
        *known = read_known_hosts(&self.path)?.unwrap_or_default();
        Ok(())
    }

    /// Write the current map to disk.
    pub fn save(&self) -> Result<()> {
        let known = self.read();
        self.persist(&known)
    }

    fn persist(&self, known: &KnownHosts) -> Result<()> {
        write_known_hosts(&self.path, known).map_err(|source| GeminiError::PersistenceFailure {
            path: self.path.clone(),
            source,
        })
    }

    /// Decide whether `peer_certificates` (leaf first) may be trusted for `host`.
    pub fn verify(&self, host: &str, peer_certificates: &[CertificateDer<'_>]) -> Result<TrustOutcome> {
        let leaf = peer_certificates.first().ok_or(GeminiError::NoPeerCertificate)?;
        let host = host.to_ascii_lowercase();
        let now = Utc::now();
        let mut candidate = CertificateRecord::from_certificate(leaf, now);

        let mut known = self.write();
        let Some(old) = known.hosts.get(&host).cloned() else {
            let decision = self.policy.on_first_seen(&host, &candidate);
            if !decision.accept {
                warn!(host = %host, fingerprint = %candidate.fingerprint, "first certificate rejected");
                return Err(GeminiError::CertificateRejected {
                    host,
                    reason: RejectReason::FirstSeen,
                });
            }
            candidate.trust = decision.trust;
            let fingerprint = candidate.fingerprint.clone();
            known.hosts.insert(host.clone(), candidate);
            if let Err(e) = self.persist(&known) {
                known.hosts.remove(&host);
                return Err(e);
            }
            info!(host = %host, fingerprint = %fingerprint, trust = ?decision.trust, "trusting new host");
            return Ok(TrustOutcome::FirstSeen);
        };

        if old.fingerprint == candidate.fingerprint {
            if let Some(record) = known.hosts.get_mut(&host) {
                record.last_seen = now;
            }
            // A failed last-seen flush never fails the request.
            if let Err(e) = self.persist(&known) {
                warn!(host = %host, error = %e, "could not persist last-seen time");
            }
            return Ok(TrustOutcome::Matched);
        }

        let decision = self.policy.on_certificate_changed(&host, &old, &candidate);
        if !decision.accept {
            warn!(
                host = %host,
                stored = %old.fingerprint,
                presented = %candidate.fingerprint,
                "certificate changed and was rejected"
            );
            return Err(GeminiError::CertificateRejected {
                host,
                reason: RejectReason::Changed,
            });
        }
        candidate.first_seen = old.first_seen;
        candidate.trust = decision.trust;
        let fingerprint = candidate.fingerprint.clone();
        known.hosts.insert(host.clone(), candidate);
        if let Err(e) = self.persist(&known) {
            known.hosts.insert(host, old);
            return Err(e);
        }
        info!(
            host = %host,
            old = %old.fingerprint,
            new = %fingerprint,
            trust = ?decision.trust,
            "accepted changed certificate"
        );
        Ok(TrustOutcome::Changed)
    }

    /// Stored record for `host`, if any.
    pub fn get(&self, host: &str) -> Option<CertificateRecord> {
        self.read().hosts.get(&host.to_ascii_lowercase()).cloned()
    }

    /// Known hostnames, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.read().hosts.keys().cloned().collect();
        hosts.sort();
        hosts
    }

    pub fn len(&self) -> usize {
        self.read().hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().hosts.is_empty()
    }

    /// Forget `host`. Returns whether it was known. Always persists.
    pub fn remove(&self, host: &str) -> Result<bool> {
        let host = host.to_ascii_lowercase();
        let mut known = self.write();
        let removed = known.hosts.remove(&host);
        if let Err(e) = self.persist(&known) {
            if let Some(record) = removed {
                known.hosts.insert(host, record);
            }
            return Err(e);
        }
        Ok(removed.is_some())
    }

    /// Forget every host. Always persists.
    pub fn clear(&self) -> Result<()> {
        let mut known = self.write();
        let previous = std::mem::take(&mut known.hosts);
        if let Err(e) = self.persist(&known) {
            known.hosts = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("path", &self.path)
            .field("hosts", &self.len())
            .finish()
    }
}

/// None if the file does not exist.
fn read_known_hosts(path: &Path) -> Result<Option<KnownHosts>> {
    let raw = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(GeminiError::PersistenceFailure {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| GeminiError::MalformedTrustStore {
            path: path.to_path_buf(),
            source,
        })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "known_hosts".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

fn write_known_hosts(path: &Path, known: &KnownHosts) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_private_dir(parent)?;
        }
    }
    let data = serde_json::to_vec_pretty(known)?;
    let tmp = temp_path(path);
    let written = (|| {
        let mut f = open_private_file_for_write(&tmp)?;
        f.write_all(&data)?;
        f.write_all(b"\n")?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}
