/*
 * config.rs
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

//! Client defaults and on-disk locations.
//! The known hosts file lives in ~/.astrolabio/known_hosts.json unless ASTROLABIO_KNOWN_HOSTS
//! points elsewhere. Files written here are private to the owning user (mode 0o600, directory 0o700).

use std::fs;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Default Gemini port.
pub const DEFAULT_PORT: u16 = 1965;

/// Default bound for connect, TLS handshake and header read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Maximum length of the meta string in bytes.
pub const MAX_META_LEN: usize = 1024;

/// Environment variable overriding the known hosts path.
pub const KNOWN_HOSTS_ENV: &str = "ASTROLABIO_KNOWN_HOSTS";

/// Start page when no URL is given.
pub const DEFAULT_START_URL: &str = "gemini://geminiprotocol.net/";

/// Default config directory: ~/.astrolabio.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".astrolabio"))
}

/// Known hosts path: $ASTROLABIO_KNOWN_HOSTS if set and non-empty, else ~/.astrolabio/known_hosts.json.
pub fn default_known_hosts_path() -> Option<PathBuf> {
    match std::env::var_os(KNOWN_HOSTS_ENV) {
        Some(p) if !p.is_empty() => Some(PathBuf::from(p)),
        _ => default_config_dir().map(|d| d.join("known_hosts.json")),
    }
}

/// Create `dir` (and parents) if missing, restricted to the owner on Unix.
/// Existing directories are left as they are.
pub fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

/// Open a file for writing. On Unix, creates it with mode 0o600 (owner read/write only).
pub fn open_private_file_for_write(path: &Path) -> io::Result<File> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .mode(0o600)
            .open(path)
    }
    #[cfg(not(unix))]
    {
        fs::File::create(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hosts_under_config_dir() {
        if std::env::var_os(KNOWN_HOSTS_ENV).is_some() {
            return;
        }
        if let (Some(dir), Some(path)) = (default_config_dir(), default_known_hosts_path()) {
            assert_eq!(path, dir.join("known_hosts.json"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn private_file_mode() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_private_dir(&nested).unwrap();
        let path = nested.join("f");
        drop(open_private_file_for_write(&path).unwrap());
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let dir_mode = fs::metadata(&nested).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }
}
