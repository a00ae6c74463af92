/*
 * main.rs
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

//! astrolabio: fetch one Gemini URL and write the body to stdout.
//!
//! New server certificates are trusted on first use. A changed certificate is only
//! accepted after confirmation on the terminal.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use astrolabio_core::config::{self, DEFAULT_START_URL};
use astrolabio_core::trust::{CertificateRecord, TrustDecision, TrustLevel, TrustPolicy};
use astrolabio_core::{uri, GeminiClient, GeminiError, StatusCode, TrustStore};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Fetch a Gemini page, trusting server certificates on first use.
#[derive(Parser, Debug)]
#[command(name = "astrolabio", version, about)]
struct Cli {
    /// URL to fetch
    #[arg(default_value = DEFAULT_START_URL)]
    url: String,

    /// Known hosts file (default: $ASTROLABIO_KNOWN_HOSTS or ~/.astrolabio/known_hosts.json)
    #[arg(long, value_name = "PATH")]
    known_hosts: Option<PathBuf>,

    /// Return redirects instead of following them
    #[arg(long)]
    no_redirects: bool,

    /// Seconds allowed for connecting and for reading the response header
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,
}

/// Announces new hosts on stderr and asks on the terminal before accepting a changed
/// certificate. Without a terminal the change is refused.
struct PromptPolicy;

impl TrustPolicy for PromptPolicy {
    fn on_first_seen(&self, host: &str, candidate: &CertificateRecord) -> TrustDecision {
        eprintln!("{}", first_seen_notice(host, candidate, Utc::now()));
        TrustDecision::accept(TrustLevel::Permanent)
    }

    fn on_certificate_changed(
        &self,
        host: &str,
        old: &CertificateRecord,
        new: &CertificateRecord,
    ) -> TrustDecision {
        if !io::stdin().is_terminal() {
            return TrustDecision::reject(TrustLevel::Once);
        }
        for line in change_summary(host, old, new, Utc::now()) {
            eprintln!("{}", line);
        }
        let answer = match read_answer("Trust the new certificate? [y]es / [s]ession / [N]o: ") {
            Ok(Some(a)) => a,
            _ => return TrustDecision::reject(TrustLevel::Once),
        };
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => TrustDecision::accept(TrustLevel::Permanent),
            "s" | "session" => TrustDecision::accept(TrustLevel::Session),
            _ => TrustDecision::reject(TrustLevel::Once),
        }
    }
}

fn first_seen_notice(host: &str, candidate: &CertificateRecord, now: DateTime<Utc>) -> String {
    let mut notice = format!(
        "astrolabio: trusting new certificate for {} ({})",
        host, candidate.fingerprint
    );
    if candidate.is_expired(now) {
        notice.push_str(" [expired]");
    }
    notice
}

/// Lines shown before asking whether to accept a changed certificate.
fn change_summary(
    host: &str,
    old: &CertificateRecord,
    new: &CertificateRecord,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut lines = vec![
        format!("WARNING: the certificate for {} has changed.", host),
        format!("  stored:    {} (first seen {})", old.fingerprint, old.first_seen),
        format!("  presented: {}", new.fingerprint),
    ];
    if !new.subject.is_empty() {
        lines.push(format!("  subject:   {}", new.subject));
    }
    if let Some(not_after) = new.not_after {
        let state = if new.is_expired(now) { " (EXPIRED)" } else { "" };
        lines.push(format!("  expires:   {}{}", not_after, state));
    }
    lines
}

/// Prompt on stderr and read one line from stdin. None at end of input.
fn read_answer(prompt: &str) -> io::Result<Option<String>> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> astrolabio_core::Result<ExitCode> {
    let path = match cli.known_hosts.or_else(config::default_known_hosts_path) {
        Some(p) => p,
        None => {
            eprintln!("astrolabio: HOME is not set; pass --known-hosts");
            return Ok(ExitCode::FAILURE);
        }
    };
    let store = TrustStore::open(path)?.with_policy(PromptPolicy);
    let client = GeminiClient::new(Arc::new(store))
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_follow_redirects(!cli.no_redirects);

    let mut url = uri::parse_gemini_url(&cli.url)?;
    loop {
        let mut response = client.get_url(url).await?;
        let status = response.status();

        if status.is_input() {
            let prompt = if response.meta().is_empty() {
                "Input: ".to_string()
            } else {
                format!("{}: ", response.meta())
            };
            if status == StatusCode::SENSITIVE_INPUT {
                eprintln!("(sensitive input; it will be visible as you type)");
            }
            let answer = match read_answer(&prompt)? {
                Some(a) => a,
                None => return Ok(ExitCode::FAILURE),
            };
            url = uri::with_query(response.url(), &answer);
            debug!(url = %url, "re-requesting with input");
            continue;
        }

        if status.is_success() {
            let mut body = response.take_body().ok_or(GeminiError::NoBody)?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut body, &mut stdout).await?;
            stdout.flush().await?;
            return Ok(ExitCode::SUCCESS);
        }

        eprintln!("{} {}: {}", status.code(), status.describe(), response.meta());
        return Ok(ExitCode::FAILURE);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("astrolabio: {}", e);
            if e.is_trust_failure() {
                eprintln!("astrolabio: edit or remove the host entry in the known hosts file to reset trust");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn url_defaults_to_start_page() {
        let cli = Cli::try_parse_from(["astrolabio"]).unwrap();
        assert_eq!(cli.url, DEFAULT_START_URL);
        assert_eq!(cli.timeout, 30);
        assert!(!cli.no_redirects);
        assert!(cli.known_hosts.is_none());
    }

    #[test]
    fn options_parsed() {
        let cli = Cli::try_parse_from([
            "astrolabio",
            "--no-redirects",
            "--timeout",
            "5",
            "--known-hosts",
            "/tmp/kh.json",
            "gemini://example.org/x",
        ])
        .unwrap();
        assert_eq!(cli.url, "gemini://example.org/x");
        assert_eq!(cli.timeout, 5);
        assert!(cli.no_redirects);
        assert_eq!(cli.known_hosts, Some(PathBuf::from("/tmp/kh.json")));
    }

    fn record(fingerprint: &str, not_after: Option<DateTime<Utc>>) -> CertificateRecord {
        let now = Utc::now();
        CertificateRecord {
            fingerprint: fingerprint.to_string(),
            first_seen: now,
            last_seen: now,
            trust: TrustLevel::Permanent,
            not_after,
            subject: "CN=example.org".to_string(),
        }
    }

    #[test]
    fn new_hosts_are_trusted_and_announced() {
        let now = Utc::now();
        let candidate = record("ab12", Some(now + ChronoDuration::days(30)));
        let decision = PromptPolicy.on_first_seen("example.org", &candidate);
        assert_eq!(decision, TrustDecision::accept(TrustLevel::Permanent));
        let notice = first_seen_notice("example.org", &candidate, now);
        assert!(notice.contains("example.org"));
        assert!(notice.contains("ab12"));
        assert!(!notice.contains("expired"));
    }

    #[test]
    fn expired_certificates_flagged() {
        let now = Utc::now();
        let old = record("aaaa", None);
        let new = record("bbbb", Some(now - ChronoDuration::days(1)));
        let lines = change_summary("example.org", &old, &new, now);
        assert!(lines[0].contains("example.org"));
        assert!(lines.iter().any(|l| l.contains("bbbb")));
        assert!(lines.iter().any(|l| l.contains("EXPIRED")));
        assert!(first_seen_notice("example.org", &new, now).ends_with("[expired]"));

        let valid = record("cccc", Some(now + ChronoDuration::days(1)));
        let lines = change_summary("example.org", &old, &valid, now);
        assert!(!lines.iter().any(|l| l.contains("EXPIRED")));
    }

    #[test]
    fn two_urls_rejected() {
        assert!(Cli::try_parse_from(["astrolabio", "gemini://a/", "gemini://b/"]).is_err());
    }
}
