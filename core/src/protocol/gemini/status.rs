/*
 * status.rs
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

//! Gemini status codes: two digits, the first one is the category.

use std::fmt;

/// Broad meaning of a status code (its tens digit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Input = 1,
    Success = 2,
    Redirect = 3,
    TemporaryFailure = 4,
    PermanentFailure = 5,
    ClientCertificateRequired = 6,
}

/// Status code in 10..=69. Construct with `StatusCode::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u8);

impl StatusCode {
    pub const INPUT: StatusCode = StatusCode(10);
    pub const SENSITIVE_INPUT: StatusCode = StatusCode(11);
    pub const SUCCESS: StatusCode = StatusCode(20);
    pub const REDIRECT_TEMPORARY: StatusCode = StatusCode(30);
    pub const REDIRECT_PERMANENT: StatusCode = StatusCode(31);
    pub const TEMPORARY_FAILURE: StatusCode = StatusCode(40);
    pub const SERVER_UNAVAILABLE: StatusCode = StatusCode(41);
    pub const CGI_ERROR: StatusCode = StatusCode(42);
    pub const PROXY_ERROR: StatusCode = StatusCode(43);
    pub const SLOW_DOWN: StatusCode = StatusCode(44);
    pub const PERMANENT_FAILURE: StatusCode = StatusCode(50);
    pub const NOT_FOUND: StatusCode = StatusCode(51);
    pub const GONE: StatusCode = StatusCode(52);
    pub const PROXY_REQUEST_REFUSED: StatusCode = StatusCode(53);
    pub const BAD_REQUEST: StatusCode = StatusCode(59);
    pub const CLIENT_CERTIFICATE_REQUIRED: StatusCode = StatusCode(60);
    pub const CERTIFICATE_NOT_AUTHORISED: StatusCode = StatusCode(61);
    pub const CERTIFICATE_NOT_VALID: StatusCode = StatusCode(62);

    /// Returns None outside 10..=69.
    pub fn new(code: u8) -> Option<Self> {
        if (10..=69).contains(&code) {
            Some(Self(code))
        } else {
            None
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// Category by integer division, so undefined codes (e.g. 25) still classify.
    pub fn category(self) -> Category {
        match self.0 / 10 {
            1 => Category::Input,
            2 => Category::Success,
            3 => Category::Redirect,
            4 => Category::TemporaryFailure,
            5 => Category::PermanentFailure,
            _ => Category::ClientCertificateRequired,
        }
    }

    pub fn is_input(self) -> bool {
        self.category() == Category::Input
    }

    pub fn is_success(self) -> bool {
        self.category() == Category::Success
    }

    pub fn is_redirect(self) -> bool {
        self.category() == Category::Redirect
    }

    pub fn is_temporary_failure(self) -> bool {
        self.category() == Category::TemporaryFailure
    }

    pub fn is_permanent_failure(self) -> bool {
        self.category() == Category::PermanentFailure
    }

    pub fn is_client_certificate(self) -> bool {
        self.category() == Category::ClientCertificateRequired
    }

    /// Temporary or permanent failure.
    pub fn is_error(self) -> bool {
        self.is_temporary_failure() || self.is_permanent_failure()
    }

    /// Human-readable description; generic per category for codes without a specific meaning.
    pub fn describe(self) -> String {
        let known = match self.0 {
            10 => "Input Required",
            11 => "Sensitive Input Required",
            20 => "Success",
            30 => "Temporary Redirect",
            31 => "Permanent Redirect",
            40 => "Temporary Failure",
            41 => "Server Unavailable",
            42 => "CGI Error",
            43 => "Proxy Error",
            44 => "Slow Down",
            50 => "Permanent Failure",
            51 => "Not Found",
            52 => "Gone",
            53 => "Proxy Request Refused",
            59 => "Bad Request",
            60 => "Client Certificate Required",
            61 => "Certificate Not Authorised",
            62 => "Certificate Not Valid",
            _ => "",
        };
        if !known.is_empty() {
            return known.to_string();
        }
        let generic = match self.category() {
            Category::Input => "Input Required",
            Category::Success => "Success",
            Category::Redirect => "Redirect",
            Category::TemporaryFailure => "Temporary Failure",
            Category::PermanentFailure => "Permanent Failure",
            Category::ClientCertificateRequired => "Client Certificate Issue",
        };
        format!("{} ({})", generic, self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_tens_digit() {
        for c in 10u8..=69 {
            let s = StatusCode::new(c).unwrap();
            assert_eq!(s.category() as u8, c / 10, "code {}", c);
            let flags = [
                s.is_input(),
                s.is_success(),
                s.is_redirect(),
                s.is_temporary_failure(),
                s.is_permanent_failure(),
                s.is_client_certificate(),
            ];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "code {}", c);
            assert_eq!(s.is_error(), c / 10 == 4 || c / 10 == 5);
        }
    }

    #[test]
    fn out_of_range_not_constructible() {
        assert!(StatusCode::new(9).is_none());
        assert!(StatusCode::new(70).is_none());
        assert!(StatusCode::new(0).is_none());
    }

    #[test]
    fn known_descriptions() {
        assert_eq!(StatusCode::SUCCESS.to_string(), "Success");
        assert_eq!(StatusCode::NOT_FOUND.to_string(), "Not Found");
        assert_eq!(StatusCode::SLOW_DOWN.to_string(), "Slow Down");
        assert_eq!(StatusCode::CERTIFICATE_NOT_AUTHORISED.to_string(), "Certificate Not Authorised");
    }

    #[test]
    fn undefined_codes_fall_back_to_category() {
        assert_eq!(StatusCode::new(25).unwrap().describe(), "Success (25)");
        assert_eq!(StatusCode::new(39).unwrap().describe(), "Redirect (39)");
        assert_eq!(StatusCode::new(69).unwrap().describe(), "Client Certificate Issue (69)");
        assert_eq!(StatusCode::new(12).unwrap().describe(), "Input Required (12)");
    }
}
