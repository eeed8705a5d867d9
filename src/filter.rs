//! Filter predicates over HTTP entries.
//!
//! A builder-style predicate the CLI and other consumers apply to materialized history.
//! All criteria are conjunctive; an unset criterion matches everything. Invalid regex
//! patterns are ignored rather than failing the filter, matching the forgiving posture
//! of the rest of the crate's consumer layer.

use regex::Regex;

use crate::http::HttpEntry;

/// Conjunctive filter over [`HttpEntry`] values.
#[derive(Debug, Default)]
pub struct Filter {
    host_pattern: Option<Regex>,
    path_pattern: Option<Regex>,
    url_pattern: Option<Regex>,
    status_codes: Vec<u16>,
    status_min: u16,
    status_max: u16,
    content_types: Vec<String>,
    methods: Vec<String>,
    min_size: u64,
    max_size: u64,
    has_response: Option<bool>,
    header_contains: String,
    body_contains: String,
    content_contains: String,
}

impl Filter {
    /// Creates a filter that matches everything.
    #[must_use]
    pub fn new() -> Filter {
        Filter::default()
    }

    /// Filters by host pattern (regex). Invalid patterns are ignored.
    #[must_use]
    pub fn with_host(mut self, pattern: &str) -> Filter {
        if !pattern.is_empty() {
            self.host_pattern = Regex::new(pattern).ok();
        }
        self
    }

    /// Filters by path pattern (regex). Invalid patterns are ignored.
    #[must_use]
    pub fn with_path(mut self, pattern: &str) -> Filter {
        if !pattern.is_empty() {
            self.path_pattern = Regex::new(pattern).ok();
        }
        self
    }

    /// Filters by full URL pattern (regex). Invalid patterns are ignored.
    #[must_use]
    pub fn with_url(mut self, pattern: &str) -> Filter {
        if !pattern.is_empty() {
            self.url_pattern = Regex::new(pattern).ok();
        }
        self
    }

    /// Filters by exact status codes.
    #[must_use]
    pub fn with_status_codes(mut self, codes: Vec<u16>) -> Filter {
        self.status_codes = codes;
        self
    }

    /// Filters by inclusive status-code range; 0 leaves a bound open.
    #[must_use]
    pub fn with_status_range(mut self, min: u16, max: u16) -> Filter {
        self.status_min = min;
        self.status_max = max;
        self
    }

    /// Filters by content-type substrings (case-insensitive).
    #[must_use]
    pub fn with_content_types(mut self, types: Vec<String>) -> Filter {
        self.content_types = types;
        self
    }

    /// Filters by HTTP methods (case-insensitive).
    #[must_use]
    pub fn with_methods(mut self, methods: Vec<String>) -> Filter {
        self.methods = methods
            .into_iter()
            .map(|m| m.to_ascii_uppercase())
            .collect();
        self
    }

    /// Filters entries with content length at least `min`.
    #[must_use]
    pub fn with_min_size(mut self, min: u64) -> Filter {
        self.min_size = min;
        self
    }

    /// Filters entries with content length at most `max`.
    #[must_use]
    pub fn with_max_size(mut self, max: u64) -> Filter {
        self.max_size = max;
        self
    }

    /// Filters entries by whether a response was captured.
    #[must_use]
    pub fn with_response(mut self, has_response: bool) -> Filter {
        self.has_response = Some(has_response);
        self
    }

    /// Filters entries whose raw request or response contains the string.
    #[must_use]
    pub fn with_content_contains(mut self, needle: &str) -> Filter {
        self.content_contains = needle.to_string();
        self
    }

    /// Filters entries with the string in any header name or value.
    #[must_use]
    pub fn with_header_contains(mut self, needle: &str) -> Filter {
        self.header_contains = needle.to_string();
        self
    }

    /// Filters entries with the string in either body.
    #[must_use]
    pub fn with_body_contains(mut self, needle: &str) -> Filter {
        self.body_contains = needle.to_string();
        self
    }

    /// Tests one entry against every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &HttpEntry) -> bool {
        if let Some(pattern) = &self.host_pattern {
            if !pattern.is_match(&entry.host) {
                return false;
            }
        }
        if let Some(pattern) = &self.path_pattern {
            if !pattern.is_match(&entry.path) {
                return false;
            }
        }
        if let Some(pattern) = &self.url_pattern {
            if !pattern.is_match(&entry.url) {
                return false;
            }
        }

        if !self.status_codes.is_empty() && !self.status_codes.contains(&entry.status_code) {
            return false;
        }
        if self.status_min > 0 && entry.status_code < self.status_min {
            return false;
        }
        if self.status_max > 0 && entry.status_code > self.status_max {
            return false;
        }

        if !self.content_types.is_empty() {
            let mime = entry.mime_type.to_ascii_lowercase();
            if !self
                .content_types
                .iter()
                .any(|ct| mime.contains(&ct.to_ascii_lowercase()))
            {
                return false;
            }
        }

        if !self.methods.is_empty()
            && !self
                .methods
                .iter()
                .any(|m| entry.method.eq_ignore_ascii_case(m))
        {
            return false;
        }

        if self.min_size > 0 && entry.content_length < self.min_size {
            return false;
        }
        if self.max_size > 0 && entry.content_length > self.max_size {
            return false;
        }

        if let Some(wanted) = self.has_response {
            if entry.response.is_some() != wanted {
                return false;
            }
        }

        if !self.content_contains.is_empty() && !self.raw_contains(entry, &self.content_contains) {
            return false;
        }
        if !self.header_contains.is_empty() && !self.headers_contain(entry, &self.header_contains)
        {
            return false;
        }
        if !self.body_contains.is_empty() && !self.bodies_contain(entry, &self.body_contains) {
            return false;
        }

        true
    }

    /// Applies the filter to a slice of entries, keeping matches.
    #[must_use]
    pub fn apply(&self, entries: &[HttpEntry]) -> Vec<HttpEntry> {
        entries
            .iter()
            .filter(|entry| self.matches(entry))
            .cloned()
            .collect()
    }

    fn raw_contains(&self, entry: &HttpEntry, needle: &str) -> bool {
        let in_msg = |msg: &Option<crate::http::HttpMessage>| {
            msg.as_ref()
                .is_some_and(|m| contains_bytes(&m.raw, needle.as_bytes()))
        };
        in_msg(&entry.request) || in_msg(&entry.response)
    }

    fn headers_contain(&self, entry: &HttpEntry, needle: &str) -> bool {
        let in_msg = |msg: &Option<crate::http::HttpMessage>| {
            msg.as_ref().is_some_and(|m| {
                m.headers
                    .iter()
                    .any(|(name, value)| name.contains(needle) || value.contains(needle))
            })
        };
        in_msg(&entry.request) || in_msg(&entry.response)
    }

    fn bodies_contain(&self, entry: &HttpEntry, needle: &str) -> bool {
        let in_msg = |msg: &Option<crate::http::HttpMessage>| {
            msg.as_ref()
                .is_some_and(|m| contains_bytes(&m.body, needle.as_bytes()))
        };
        in_msg(&entry.request) || in_msg(&entry.response)
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack
            .windows(needle.len())
            .any(|window| window == needle)
}

/// Parses a status-code expression like `"200,301-399,500"`.
///
/// Returns `(exact codes, range min, range max)`; the last range in the expression
/// wins, matching the tool's CLI behavior.
#[must_use]
pub fn parse_status_codes(s: &str) -> (Vec<u16>, u16, u16) {
    let mut codes = Vec::new();
    let mut min_code = 0u16;
    let mut max_code = 0u16;

    for part in s.split(',') {
        let part = part.trim();
        if let Some((low, high)) = part.split_once('-') {
            let low: u16 = low.trim().parse().unwrap_or(0);
            let high: u16 = high.trim().parse().unwrap_or(0);
            if low > 0 && high > 0 {
                min_code = low;
                max_code = high;
            }
        } else if let Ok(code) = part.parse::<u16>() {
            if code > 0 {
                codes.push(code);
            }
        }
    }

    (codes, min_code, max_code)
}
