//! Plain and regex search over HTTP entries.
//!
//! Searches the materialized history across selectable scopes and returns per-match
//! snippets: the match location, a flattened ±50-byte context window, and the byte
//! offset inside the searched text. The score of a result is simply its match count.

use regex::RegexBuilder;

use crate::{http::HttpEntry, Result};

/// Which parts of an entry a search examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// URL plus both raw messages
    #[default]
    All,
    /// Raw request bytes only
    Requests,
    /// Raw response bytes only
    Responses,
    /// Header names and values of both messages
    Headers,
    /// Bodies of both messages
    Bodies,
    /// URL, path, and query string
    Urls,
}

/// Search parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// The literal text or regex pattern to look for
    pub query: String,
    /// Case-sensitive matching; plain searches compare ASCII case-insensitively otherwise
    pub case_sensitive: bool,
    /// Scope to search
    pub scope: SearchScope,
    /// Treat the query as a regex
    pub regex: bool,
    /// Stop after this many matching entries; 0 means unlimited
    pub max_results: usize,
}

/// One match inside one searched text.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchMatch {
    /// Which text matched (e.g. `url`, `request`, `response_body`)
    pub location: &'static str,
    /// Surrounding text with newlines flattened to spaces
    pub context: String,
    /// Byte offset of the match inside the searched text
    pub offset: usize,
    /// Byte length of the match
    pub length: usize,
}

/// One entry with at least one match.
#[derive(Debug)]
pub struct SearchResult<'a> {
    /// The matching entry
    pub entry: &'a HttpEntry,
    /// Every match found in the selected scope
    pub matches: Vec<SearchMatch>,
    /// Match count, used for ranking
    pub score: usize,
}

/// Bytes of context kept on each side of a match.
const CONTEXT_BYTES: usize = 50;

/// Searches entries for matching content.
///
/// # Errors
/// Fails only when `regex` is set and the pattern does not compile.
pub fn search<'a>(entries: &'a [HttpEntry], opts: &SearchOptions) -> Result<Vec<SearchResult<'a>>> {
    if opts.query.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = if opts.regex {
        Some(
            RegexBuilder::new(&opts.query)
                .case_insensitive(!opts.case_sensitive)
                .build()
                .map_err(|err| invariant_error!("search pattern: {}", err))?,
        )
    } else {
        None
    };

    let search_text = |text: &str, location: &'static str| -> Vec<SearchMatch> {
        match &pattern {
            Some(regex) => regex
                .find_iter(text)
                .map(|found| SearchMatch {
                    location,
                    context: snippet(text, found.start(), found.end()),
                    offset: found.start(),
                    length: found.end() - found.start(),
                })
                .collect(),
            None => plain_matches(text, &opts.query, opts.case_sensitive, location),
        }
    };

    let mut results = Vec::new();
    for entry in entries {
        let mut matches = Vec::new();

        match opts.scope {
            SearchScope::All => {
                matches.extend(search_text(&entry.url, "url"));
                if let Some(request) = &entry.request {
                    matches.extend(search_text(&String::from_utf8_lossy(&request.raw), "request"));
                }
                if let Some(response) = &entry.response {
                    matches
                        .extend(search_text(&String::from_utf8_lossy(&response.raw), "response"));
                }
            }
            SearchScope::Requests => {
                if let Some(request) = &entry.request {
                    matches.extend(search_text(&String::from_utf8_lossy(&request.raw), "request"));
                }
            }
            SearchScope::Responses => {
                if let Some(response) = &entry.response {
                    matches
                        .extend(search_text(&String::from_utf8_lossy(&response.raw), "response"));
                }
            }
            SearchScope::Headers => {
                if let Some(request) = &entry.request {
                    for (name, value) in request.headers.iter() {
                        matches.extend(search_text(name, "request_header"));
                        matches.extend(search_text(value, "request_header"));
                    }
                }
                if let Some(response) = &entry.response {
                    for (name, value) in response.headers.iter() {
                        matches.extend(search_text(name, "response_header"));
                        matches.extend(search_text(value, "response_header"));
                    }
                }
            }
            SearchScope::Bodies => {
                if let Some(request) = &entry.request {
                    matches.extend(search_text(
                        &String::from_utf8_lossy(&request.body),
                        "request_body",
                    ));
                }
                if let Some(response) = &entry.response {
                    matches.extend(search_text(
                        &String::from_utf8_lossy(&response.body),
                        "response_body",
                    ));
                }
            }
            SearchScope::Urls => {
                matches.extend(search_text(&entry.url, "url"));
                matches.extend(search_text(&entry.path, "path"));
                if !entry.query_string.is_empty() {
                    matches.extend(search_text(&entry.query_string, "query"));
                }
            }
        }

        if !matches.is_empty() {
            let score = matches.len();
            results.push(SearchResult {
                entry,
                matches,
                score,
            });
            if opts.max_results > 0 && results.len() >= opts.max_results {
                break;
            }
        }
    }

    Ok(results)
}

/// Plain substring scan; ASCII-case-folded when insensitive, so offsets stay valid.
fn plain_matches(
    text: &str,
    query: &str,
    case_sensitive: bool,
    location: &'static str,
) -> Vec<SearchMatch> {
    let haystack = if case_sensitive {
        text.to_string()
    } else {
        text.to_ascii_lowercase()
    };
    let needle = if case_sensitive {
        query.to_string()
    } else {
        query.to_ascii_lowercase()
    };

    let mut matches = Vec::new();
    let mut from = 0;
    while let Some(idx) = haystack[from..].find(&needle) {
        let at = from + idx;
        matches.push(SearchMatch {
            location,
            context: snippet(text, at, at + needle.len()),
            offset: at,
            length: needle.len(),
        });
        from = at + needle.len();
    }
    matches
}

/// Context window around a match, clamped to char boundaries, newlines flattened.
fn snippet(text: &str, start: usize, end: usize) -> String {
    let mut from = start.saturating_sub(CONTEXT_BYTES);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + CONTEXT_BYTES).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }

    text[from..to].replace("\r\n", " ").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_entry;

    fn sample() -> Vec<HttpEntry> {
        vec![
            build_entry(
                1,
                Some(b"GET /api/token HTTP/1.1\r\nHost: a.example\r\nX-Secret: tok_abc123\r\n\r\n"),
                Some(b"HTTP/1.1 200 OK\r\n\r\n{\"token\": \"tok_abc123\"}"),
            ),
            build_entry(
                2,
                Some(b"GET /plain HTTP/1.1\r\nHost: b.example\r\n\r\n"),
                None,
            ),
        ]
    }

    #[test]
    fn plain_search_all_scopes() {
        let entries = sample();
        let results = search(
            &entries,
            &SearchOptions {
                query: "tok_abc123".into(),
                ..SearchOptions::default()
            },
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.id, 1);
        // once in the request headers, once in the response body
        assert_eq!(results[0].score, 2);
        assert!(results[0].matches[0].context.contains("tok_abc123"));
        assert!(!results[0].matches[0].context.contains('\n'));
    }

    #[test]
    fn case_insensitive_by_default() {
        let entries = sample();
        let results = search(
            &entries,
            &SearchOptions {
                query: "TOK_ABC".into(),
                ..SearchOptions::default()
            },
        )
        .unwrap();
        assert_eq!(results.len(), 1);

        let strict = search(
            &entries,
            &SearchOptions {
                query: "TOK_ABC".into(),
                case_sensitive: true,
                ..SearchOptions::default()
            },
        )
        .unwrap();
        assert!(strict.is_empty());
    }

    #[test]
    fn regex_search_in_urls() {
        let entries = sample();
        let results = search(
            &entries,
            &SearchOptions {
                query: r"/api/\w+".into(),
                regex: true,
                scope: SearchScope::Urls,
                ..SearchOptions::default()
            },
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        let locations: Vec<&str> = results[0].matches.iter().map(|m| m.location).collect();
        assert_eq!(locations, vec!["url", "path"]);
    }

    #[test]
    fn bad_regex_is_an_error() {
        let entries = sample();
        assert!(search(
            &entries,
            &SearchOptions {
                query: "[unclosed".into(),
                regex: true,
                ..SearchOptions::default()
            },
        )
        .is_err());
    }

    #[test]
    fn max_results_truncates() {
        let entries = sample();
        let results = search(
            &entries,
            &SearchOptions {
                query: "example".into(),
                max_results: 1,
                ..SearchOptions::default()
            },
        )
        .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let entries = sample();
        assert!(search(&entries, &SearchOptions::default()).unwrap().is_empty());
    }
}
