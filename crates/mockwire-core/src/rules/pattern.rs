//! Path and domain pattern compilation.
//!
//! Path patterns:
//! - `*` matches any run of characters, `/` included
//! - `:name` matches exactly one non-empty segment (no `/`)
//! - everything else is literal; the match is anchored at both ends
//!
//! Domain patterns:
//! - optional `http://` or `https://` prefix that must equal the URL scheme
//! - `*` matches any run of characters (empty included), dots are literal
//! - anchored against the URL hostname only (no port, no path)

use regex::Regex;
use url::Url;

use crate::error::{MockWireError, Result};

/// Compiled endpoint path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    re: Regex,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut out = String::with_capacity(pattern.len() * 2 + 2);
        out.push('^');

        let mut chars = pattern.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '*' => out.push_str(".*"),
                ':' => {
                    let name_len: usize = pattern[i + 1..]
                        .chars()
                        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                        .map(char::len_utf8)
                        .sum();
                    if name_len == 0 {
                        out.push_str(&regex::escape(":"));
                        continue;
                    }
                    out.push_str("[^/]+");
                    while chars.next_if(|(j, _)| *j <= i + name_len).is_some() {}
                }
                other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }

        out.push('$');
        let re = Regex::new(&out)
            .map_err(|e| MockWireError::InvalidPattern(format!("path {pattern}: {e}")))?;
        Ok(Self { raw: pattern.to_string(), re })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.re.is_match(path)
    }
}

/// Scheme constraint carried by a domain pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeRule {
    Any,
    Http,
    Https,
}

/// Compiled project domain pattern.
#[derive(Debug, Clone)]
pub struct DomainPattern {
    raw: String,
    scheme: SchemeRule,
    host: Regex,
}

impl DomainPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let (scheme, rest) = if let Some(rest) = pattern.strip_prefix("https://") {
            (SchemeRule::Https, rest)
        } else if let Some(rest) = pattern.strip_prefix("http://") {
            (SchemeRule::Http, rest)
        } else {
            (SchemeRule::Any, pattern)
        };

        let body = rest
            .to_ascii_lowercase()
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let host = Regex::new(&format!("^{body}$"))
            .map_err(|e| MockWireError::InvalidPattern(format!("domain {pattern}: {e}")))?;
        Ok(Self { raw: pattern.to_string(), scheme, host })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> SchemeRule {
        self.scheme
    }

    pub fn matches(&self, url: &Url) -> bool {
        let scheme_ok = match self.scheme {
            SchemeRule::Any => true,
            SchemeRule::Http => url.scheme() == "http",
            SchemeRule::Https => url.scheme() == "https",
        };
        scheme_ok && url.host_str().map(|h| self.host.is_match(h)).unwrap_or(false)
    }
}

/// Boolean path match; an uncompilable pattern never matches.
pub fn match_path(pattern: &str, path: &str) -> bool {
    PathPattern::compile(pattern)
        .map(|p| p.is_match(path))
        .unwrap_or(false)
}

/// Boolean domain match against a full URL; unparseable input never matches.
pub fn match_domain(pattern: &str, url: &str) -> bool {
    let Ok(url) = Url::parse(url) else { return false };
    DomainPattern::compile(pattern)
        .map(|p| p.matches(&url))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_param_paths() {
        assert!(match_path("/api/user", "/api/user"));
        assert!(match_path("/api/user/:id", "/api/user/123"));
        assert!(match_path("/api/user/:id", "/api/user/abc"));
        assert!(!match_path("/api/user", "/api/users"));
        assert!(!match_path("/api/user/:id", "/api/user/123/extra"));
        assert!(!match_path("/api/user/:id", "/api/user/"));
    }

    #[test]
    fn wildcard_paths() {
        assert!(match_path("/api/*", "/api/user"));
        assert!(match_path("/api/*", "/api/anything/else"));
        assert!(match_path("/api/*", "/api/"));
        assert!(!match_path("/api/*", "/other/api/x"));
    }

    #[test]
    fn multiple_params() {
        assert!(match_path("/api/:type/:id", "/api/user/123"));
        assert!(match_path("/api/:type/:id", "/api/product/456"));
        assert!(!match_path("/api/:type/:id", "/api/user"));
        assert!(!match_path("/api/:type/:id", "/api/user/123/extra"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(match_path("/v1.0/items", "/v1.0/items"));
        assert!(!match_path("/v1.0/items", "/v1x0/items"));
        assert!(match_path("/a+b/(c)", "/a+b/(c)"));
        assert!(match_path("/time/12:30", "/time/12:30"));
    }

    #[test]
    fn param_names_may_be_followed_by_literals() {
        assert!(match_path("/files/:name.json", "/files/report.json"));
        assert!(!match_path("/files/:name.json", "/files/report.xml"));
    }

    #[test]
    fn exact_domains() {
        assert!(match_domain("example.com", "https://example.com"));
        assert!(match_domain("example.com", "http://example.com/path"));
        assert!(!match_domain("example.com", "https://another.com"));
        assert!(!match_domain("example.com", "http://sub.example.com"));
    }

    #[test]
    fn wildcard_domains() {
        assert!(match_domain("*.example.com", "https://sub.example.com"));
        assert!(match_domain("https://*.example.com", "https://sub.example.com"));
        assert!(!match_domain("https://*.example.com", "http://sub.example.com"));
        assert!(match_domain("*.example.com", "http://another.example.com/path"));
        assert!(!match_domain("https://*.example.com", "https://example.com"));
        assert!(!match_domain("https://*.example.com", "http://example.com"));
        assert!(!match_domain("*.example.com", "http://another.com"));
    }

    #[test]
    fn explicit_scheme_never_matches_other_schemes() {
        for host in ["example.com", "a.example.com", "localhost"] {
            assert!(!match_domain("http://*", &format!("https://{host}/")));
            assert!(!match_domain("https://*", &format!("http://{host}/")));
        }
    }

    #[test]
    fn domain_ignores_port_and_case() {
        assert!(match_domain("localhost", "http://localhost:3000/app"));
        assert!(match_domain("API.Example.com", "https://api.example.com"));
    }

    #[test]
    fn bad_url_never_matches() {
        assert!(!match_domain("*", "not a url"));
    }
}
