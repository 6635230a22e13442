//! Tenant Identification
//!
//! Strategies for pulling the tenant lookup key out of an incoming request.
//! The key is then handed to [`crate::TenantManager::resolve_from`].

use regex::Regex;
use std::collections::HashMap;

/// The parts of a request tenant identification looks at
pub trait TenantRequest {
    /// Header value; names are matched case-insensitively
    fn header(&self, name: &str) -> Option<&str>;

    /// Request path, without query string
    fn path(&self) -> &str;

    /// Host, from the `Host` header by default
    fn host(&self) -> Option<&str> {
        self.header("host")
    }
}

/// Owned request parts
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    path: String,
    headers: HashMap<String, String>,
}

impl RequestParts {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_host(self, host: impl Into<String>) -> Self {
        self.with_header("host", host)
    }
}

impl TenantRequest for RequestParts {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// Extracts a tenant lookup key from a request
pub trait KeyExtractor: Send + Sync {
    /// The key, or `None` when the request does not name a tenant
    fn extract(&self, request: &dyn TenantRequest) -> Option<String>;
}

/// Reads the key from a header (e.g., `X-Tenant-ID`)
pub struct HeaderKeyExtractor {
    header_name: String,
}

impl HeaderKeyExtractor {
    /// # Examples
    ///
    /// ```
    /// use multitenancy_core::{HeaderKeyExtractor, KeyExtractor, RequestParts};
    ///
    /// let extractor = HeaderKeyExtractor::new("X-Tenant-ID");
    /// let request = RequestParts::new("/").with_header("x-tenant-id", "acme");
    ///
    /// assert_eq!(extractor.extract(&request), Some("acme".to_string()));
    /// ```
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl KeyExtractor for HeaderKeyExtractor {
    fn extract(&self, request: &dyn TenantRequest) -> Option<String> {
        request
            .header(&self.header_name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

/// Reads the key from the subdomain (e.g., `acme.example.com` -> `acme`)
pub struct SubdomainKeyExtractor {
    base_domain: String,
}

impl SubdomainKeyExtractor {
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into(),
        }
    }

    fn extract_subdomain(&self, host: &str) -> Option<String> {
        // Remove port if present
        let host = host.split(':').next().unwrap_or(host);

        let subdomain = host.strip_suffix(&format!(".{}", self.base_domain))?;
        if subdomain.is_empty() || subdomain.contains('.') {
            return None;
        }
        Some(subdomain.to_string())
    }
}

impl KeyExtractor for SubdomainKeyExtractor {
    fn extract(&self, request: &dyn TenantRequest) -> Option<String> {
        request.host().and_then(|host| self.extract_subdomain(host))
    }
}

/// Reads the key from a path segment matched by a pattern
///
/// The first capture group is the key, so `^/t/([^/]+)` maps `/t/acme/users`
/// to `acme`.
pub struct PathKeyExtractor {
    pattern: Regex,
}

impl PathKeyExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl KeyExtractor for PathKeyExtractor {
    fn extract(&self, request: &dyn TenantRequest) -> Option<String> {
        self.pattern
            .captures(request.path())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_extractor() {
        let extractor = HeaderKeyExtractor::new("X-Tenant-ID");

        let request = RequestParts::new("/").with_header("X-Tenant-ID", " acme ");
        assert_eq!(extractor.extract(&request), Some("acme".to_string()));

        let blank = RequestParts::new("/").with_header("x-tenant-id", "");
        assert_eq!(extractor.extract(&blank), None);
        assert_eq!(extractor.extract(&RequestParts::new("/")), None);
    }

    #[test]
    fn test_extract_subdomain() {
        let extractor = SubdomainKeyExtractor::new("example.com");

        assert_eq!(
            extractor.extract_subdomain("acme.example.com"),
            Some("acme".to_string())
        );
        assert_eq!(
            extractor.extract_subdomain("acme.example.com:8080"),
            Some("acme".to_string())
        );
        assert_eq!(extractor.extract_subdomain("example.com"), None);
        assert_eq!(extractor.extract_subdomain("a.b.example.com"), None);
        assert_eq!(extractor.extract_subdomain("acme.other.org"), None);
    }

    #[test]
    fn test_subdomain_extractor_reads_host() {
        let extractor = SubdomainKeyExtractor::new("example.com");
        let request = RequestParts::new("/dashboard").with_host("globex.example.com");

        assert_eq!(extractor.extract(&request), Some("globex".to_string()));
        assert_eq!(extractor.extract(&RequestParts::new("/")), None);
    }

    #[test]
    fn test_path_extractor() {
        let extractor = PathKeyExtractor::new(r"^/t/([^/]+)").unwrap();

        let request = RequestParts::new("/t/acme/users");
        assert_eq!(extractor.extract(&request), Some("acme".to_string()));
        assert_eq!(extractor.extract(&RequestParts::new("/users")), None);

        assert!(PathKeyExtractor::new("(").is_err());
    }
}
