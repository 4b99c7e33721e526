//! File-backed cookie jar owned by one client instance.
//!
//! # Design
//! Cookie semantics (RFC 6265 parsing, domain and path matching, expiry)
//! come from `cookie_store`. The store is kept as JSON in a
//! `tempfile::NamedTempFile`: every read loads the file and every store
//! rewrites it, so the file is the single source of truth. Session cookies
//! are written too, since the jar only lives as long as its client.
//! Dropping the jar deletes the file; `close` does the same and reports the
//! I/O result.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use cookie_store::CookieStore;
use tempfile::NamedTempFile;
use tracing::debug;
use url::Url;

use crate::error::RestError;

/// Cookie store scoped to the lifetime of its owner.
#[derive(Debug)]
pub struct CookieJar {
    file: NamedTempFile,
}

impl CookieJar {
    /// Create an empty jar backed by a fresh temp file.
    pub fn new() -> Result<Self, RestError> {
        let file = tempfile::Builder::new().prefix("cookie").tempfile()?;
        debug!(path = %file.path().display(), "cookie jar created");
        let jar = Self { file };
        jar.save(&CookieStore::default())?;
        Ok(jar)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `Cookie` header value for a request to `url`, if any cookie matches.
    /// Pairs are ordered by name.
    pub fn cookie_header(&self, url: &Url) -> Result<Option<String>, RestError> {
        let store = self.load()?;
        let mut pairs: Vec<(&str, &str)> = store.get_request_values(url).collect();
        if pairs.is_empty() {
            return Ok(None);
        }
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let header = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(Some(header))
    }

    /// Record a `Set-Cookie` header received from `url`.
    ///
    /// Headers that cannot be parsed, or that name a domain the response
    /// host does not belong to, are ignored. An already expired cookie
    /// removes the stored one of the same name, domain and path.
    pub fn store(&mut self, url: &Url, header: &str) -> Result<(), RestError> {
        let mut store = self.load()?;
        if let Err(e) = store.parse(header, url) {
            debug!(error = %e, "ignoring unusable Set-Cookie header");
            return Ok(());
        }
        self.save(&store)
    }

    /// Number of unexpired cookies currently held.
    pub fn len(&self) -> Result<usize, RestError> {
        Ok(self.load()?.iter_unexpired().count())
    }

    pub fn is_empty(&self) -> Result<bool, RestError> {
        Ok(self.len()? == 0)
    }

    /// Delete the backing file now instead of at drop.
    pub fn close(self) -> Result<(), RestError> {
        self.file.close()?;
        Ok(())
    }

    fn load(&self) -> Result<CookieStore, RestError> {
        let reader = BufReader::new(fs::File::open(self.file.path())?);
        cookie_store::serde::json::load_all(reader).map_err(store_error)
    }

    fn save(&self, store: &CookieStore) -> Result<(), RestError> {
        let mut out = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(store, &mut out)
            .map_err(store_error)?;
        fs::write(self.file.path(), &out)?;
        Ok(())
    }
}

fn store_error<E>(err: E) -> RestError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    RestError::CookieStore(std::io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn stored_cookie_is_replayed_to_same_host() {
        let mut jar = CookieJar::new().unwrap();
        jar.store(&url("http://api.test/login"), "session=abc; Path=/; HttpOnly")
            .unwrap();
        assert_eq!(
            jar.cookie_header(&url("http://api.test/items?x=1")).unwrap(),
            Some("session=abc".to_string())
        );
        assert_eq!(jar.cookie_header(&url("http://other.test/")).unwrap(), None);
    }

    #[test]
    fn later_store_replaces_same_cookie() {
        let mut jar = CookieJar::new().unwrap();
        let u = url("http://api.test/");
        jar.store(&u, "a=1").unwrap();
        jar.store(&u, "b=2").unwrap();
        jar.store(&u, "a=3").unwrap();
        assert_eq!(jar.len().unwrap(), 2);
        assert_eq!(jar.cookie_header(&u).unwrap(), Some("a=3; b=2".to_string()));
    }

    #[test]
    fn max_age_zero_deletes() {
        let mut jar = CookieJar::new().unwrap();
        let u = url("http://api.test/");
        jar.store(&u, "a=1").unwrap();
        jar.store(&u, "a=; Max-Age=0").unwrap();
        assert!(jar.is_empty().unwrap());
    }

    #[test]
    fn domain_attribute_covers_subdomains_and_rejects_foreign_domains() {
        let mut jar = CookieJar::new().unwrap();
        jar.store(&url("http://www.example.test/"), "d=1; Domain=.example.test")
            .unwrap();
        jar.store(&url("http://www.example.test/"), "evil=1; Domain=attacker.test")
            .unwrap();
        assert_eq!(
            jar.cookie_header(&url("http://api.example.test/")).unwrap(),
            Some("d=1".to_string())
        );
        assert_eq!(jar.len().unwrap(), 1);
    }

    #[test]
    fn path_and_secure_restrict_matching() {
        let mut jar = CookieJar::new().unwrap();
        jar.store(&url("https://api.test/"), "p=1; Path=/admin").unwrap();
        jar.store(&url("https://api.test/"), "s=1; Secure").unwrap();
        assert_eq!(
            jar.cookie_header(&url("http://api.test/admin/users")).unwrap(),
            Some("p=1".to_string())
        );
        assert_eq!(jar.cookie_header(&url("http://api.test/administrator")).unwrap(), None);
        assert_eq!(
            jar.cookie_header(&url("https://api.test/")).unwrap(),
            Some("s=1".to_string())
        );
    }

    #[test]
    fn past_expires_deletes() {
        let mut jar = CookieJar::new().unwrap();
        let u = url("http://api.test/");
        jar.store(&u, "sid=abc; Path=/").unwrap();
        jar.store(&u, "keep=1; Path=/").unwrap();
        jar.store(&u, "sid=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
            .unwrap();
        assert_eq!(jar.cookie_header(&u).unwrap(), Some("keep=1".to_string()));
        assert_eq!(jar.len().unwrap(), 1);
    }

    #[test]
    fn cookie_without_path_is_scoped_to_request_directory() {
        let mut jar = CookieJar::new().unwrap();
        jar.store(&url("http://api.test/a/b/login"), "dir=1").unwrap();
        assert_eq!(
            jar.cookie_header(&url("http://api.test/a/b/other")).unwrap(),
            Some("dir=1".to_string())
        );
        assert_eq!(jar.cookie_header(&url("http://api.test/a/")).unwrap(), None);
    }

    #[test]
    fn garbage_headers_are_ignored() {
        let mut jar = CookieJar::new().unwrap();
        let u = url("http://api.test/");
        jar.store(&u, "no-equals-sign").unwrap();
        jar.store(&u, "=value").unwrap();
        assert!(jar.is_empty().unwrap());
    }

    #[test]
    fn file_is_removed_on_drop_and_close() {
        let jar = CookieJar::new().unwrap();
        let path = jar.path().to_path_buf();
        assert!(path.exists());
        drop(jar);
        assert!(!path.exists());

        let jar = CookieJar::new().unwrap();
        let path = jar.path().to_path_buf();
        jar.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn cookies_persist_in_backing_file() {
        let mut jar = CookieJar::new().unwrap();
        jar.store(&url("http://api.test/"), "k=v").unwrap();
        let contents = fs::read_to_string(jar.path()).unwrap();
        assert!(contents.contains("k=v"), "{contents}");

        // A second handle on the same file sees the stored cookie.
        let reloaded = jar.load().unwrap();
        assert_eq!(reloaded.iter_unexpired().count(), 1);
    }
}
