//! Resolution of object UUIDs to concrete locators

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Result;
use crate::host::HostSession;
use crate::transfer_syntax::TransferSyntax;
use crate::types::ObjectLocator;
use crate::FILE_SCHEME;

/// Object UUID and the transfer syntaxes it was requested with, in order
type CacheKey = (Uuid, Vec<Uuid>);

/// Result of a locator request
///
/// UUIDs the host could not resolve are listed in `unresolved`; that is a
/// valid outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub locators: Vec<ObjectLocator>,
    pub unresolved: Vec<Uuid>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Locator for one requested UUID, if it resolved
    pub fn get(&self, uuid: Uuid) -> Option<&ObjectLocator> {
        self.locators.iter().find(|locator| locator.locator == uuid)
    }
}

/// Resolves UUIDs through the host, caching answers per requested transfer syntaxes
///
/// Entries live until [`LocatorResolver::invalidate`] is called.
#[derive(Debug, Default)]
pub struct LocatorResolver {
    cache: HashMap<CacheKey, ObjectLocator>,
}

impl LocatorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached locator
    pub fn invalidate(&mut self) {
        if !self.cache.is_empty() {
            debug!("Dropping {} cached locators", self.cache.len());
        }
        self.cache.clear();
    }

    /// Resolve `uuids`, asking the host once for every UUID not in the cache
    ///
    /// `transfer_syntaxes` is passed to the host in order of preference; an
    /// empty slice accepts any. Requested order is preserved in the returned
    /// locators. Duplicate UUIDs in the request are resolved once.
    pub async fn resolve(
        &mut self,
        session: &HostSession,
        uuids: &[Uuid],
        transfer_syntaxes: &[TransferSyntax],
        include_bulk_data: bool,
    ) -> Result<Resolution> {
        let requested: Vec<Uuid> = transfer_syntaxes.iter().map(TransferSyntax::uuid).collect();
        let key = |uuid: Uuid| (uuid, requested.clone());

        let mut misses: Vec<Uuid> = Vec::new();
        for uuid in uuids {
            if !self.cache.contains_key(&key(*uuid)) && !misses.contains(uuid) {
                misses.push(*uuid);
            }
        }

        if !misses.is_empty() {
            let locators = session
                .get_data(&misses, &requested, include_bulk_data)
                .await?;
            for locator in locators {
                if misses.contains(&locator.locator) {
                    self.cache.insert(key(locator.locator), locator);
                } else {
                    debug!("Ignoring unrequested locator {}", locator.locator);
                }
            }
        }

        let mut resolution = Resolution::default();
        for uuid in uuids {
            match self.cache.get(&key(*uuid)) {
                Some(locator) => {
                    if resolution.get(*uuid).is_none() {
                        resolution.locators.push(locator.clone());
                    }
                }
                None => {
                    if !resolution.unresolved.contains(uuid) {
                        resolution.unresolved.push(*uuid);
                    }
                }
            }
        }
        Ok(resolution)
    }
}

/// Local path for a `file:` locator URI
///
/// Returns `None` for other schemes.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let scheme = uri.get(..FILE_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(FILE_SCHEME) {
        return None;
    }
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .ok()
            .or_else(|| Some(PathBuf::from(url.path()))),
        _ => Some(PathBuf::from(uri[FILE_SCHEME.len()..].to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryHost;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(host: &Arc<InMemoryHost>) -> HostSession {
        HostSession::new(host.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_resolve_reports_unresolved() {
        let known = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let host = Arc::new(
            InMemoryHost::new().with_locator(ObjectLocator::new(known, Uuid::nil(), "file:/tmp/a.dcm")),
        );
        let mut resolver = LocatorResolver::new();

        let resolution = resolver
            .resolve(&session(&host), &[known, missing], &[], false)
            .await
            .unwrap();

        assert_eq!(resolution.locators.len(), 1);
        assert_eq!(resolution.unresolved, vec![missing]);
        assert_eq!(host.get_data_calls().await, 1);
    }

    #[tokio::test]
    async fn test_cache_short_circuits_repeat_lookups() {
        let uuid = Uuid::new_v4();
        let host = Arc::new(
            InMemoryHost::new().with_locator(ObjectLocator::new(uuid, Uuid::nil(), "file:/tmp/a.dcm")),
        );
        let session = session(&host);
        let mut resolver = LocatorResolver::new();
        let ts = [TransferSyntax::explicit_vr_little_endian()];

        resolver.resolve(&session, &[uuid], &ts, false).await.unwrap();
        resolver.resolve(&session, &[uuid], &ts, false).await.unwrap();
        assert_eq!(host.get_data_calls().await, 1);

        // a different transfer syntax list is a different cache key
        resolver.resolve(&session, &[uuid], &[], false).await.unwrap();
        assert_eq!(host.get_data_calls().await, 2);

        resolver.invalidate();
        assert_eq!(resolver.cached(), 0);
        resolver.resolve(&session, &[uuid], &ts, false).await.unwrap();
        assert_eq!(host.get_data_calls().await, 3);
    }

    #[tokio::test]
    async fn test_any_preferred_syntax_resolves() {
        let uuid = Uuid::new_v4();
        let implicit = TransferSyntax::implicit_vr_little_endian();
        let host = Arc::new(
            InMemoryHost::new().with_strict_transfer_syntaxes().with_locator(
                ObjectLocator::new(uuid, Uuid::nil(), "file:/tmp/a.dcm")
                    .with_transfer_syntax(implicit.uuid()),
            ),
        );
        let mut resolver = LocatorResolver::new();

        let first_only = [TransferSyntax::explicit_vr_little_endian()];
        let resolution = resolver
            .resolve(&session(&host), &[uuid], &first_only, false)
            .await
            .unwrap();
        assert_eq!(resolution.unresolved, vec![uuid]);

        let both = [TransferSyntax::explicit_vr_little_endian(), implicit.clone()];
        let resolution = resolver
            .resolve(&session(&host), &[uuid], &both, false)
            .await
            .unwrap();
        assert_eq!(resolution.get(uuid).map(|l| l.transfer_syntax), Some(Some(implicit.uuid())));
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_call() {
        let host = Arc::new(InMemoryHost::new());
        let mut resolver = LocatorResolver::new();
        let resolution = resolver.resolve(&session(&host), &[], &[], false).await.unwrap();
        assert!(resolution.is_empty());
        assert!(resolution.unresolved.is_empty());
        assert_eq!(host.get_data_calls().await, 0);
    }

    #[tokio::test]
    async fn test_host_failure_propagates_and_caches_nothing() {
        let host = Arc::new(InMemoryHost::new());
        host.set_reachable(false).await;
        let mut resolver = LocatorResolver::new();
        let err = resolver
            .resolve(&session(&host), &[Uuid::new_v4()], &[], false)
            .await
            .unwrap_err();
        assert!(err.is_host_failure());
        assert_eq!(resolver.cached(), 0);
    }

    #[test]
    fn test_uri_to_path() {
        assert_eq!(uri_to_path("file:/tmp/a.dcm"), Some(PathBuf::from("/tmp/a.dcm")));
        assert_eq!(uri_to_path("file:///tmp/a.dcm"), Some(PathBuf::from("/tmp/a.dcm")));
        assert_eq!(uri_to_path("FILE:/tmp/a.dcm"), Some(PathBuf::from("/tmp/a.dcm")));
        assert_eq!(
            uri_to_path("file:///tmp/with%20space.dcm"),
            Some(PathBuf::from("/tmp/with space.dcm"))
        );
        assert_eq!(uri_to_path("http://host/a.dcm"), None);
        assert_eq!(uri_to_path("fi"), None);
    }
}
