//! Resource registry and chain resolution.
//!
//! The registry is an explicit object owned by the executor, not a
//! process-wide singleton. It maps each request type to the resource-link
//! path between the client and the request, is populated at construction
//! time, and can be invalidated and rebuilt on demand.

use crate::chain::ChainLink;
use crate::error::Error;
use crate::request::ApiRequest;
use std::collections::HashMap;
use std::sync::Arc;

type LinkPath = Vec<Arc<dyn ChainLink>>;
type RescanHook = Box<dyn Fn(&mut ResourceRegistry) + Send + Sync>;

/// Static resource-tree map: request type name → resource path (root to
/// leaf). The client link always precedes the path; the request itself is
/// always the innermost element of the chain.
#[derive(Default)]
pub struct ResourceRegistry {
    paths: HashMap<&'static str, LinkPath>,
    rescan: Option<RescanHook>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a hook re-run once when a lookup misses, as a fallback
    /// recovery before raising an unresolved-reference error.
    #[must_use]
    pub fn with_rescan(mut self, hook: impl Fn(&mut ResourceRegistry) + Send + Sync + 'static) -> Self {
        self.rescan = Some(Box::new(hook));
        self
    }

    /// Registers the resource path for a request type. Re-registration
    /// replaces the previous path.
    pub fn register<R: ApiRequest>(&mut self, resources: LinkPath) {
        self.paths.insert(R::declaration().type_name, resources);
    }

    /// Resolves the resource path for a request type, attempting one re-scan
    /// on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedChain`] when the type stays unregistered
    /// after the re-scan.
    pub fn resolve<R: ApiRequest>(&mut self) -> Result<LinkPath, Error> {
        let key = R::declaration().type_name;
        if let Some(path) = self.paths.get(key) {
            return Ok(path.clone());
        }

        if let Some(rescan) = self.rescan.take() {
            tracing::debug!(
                target: "reqchain::registry",
                request = key,
                "resource path missing, re-scanning"
            );
            rescan(self);
            self.rescan = Some(rescan);
            if let Some(path) = self.paths.get(key) {
                return Ok(path.clone());
            }
        }

        Err(Error::UnresolvedChain {
            type_name: key.to_string(),
        })
    }

    /// Drops all registered paths. The next lookup re-scans if a hook is
    /// installed.
    pub fn invalidate(&mut self) {
        self.paths.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Method, RequestDeclaration};
    use serde::Serialize;
    use serde_json::Value;
    use std::sync::LazyLock;

    #[derive(Debug, Serialize)]
    struct GetUser;

    static GET_USER: LazyLock<RequestDeclaration> =
        LazyLock::new(|| RequestDeclaration::new("GetUser", Method::Get, "/users/{id}"));

    impl ApiRequest for GetUser {
        type Output = Value;

        fn declaration() -> &'static RequestDeclaration {
            &GET_USER
        }
    }

    struct UsersResource;

    impl ChainLink for UsersResource {
        fn name(&self) -> &str {
            "users"
        }
    }

    #[test]
    fn resolve_returns_registered_path() {
        let mut registry = ResourceRegistry::new();
        registry.register::<GetUser>(vec![Arc::new(UsersResource)]);
        let path = registry.resolve::<GetUser>().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].name(), "users");
    }

    #[test]
    fn unregistered_type_raises_unresolved_chain() {
        let mut registry = ResourceRegistry::new();
        let err = registry.resolve::<GetUser>().unwrap_err();
        assert!(matches!(err, Error::UnresolvedChain { type_name } if type_name == "GetUser"));
    }

    #[test]
    fn missing_path_triggers_one_rescan() {
        let mut registry = ResourceRegistry::new().with_rescan(|registry| {
            registry.register::<GetUser>(vec![Arc::new(UsersResource)]);
        });
        assert!(registry.is_empty());
        let path = registry.resolve::<GetUser>().unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn invalidate_clears_paths_and_rescan_recovers() {
        let mut registry = ResourceRegistry::new().with_rescan(|registry| {
            registry.register::<GetUser>(vec![Arc::new(UsersResource)]);
        });
        registry.register::<GetUser>(Vec::new());
        registry.invalidate();
        assert!(registry.is_empty());
        // Rescan hook restores the mapping on the next lookup.
        assert!(registry.resolve::<GetUser>().is_ok());
    }
}
