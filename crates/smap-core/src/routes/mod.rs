//! Host-router introspection.
//!
//! The engine never owns a router. The host application registers its route
//! tables with a [`RouterRegistry`] at startup (or exposes one through an
//! [`Endpoint`]) and the [`RouteResolver`] answers two questions against it:
//!
//! - which URL pattern serves a given content type, and
//! - whether a route requires an authenticated session.
//!
//! Every lookup degrades to `None` / `false` / empty when no router can be
//! found or introspection fails, so sources can fall back to building paths
//! from settings.
//!
//! ```rust
//! use std::sync::Arc;
//! use smap_core::routes::{RouteDescriptor, RouteResolver, RouterRegistry, StaticRouteTable};
//! use smap_core::config::RouterSettings;
//!
//! let table = StaticRouteTable::new(vec![
//!     RouteDescriptor::get("/blog/:slug", "BlogController.show"),
//!     RouteDescriptor::get("/admin/posts", "AdminController.index").with_pipelines(["browser", "admin"]),
//! ]);
//!
//! let mut registry = RouterRegistry::new();
//! registry.register("ShopWeb.Router", Arc::new(table));
//!
//! let settings = RouterSettings { router: Some("ShopWeb.Router".into()), ..RouterSettings::default() };
//! let resolver = RouteResolver::new(settings, registry);
//!
//! assert_eq!(resolver.find_content_route("blog").as_deref(), Some("/blog/:slug"));
//! assert!(resolver.is_protected("/admin/posts"));
//! ```

mod resolver;

pub use resolver::{DiscoveryStrategy, ResolvedRoutes, RouteResolver, build_path, pattern_matches};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One route from the host router's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// HTTP verb, upper case.
    pub verb: String,
    /// Pattern with `:param` and `*wildcard` placeholders.
    pub path: String,
    /// Identity of the handler (controller action, component module).
    pub handler: String,
    /// Middleware chain and component hooks.
    #[serde(default)]
    pub metadata: RouteMetadata,
}

/// Route metadata relevant to auth-protection detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMetadata {
    /// Pipeline / middleware names applied to the route.
    #[serde(default)]
    pub pipelines: Vec<String>,
    /// Pre-render mount hooks of component (live view) routes.
    #[serde(default)]
    pub mount_hooks: Vec<String>,
}

impl RouteDescriptor {
    /// A route with an arbitrary verb.
    pub fn new(verb: &str, path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            verb: verb.to_uppercase(),
            path: path.into(),
            handler: handler.into(),
            metadata: RouteMetadata::default(),
        }
    }

    /// A GET route.
    pub fn get(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new("GET", path, handler)
    }

    /// Attach pipeline names.
    #[must_use]
    pub fn with_pipelines<I, S>(mut self, pipelines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.pipelines = pipelines.into_iter().map(Into::into).collect();
        self
    }

    /// Attach component mount hooks.
    #[must_use]
    pub fn with_mount_hooks<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.mount_hooks = hooks.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this is a GET route.
    pub fn is_get(&self) -> bool {
        self.verb.eq_ignore_ascii_case("GET")
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Whether the pattern contains any `:param` or `*wildcard`.
    pub fn has_placeholders(&self) -> bool {
        self.segments()
            .any(|s| s.starts_with(':') || s.starts_with('*'))
    }
}

/// A router capable of listing its routes.
///
/// Introspection may fail; the resolver treats any error (or panic) as
/// "no router".
pub trait RouteTable: Send + Sync {
    /// Return the full route table.
    fn routes(&self) -> Result<Vec<RouteDescriptor>>;
}

/// An application endpoint that knows which router it dispatches to.
pub trait Endpoint: Send + Sync {
    /// The endpoint's router, if it has one.
    fn router(&self) -> Option<Arc<dyn RouteTable>>;
}

/// A fixed, in-memory route table.
#[derive(Debug, Clone, Default)]
pub struct StaticRouteTable {
    routes: Vec<RouteDescriptor>,
}

impl StaticRouteTable {
    /// Wrap a list of routes.
    pub const fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }
}

impl RouteTable for StaticRouteTable {
    fn routes(&self) -> Result<Vec<RouteDescriptor>> {
        Ok(self.routes.clone())
    }
}

/// Named route tables the host registered at startup.
///
/// This is the allow-list that both explicit configuration and
/// naming-convention discovery resolve against.
#[derive(Clone, Default)]
pub struct RouterRegistry {
    routers: BTreeMap<String, Arc<dyn RouteTable>>,
}

impl fmt::Debug for RouterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterRegistry")
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RouterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a router under a name such as `ShopWeb.Router`.
    pub fn register(&mut self, name: impl Into<String>, router: Arc<dyn RouteTable>) {
        self.routers.insert(name.into(), router);
    }

    /// Look up a router by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn RouteTable>> {
        self.routers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routers.keys().map(String::as_str)
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }
}
