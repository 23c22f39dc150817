//! Router discovery, route classification and auth-protection detection.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Endpoint, RouteDescriptor, RouteTable, RouterRegistry};
use crate::config::RouterSettings;

/// Mount hooks that only make sense with a logged-in session.
const SESSION_HOOKS: &[&str] = &[
    "require_authenticated",
    "require_authenticated_user",
    "ensure_authenticated",
    "require_admin",
    "mount_current_user",
];

/// Naming conventions probed during discovery, `{}` is the namespace.
const ROUTER_NAME_CONVENTIONS: &[&str] = &["{}Web.Router", "{}.Router", "{}Web.Router.Router"];

/// Parameter names that identify a single content item.
const CONTENT_PARAMS: &[&str] = &[":slug", ":id"];

/// How the active router was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    /// Named explicitly in configuration.
    Configured(String),
    /// Exposed by the configured endpoint.
    Endpoint,
    /// Found by naming convention under an application namespace.
    Convention(String),
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured(name) => write!(f, "configured router {name}"),
            Self::Endpoint => f.write_str("endpoint router"),
            Self::Convention(name) => write!(f, "discovered router {name}"),
        }
    }
}

/// Answers route-pattern and protection queries against the host router.
#[derive(Clone)]
pub struct RouteResolver {
    settings: RouterSettings,
    registry: RouterRegistry,
    endpoint: Option<Arc<dyn Endpoint>>,
}

impl fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResolver")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("has_endpoint", &self.endpoint.is_some())
            .finish()
    }
}

impl RouteResolver {
    /// Create a resolver over the routers the host registered.
    pub const fn new(settings: RouterSettings, registry: RouterRegistry) -> Self {
        Self {
            settings,
            registry,
            endpoint: None,
        }
    }

    /// A resolver with no routers; every query falls back.
    pub fn unavailable() -> Self {
        Self::new(RouterSettings::default(), RouterRegistry::new())
    }

    /// Attach the application endpoint (second discovery step).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Locate the router: configuration, then endpoint, then naming convention.
    pub fn discover(&self) -> Option<(DiscoveryStrategy, Arc<dyn RouteTable>)> {
        if let Some(name) = self.settings.router.as_deref() {
            match self.registry.get(name) {
                Some(router) => return Some((DiscoveryStrategy::Configured(name.to_string()), router)),
                None => warn!(router = %name, "Configured router is not registered"),
            }
        }

        if let Some(endpoint) = &self.endpoint {
            match catch_unwind(AssertUnwindSafe(|| endpoint.router())) {
                Ok(Some(router)) => return Some((DiscoveryStrategy::Endpoint, router)),
                Ok(None) => debug!("Endpoint exposes no router"),
                Err(_) => warn!("Endpoint router lookup panicked"),
            }
        }

        if self.settings.auto_discover {
            return self.discover_by_convention();
        }

        None
    }

    fn discover_by_convention(&self) -> Option<(DiscoveryStrategy, Arc<dyn RouteTable>)> {
        let blocked = |ns: &str| {
            self.settings
                .namespace_blocklist
                .iter()
                .any(|b| b.eq_ignore_ascii_case(ns))
        };

        for namespace in self.settings.app_namespaces.iter().filter(|ns| !blocked(ns)) {
            for convention in ROUTER_NAME_CONVENTIONS {
                let candidate = convention.replace("{}", namespace);
                let Some(router) = self.registry.get(&candidate) else {
                    continue;
                };
                // Only accept a candidate that can actually be introspected.
                if introspect(router.as_ref()).is_some() {
                    debug!(router = %candidate, "Discovered router by naming convention");
                    return Some((DiscoveryStrategy::Convention(candidate), router));
                }
            }
        }
        debug!("No router found by naming convention");
        None
    }

    /// Introspect the router once and classify every route.
    ///
    /// Returns `None` if no router is reachable or introspection fails.
    pub fn resolve(&self) -> Option<ResolvedRoutes> {
        let (strategy, router) = self.discover()?;
        let routes = introspect(router.as_ref())?;
        debug!(%strategy, count = routes.len(), "Resolved router table");
        Some(ResolvedRoutes::new(routes, &self.settings.protected_pipelines))
    }

    /// Path of the first GET route handled by `handler`.
    pub fn find_route(&self, handler: &str) -> Option<String> {
        self.resolve()?.find_route(handler)
    }

    /// Pattern of the public route serving a single `content_type` item.
    pub fn find_content_route(&self, content_type: &str) -> Option<String> {
        self.resolve()?.find_content_route(content_type)
    }

    /// Pattern of the public route listing `content_type` items.
    pub fn find_index_route(&self, content_type: &str) -> Option<String> {
        self.resolve()?.find_index_route(content_type)
    }

    /// Whether the route serving `path` requires authentication.
    pub fn is_protected(&self, path: &str) -> bool {
        self.resolve().is_some_and(|r| r.is_protected(path))
    }

    /// Paths of public, parameterless GET routes.
    pub fn public_index_routes(&self) -> Vec<String> {
        self.resolve()
            .map(|r| r.public_index_routes())
            .unwrap_or_default()
    }
}

fn introspect(router: &dyn RouteTable) -> Option<Vec<RouteDescriptor>> {
    match catch_unwind(AssertUnwindSafe(|| router.routes())) {
        Ok(Ok(routes)) => Some(routes),
        Ok(Err(e)) => {
            warn!(error = %e, "Router introspection failed");
            None
        },
        Err(_) => {
            warn!("Router introspection panicked");
            None
        },
    }
}

#[derive(Debug, Clone)]
struct ClassifiedRoute {
    route: RouteDescriptor,
    protected: bool,
}

/// A snapshot of the router table with protection evaluated once per route.
#[derive(Debug, Clone)]
pub struct ResolvedRoutes {
    routes: Vec<ClassifiedRoute>,
}

impl ResolvedRoutes {
    /// Classify `routes` against a pipeline deny-list.
    pub fn new(routes: Vec<RouteDescriptor>, protected_pipelines: &[String]) -> Self {
        let routes = routes
            .into_iter()
            .map(|route| {
                let protected = route_requires_auth(&route, protected_pipelines);
                ClassifiedRoute { route, protected }
            })
            .collect();
        Self { routes }
    }

    /// All routes in router order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().map(|c| &c.route)
    }

    /// Routes paired with whether each requires authentication.
    pub fn classified(&self) -> impl Iterator<Item = (&RouteDescriptor, bool)> {
        self.routes.iter().map(|c| (&c.route, c.protected))
    }

    fn public_get(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes
            .iter()
            .filter(|c| !c.protected && c.route.is_get())
            .map(|c| &c.route)
    }

    /// Path of the first GET route handled by `handler`.
    pub fn find_route(&self, handler: &str) -> Option<String> {
        self.routes
            .iter()
            .find(|c| c.route.is_get() && c.route.handler == handler)
            .map(|c| c.route.path.clone())
    }

    /// Content route for `content_type`, falling back to a `/:name/:slug`
    /// catch-all specialized with the content type.
    pub fn find_content_route(&self, content_type: &str) -> Option<String> {
        let name = content_type.to_lowercase();

        let named = self
            .public_get()
            .find(|r| is_content_route(r) && matches_entity(&r.path, &name));
        if let Some(route) = named {
            return Some(route.path.clone());
        }

        self.public_get()
            .find(|r| is_content_catch_all(r))
            .map(|r| specialize_catch_all(&r.path, &name))
    }

    /// Index route for `content_type`, falling back to a `/:name` catch-all.
    pub fn find_index_route(&self, content_type: &str) -> Option<String> {
        let name = content_type.to_lowercase();

        let named = self
            .public_get()
            .find(|r| !r.has_placeholders() && matches_entity(&r.path, &name));
        if let Some(route) = named {
            return Some(route.path.clone());
        }

        self.public_get()
            .find(|r| is_index_catch_all(r))
            .map(|r| specialize_catch_all(&r.path, &name))
    }

    /// Whether the first route matching `path` (pattern or concrete path)
    /// requires authentication. Unknown paths are not protected.
    pub fn is_protected(&self, path: &str) -> bool {
        self.routes
            .iter()
            .find(|c| c.route.path == path || pattern_matches(&c.route.path, path))
            .is_some_and(|c| c.protected)
    }

    /// Paths of public, parameterless GET routes, deduplicated in router order.
    pub fn public_index_routes(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.public_get()
            .filter(|r| !r.has_placeholders())
            .filter(|r| seen.insert(r.path.as_str()))
            .map(|r| r.path.clone())
            .collect()
    }
}

fn route_requires_auth(route: &RouteDescriptor, protected_pipelines: &[String]) -> bool {
    let by_pipeline = route.metadata.pipelines.iter().any(|p| {
        let p = p.trim_start_matches(':');
        protected_pipelines.iter().any(|d| d.eq_ignore_ascii_case(p))
    });
    if by_pipeline {
        return true;
    }

    route.metadata.mount_hooks.iter().any(|hook| {
        // Hooks may be qualified: `UserAuth.require_authenticated`, `{UserAuth, :mount_current_user}`.
        let name = hook
            .rsplit(['.', ':', ' ', ','])
            .find(|s| !s.is_empty())
            .unwrap_or(hook)
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
        SESSION_HOOKS.contains(&name)
    })
}

fn is_content_route(route: &RouteDescriptor) -> bool {
    route.segments().any(|s| CONTENT_PARAMS.contains(&s))
}

fn is_content_catch_all(route: &RouteDescriptor) -> bool {
    let segments: Vec<&str> = route.segments().collect();
    matches!(segments.as_slice(), [first, last]
        if first.starts_with(':') && !CONTENT_PARAMS.contains(first) && CONTENT_PARAMS.contains(last))
}

fn is_index_catch_all(route: &RouteDescriptor) -> bool {
    let segments: Vec<&str> = route.segments().collect();
    matches!(segments.as_slice(), [only] if only.starts_with(':'))
}

/// Replace the first parameter segment with the concrete content type.
fn specialize_catch_all(pattern: &str, name: &str) -> String {
    let mut replaced = false;
    let segments: Vec<String> = pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if !replaced && s.starts_with(':') {
                replaced = true;
                name.to_string()
            } else {
                s.to_string()
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Does `path` belong to the entity `name` (singular or `name + "s"`)?
fn matches_entity(path: &str, name: &str) -> bool {
    let lower = path.to_lowercase();
    let plural = format!("{name}s");
    [name, plural.as_str()].iter().any(|n| {
        lower.contains(&format!("/{n}/")) || lower.ends_with(&format!("/{n}"))
    })
}

/// Whether a concrete `path` is served by `pattern`.
///
/// `:param` matches one segment, `*wildcard` matches the remainder.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), _) if p.starts_with('*') => return true,
            (Some(p), Some(_)) if p.starts_with(':') => {},
            (Some(p), Some(s)) if p == s => {},
            _ => return false,
        }
    }
}

/// Fill `:param` placeholders in `pattern`.
///
/// Returns `None` if a placeholder has no value or a wildcard remains.
pub fn build_path(pattern: &str, params: &[(&str, &str)]) -> Option<String> {
    let mut out = Vec::new();
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        if let Some(key) = segment.strip_prefix(':') {
            let (_, value) = params.iter().find(|(k, _)| *k == key)?;
            out.push((*value).to_string());
        } else if segment.starts_with('*') {
            return None;
        } else {
            out.push(segment.to_string());
        }
    }
    Some(format!("/{}", out.join("/")))
}
