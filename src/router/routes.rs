#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fmt;

use crate::utils::errors::Errors;

// Longest redirect chain followed before giving up.
const MAX_REDIRECTS : usize = 8;

// ***************************************************************************
//                               Route Types
// ***************************************************************************
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageComponent {
    Home,
    AboutMe,
    SnakeGame,
    SearchComponent,
    AITools,
    MessageBoard,
}

/// How the client bundle loads a page component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRef {
    Eager(PageComponent),
    Lazy(PageComponent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Component(ComponentRef),
    Redirect(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub target: RouteTarget,
}

impl PageComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageComponent::Home => "Home",
            PageComponent::AboutMe => "AboutMe",
            PageComponent::SnakeGame => "SnakeGame",
            PageComponent::SearchComponent => "SearchComponent",
            PageComponent::AITools => "AITools",
            PageComponent::MessageBoard => "MessageBoard",
        }
    }
}

impl fmt::Display for PageComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ComponentRef {
    pub fn component(&self) -> PageComponent {
        match self {
            ComponentRef::Eager(c) | ComponentRef::Lazy(c) => *c,
        }
    }

    pub fn load_mode(&self) -> &'static str {
        match self {
            ComponentRef::Eager(_) => "eager",
            ComponentRef::Lazy(_) => "lazy",
        }
    }
}

// ***************************************************************************
//                               Route Table
// ***************************************************************************
static STANDARD_ROUTES: &[Route] = &[
    Route {path: "/home", name: Some("home"),
           target: RouteTarget::Component(ComponentRef::Lazy(PageComponent::Home))},
    Route {path: "/about", name: Some("about"),
           target: RouteTarget::Component(ComponentRef::Eager(PageComponent::AboutMe))},
    Route {path: "/snake", name: Some("snake"),
           target: RouteTarget::Component(ComponentRef::Eager(PageComponent::SnakeGame))},
    Route {path: "/search", name: Some("search"),
           target: RouteTarget::Component(ComponentRef::Lazy(PageComponent::SearchComponent))},
    Route {path: "/ai-tools", name: Some("ai-tools"),
           target: RouteTarget::Component(ComponentRef::Lazy(PageComponent::AITools))},
    Route {path: "/message-board", name: Some("message-board"),
           target: RouteTarget::Component(ComponentRef::Lazy(PageComponent::MessageBoard))},
    Route {path: "/", name: None, target: RouteTarget::Redirect("/home")},
];

/** The site's navigable paths.  Matching follows the client router's
 * defaults: case-insensitive, with an optional trailing slash.
 */
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: &'static [Route],
}

impl RouteTable {
    pub fn standard() -> Self {
        Self {routes: STANDARD_ROUTES}
    }

    pub fn routes(&self) -> &'static [Route] {
        self.routes
    }

    /// Check path uniqueness and that every redirect ends at a component.
    pub fn validate(&self) -> Result<(), Errors> {
        let mut seen = HashSet::new();
        for route in self.routes {
            if !seen.insert(normalize_path(route.path)) {
                return Err(Errors::DuplicateRoute(route.path.to_string()));
            }
        }
        for route in self.routes {
            if let RouteTarget::Redirect(to) = route.target {
                if self.lookup(to).is_none() {
                    return Err(Errors::UnknownRedirect(route.path.to_string(), to.to_string()));
                }
                if self.resolve(route.path).is_none() {
                    return Err(Errors::RedirectLoop(route.path.to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn lookup(&self, path: &str) -> Option<&'static Route> {
        let wanted = normalize_path(path);
        self.routes.iter().find(|r| normalize_path(r.path) == wanted)
    }

    /// Follow redirects to the route whose component gets mounted.
    pub fn resolve(&self, path: &str) -> Option<(&'static Route, ComponentRef)> {
        let mut route = self.lookup(path)?;
        for _ in 0..=MAX_REDIRECTS {
            match route.target {
                RouteTarget::Component(c) => return Some((route, c)),
                RouteTarget::Redirect(to) => route = self.lookup(to)?,
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// normalize_path:
// ---------------------------------------------------------------------------
fn normalize_path(path: &str) -> String {
    let trimmed = match path.strip_suffix('/') {
        Some(p) if !p.is_empty() => p,
        _ => path,
    };
    let lower = trimmed.to_lowercase();
    if lower.is_empty() { "/".to_string() } else { lower }
}
