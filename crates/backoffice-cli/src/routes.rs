//! The dashboard's route table.

use serde::Serialize;

use backoffice_core::{
    AuthGuard, GuardDecision, GuestGuard, Hydration, PermissionGuard, RequiredPermission, Routes,
};

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "permission")]
pub enum Access {
    /// Only without a session.
    Guest,
    /// Any signed-in principal.
    Authenticated,
    /// A signed-in principal holding the action key.
    Permission(&'static str),
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Guest => write!(f, "guest"),
            Access::Authenticated => write!(f, "signed in"),
            Access::Permission(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub path: &'static str,
    pub access: Access,
}

pub const ROUTES: &[RouteEntry] = &[
    RouteEntry { path: "/auth/login", access: Access::Guest },
    RouteEntry { path: "/dashboard", access: Access::Authenticated },
    RouteEntry { path: "/admins", access: Access::Permission("admin-view") },
    RouteEntry { path: "/roles", access: Access::Permission("role-view") },
    RouteEntry { path: "/permissions", access: Access::Permission("permission-view") },
    RouteEntry { path: "/schedule", access: Access::Permission("schedule-view") },
    RouteEntry { path: "/settings", access: Access::Permission("setting-view") },
];

/// Find the entry serving `path`. Nested paths belong to their section, so
/// `/admins/12` is served by `/admins`.
pub fn find(path: &str) -> Option<&'static RouteEntry> {
    let path = path.split(&['?', '#'][..]).next().unwrap_or(path);
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    ROUTES.iter().find(|entry| {
        path == entry.path
            || path
                .strip_prefix(entry.path)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

impl RouteEntry {
    pub fn decide(&self, routes: &Routes, session: &Hydration) -> GuardDecision {
        match self.access {
            Access::Guest => GuestGuard::new(routes.clone()).decide(session),
            Access::Authenticated => AuthGuard::new(routes.clone()).decide(session),
            Access::Permission(key) => {
                PermissionGuard::new(routes.clone(), RequiredPermission::single(key)).decide(session)
            }
        }
    }
}

/// Decision for visiting `path`; unknown paths go to the not-found route.
pub fn visit(path: &str, routes: &Routes, session: &Hydration) -> GuardDecision {
    match find(path) {
        Some(entry) => entry.decide(routes, session),
        None => GuardDecision::Redirect(routes.not_found.clone()),
    }
}
