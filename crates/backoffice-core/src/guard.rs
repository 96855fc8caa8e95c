//! Route and inline guards.
//!
//! Guards turn the session state and a required permission into a rendering
//! decision. They never mutate state and never show notices: a denied route
//! silently redirects and a denied inline affordance is disabled or hidden.

use crate::permission::{evaluate, RequiredPermission};
use crate::session::Hydration;

/// Well-known routes guards redirect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub sign_in: String,
    /// Where a signed-in principal lands when visiting a guest-only route.
    pub landing: String,
    pub not_found: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            sign_in: "/auth/login".to_string(),
            landing: "/dashboard".to_string(),
            not_found: "/404".to_string(),
        }
    }
}

/// Outcome of a route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still hydrating; render nothing yet.
    Pending,
    Render,
    Redirect(String),
}

impl GuardDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardDecision::Render)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::Redirect(to) => Some(to),
            _ => None,
        }
    }
}

/// Requires a signed-in principal.
#[derive(Debug, Clone, Default)]
pub struct AuthGuard {
    routes: Routes,
}

impl AuthGuard {
    pub fn new(routes: Routes) -> Self {
        Self { routes }
    }

    pub fn decide(&self, session: &Hydration) -> GuardDecision {
        match session {
            Hydration::NotHydrated => GuardDecision::Pending,
            Hydration::Empty => GuardDecision::Redirect(self.routes.sign_in.clone()),
            Hydration::Present(_) => GuardDecision::Render,
        }
    }
}

/// Keeps signed-in principals away from guest-only routes.
#[derive(Debug, Clone, Default)]
pub struct GuestGuard {
    routes: Routes,
}

impl GuestGuard {
    pub fn new(routes: Routes) -> Self {
        Self { routes }
    }

    pub fn decide(&self, session: &Hydration) -> GuardDecision {
        match session {
            Hydration::NotHydrated => GuardDecision::Pending,
            Hydration::Empty => GuardDecision::Render,
            Hydration::Present(_) => GuardDecision::Redirect(self.routes.landing.clone()),
        }
    }
}

/// Requires a signed-in principal that meets a permission requirement.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    auth: AuthGuard,
    required: RequiredPermission,
    /// Redirect target on denial. Defaults to the not-found route.
    fallback: Option<String>,
}

impl PermissionGuard {
    pub fn new(routes: Routes, required: RequiredPermission) -> Self {
        Self {
            auth: AuthGuard::new(routes),
            required,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, route: impl Into<String>) -> Self {
        self.fallback = Some(route.into());
        self
    }

    pub fn required(&self) -> &RequiredPermission {
        &self.required
    }

    pub fn decide(&self, session: &Hydration) -> GuardDecision {
        match self.auth.decide(session) {
            GuardDecision::Render => {}
            other => return other,
        }

        if evaluate(session.principal().map(|p| p.as_ref()), &self.required) {
            GuardDecision::Render
        } else {
            let to = self
                .fallback
                .clone()
                .unwrap_or_else(|| self.auth.routes.not_found.clone());
            GuardDecision::Redirect(to)
        }
    }
}

/// How a denied inline affordance is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Rendered but not interactive.
    #[default]
    Disabled,
    /// Not rendered at all.
    Invisible,
}

/// Outcome of an inline check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineDecision {
    Render,
    Disabled,
    Hidden,
}

/// Inline permission check for buttons, menu entries and the like.
///
/// Unlike the route guards it does not require a signed-in principal, so a
/// wildcard requirement renders for anonymous sessions.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    required: RequiredPermission,
    display: DisplayMode,
}

impl PermissionGate {
    pub fn new(required: RequiredPermission) -> Self {
        Self {
            required,
            display: DisplayMode::default(),
        }
    }

    pub fn with_display(mut self, display: DisplayMode) -> Self {
        self.display = display;
        self
    }

    pub fn decide(&self, session: &Hydration) -> InlineDecision {
        if evaluate(session.principal().map(|p| p.as_ref()), &self.required) {
            return InlineDecision::Render;
        }
        match self.display {
            DisplayMode::Disabled => InlineDecision::Disabled,
            DisplayMode::Invisible => InlineDecision::Hidden,
        }
    }
}
