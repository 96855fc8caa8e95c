//! Permission evaluation.
//!
//! Authorization compares action keys only. A principal's effective keys are
//! the action keys of its role's grants, skipping grants whose permission was
//! deleted. Evaluation is pure and cheap, so it can run on every render.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use backoffice_proto::{Principal, Role};

use crate::error::Error;

/// Wildcard requirement, satisfied by anyone.
pub const WILDCARD: &str = "*";

/// How a list of required keys is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Every key must be granted.
    All,
    /// At least one key must be granted.
    Any,
}

/// What a guarded affordance requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequiredPermission {
    /// Always satisfied, even without a principal.
    Wildcard,
    /// A single action key.
    Single(String),
    /// Several action keys combined by `policy`.
    List { keys: Vec<String>, policy: Policy },
}

impl RequiredPermission {
    pub fn single(key: impl Into<String>) -> Self {
        RequiredPermission::Single(key.into())
    }

    pub fn all<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RequiredPermission::List {
            keys: keys.into_iter().map(Into::into).collect(),
            policy: Policy::All,
        }
    }

    pub fn any<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RequiredPermission::List {
            keys: keys.into_iter().map(Into::into).collect(),
            policy: Policy::Any,
        }
    }

    /// Whether this requirement is satisfied unconditionally.
    ///
    /// An empty key or an empty list counts as no requirement.
    pub fn is_wildcard(&self) -> bool {
        match self {
            RequiredPermission::Wildcard => true,
            RequiredPermission::Single(key) => key.is_empty() || key == WILDCARD,
            RequiredPermission::List { keys, .. } => keys.is_empty(),
        }
    }
}

impl Default for RequiredPermission {
    fn default() -> Self {
        RequiredPermission::Wildcard
    }
}

impl fmt::Display for RequiredPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredPermission::Wildcard => write!(f, "{}", WILDCARD),
            RequiredPermission::Single(key) => write!(f, "{}", key),
            RequiredPermission::List { keys, policy } => {
                let sep = match policy {
                    Policy::All => ",",
                    Policy::Any => "|",
                };
                write!(f, "{}", keys.join(sep))
            }
        }
    }
}

/// Parses `*`, `key`, `a,b` (all) and `a|b` (any).
impl FromStr for RequiredPermission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == WILDCARD {
            return Ok(RequiredPermission::Wildcard);
        }

        let has_all = s.contains(',');
        let has_any = s.contains('|');
        if has_all && has_any {
            return Err(Error::InvalidPermission(format!(
                "cannot mix ',' and '|' in '{}'",
                s
            )));
        }

        let split = |sep: char| -> Result<Vec<String>, Error> {
            s.split(sep)
                .map(str::trim)
                .map(|key| {
                    if key.is_empty() {
                        Err(Error::InvalidPermission(format!("empty key in '{}'", s)))
                    } else {
                        Ok(key.to_string())
                    }
                })
                .collect()
        };

        if has_all {
            Ok(RequiredPermission::all(split(',')?))
        } else if has_any {
            Ok(RequiredPermission::any(split('|')?))
        } else {
            Ok(RequiredPermission::single(s))
        }
    }
}

impl From<&str> for RequiredPermission {
    fn from(key: &str) -> Self {
        if key == WILDCARD {
            RequiredPermission::Wildcard
        } else {
            RequiredPermission::single(key)
        }
    }
}

/// The set of action keys a role grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    keys: HashSet<String>,
}

impl EffectivePermissions {
    /// Collect the keys of `role`, dropping dangling grants.
    pub fn from_role(role: &Role) -> Self {
        Self {
            keys: role.action_keys().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in sorted order.
    pub fn sorted(&self) -> Vec<&str> {
        self.keys
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether these keys meet `required`.
    pub fn satisfies(&self, required: &RequiredPermission) -> bool {
        if required.is_wildcard() {
            return true;
        }
        match required {
            RequiredPermission::Wildcard => true,
            RequiredPermission::Single(key) => self.contains(key),
            RequiredPermission::List {
                keys,
                policy: Policy::All,
            } => keys.iter().all(|key| self.contains(key)),
            RequiredPermission::List {
                keys,
                policy: Policy::Any,
            } => keys.iter().any(|key| self.contains(key)),
        }
    }
}

/// Decide whether `principal` meets `required`.
///
/// A wildcard (or empty) requirement is met even without a principal. A
/// missing principal, or one whose role has no grants, meets nothing else.
pub fn evaluate(principal: Option<&Principal>, required: &RequiredPermission) -> bool {
    if required.is_wildcard() {
        return true;
    }

    let Some(principal) = principal else {
        return false;
    };
    if principal.role.grants.is_empty() {
        return false;
    }

    EffectivePermissions::from_role(&principal.role).satisfies(required)
}

/// Permission helpers on [`Principal`].
pub trait PermissionsExt {
    /// The action keys granted to this principal.
    fn effective_permissions(&self) -> EffectivePermissions;

    /// Shorthand for [`evaluate`].
    fn can(&self, required: &RequiredPermission) -> bool;
}

impl PermissionsExt for Principal {
    fn effective_permissions(&self) -> EffectivePermissions {
        EffectivePermissions::from_role(&self.role)
    }

    fn can(&self, required: &RequiredPermission) -> bool {
        evaluate(Some(self), required)
    }
}
