use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a raw integer cannot become an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} identifier must be strictly positive, got {value}")]
pub struct InvalidId {
    /// Which identifier family rejected the value.
    pub kind: &'static str,
    /// The rejected raw value.
    pub value: i64,
}

macro_rules! positive_id {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Builds the identifier, rejecting zero and negative values.
            ///
            /// # Errors
            ///
            /// Returns [`InvalidId`] when `value <= 0`.
            pub fn new(value: i64) -> Result<Self, InvalidId> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(InvalidId { kind: $kind, value })
                }
            }

            /// Raw value, for persistence adapters and logging.
            #[must_use]
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = InvalidId;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

positive_id!(
    /// Identifier of a tenant (a company using the platform).
    ///
    /// There is no "default" or "unset" tenant value: the legacy `-1`
    /// placeholder is unrepresentable, and absence is `Option::None`.
    TenantId, "tenant"
);

positive_id!(
    /// Identifier of a tenant-domain user (Responder, Manager, ...).
    UserId, "user"
);

positive_id!(
    /// Identifier of a platform administrator. Disjoint from [`UserId`].
    AdminId, "admin"
);

positive_id!(
    /// Identifier of a case (a whistleblower report) within its tenant.
    CaseId, "case"
);

/// Authentication domain a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Platform administration.
    Admin,
    /// Tenant (company) users and the anonymous channel.
    Tenant,
}

impl Domain {
    /// Stable lowercase name used in logs and token headers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Tenant => "tenant",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only role an admin credential can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminRole {
    #[serde(rename = "ADMIN")]
    Administrator,
}

/// Role of a user within its tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantRole {
    /// Handles incoming cases.
    Responder,
    /// Manages responders and tenant settings.
    Manager,
    /// Follow-up credential for a reporter; never opens the staff panel.
    AnonymousChannel,
}

impl TenantRole {
    /// Whether this role may use the authenticated staff panel.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Responder | Self::Manager)
    }
}

/// Resolved platform administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub id: AdminId,
}

/// Resolved tenant user. The tenant is the one the user belongs to, checked
/// against the directory at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantUserPrincipal {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub role: TenantRole,
}

/// Who is making a request.
///
/// `Anonymous` is never produced from a credential: it is what the
/// whistleblower channel forces regardless of any bearer token presented.
/// `System` is internal work with no inbound request; no HTTP path yields it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Admin(AdminPrincipal),
    TenantUser(TenantUserPrincipal),
    Anonymous,
    System,
}

impl Principal {
    /// Short label for logs; never includes identifiers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Admin(_) => "admin",
            Self::TenantUser(_) => "tenant_user",
            Self::Anonymous => "anonymous",
            Self::System => "system",
        }
    }
}

/// Processing state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    New,
    InProgress,
    Closed,
}
