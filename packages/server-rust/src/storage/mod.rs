//! In-memory persistence adapters.
//!
//! Two families live here:
//!
//! - **Tenant-partitioned data** ([`CaseRepository`]): every method takes the
//!   tenant explicitly. Business code never calls it directly; it goes
//!   through [`TenantScopedDataGate`](crate::tenancy::TenantScopedDataGate),
//!   which supplies the tenant from the unit-of-work context.
//! - **Platform registries** ([`MemoryDirectory`]): admins, tenants, users,
//!   revocations, activation tokens, message authorship. These are consulted
//!   during authentication, before any tenant context exists.

pub mod cases;
pub mod directory;

pub use cases::{CaseRecord, CaseRepository, MemoryCaseStore, NewCase};
pub use directory::MemoryDirectory;

/// Seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
