//! Vigil Server: dual authentication pipelines and unit-of-work tenant
//! isolation for a multi-tenant whistleblowing service.

pub mod app;
pub mod auth;
pub mod network;
pub mod service;
pub mod storage;
pub mod tenancy;

pub use app::Vigil;
