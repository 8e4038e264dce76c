//! Routing Module Index
//!
//! The routing capability modules mount onto: a shared route table carved into
//! prefix-scoped groups, and the three-tier triple every module receives.

/// Route table, prefix-scoped groups and named authorization requirements.
pub mod group;

/// The public / authenticated / admin triple passed to `Module::mount_routes`.
pub mod tiers;

pub use group::{ApiRouter, Requirement, RouteGroup, RouteInfo};
pub use tiers::RouteGroups;
