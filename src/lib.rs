//! Atlas Converge - project sub-resource reconciliation engine
//!
//! Converges the sub-resources of a cloud control-plane project (custom
//! roles, network peering, cloud provider access, alert configurations,
//! third-party integrations and team assignments) toward a declared spec,
//! one pass at a time.

pub mod apply;
pub mod config;
pub mod diff;
pub mod families;
pub mod logging;
pub mod normalize;
pub mod project;
pub mod protection;
pub mod readiness;
pub mod remote;
pub mod status;
pub mod store;
pub mod workflow;
