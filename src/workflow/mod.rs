//! Outcome/condition model and the pass-scoped reconciliation context.

pub mod condition;
pub mod context;
pub mod reason;
pub mod result;

pub use condition::{Condition, ConditionStatus, ConditionType, Conditions};
pub use context::{guarded, Context, PassReport};
pub use reason::{
    AlertConfigurationFailure, CloudIntegrationFailure, CustomRoleFailure, IntegrationFailure,
    NetworkPeeringFailure, Reason, Step, TeamFailure,
};
pub use result::{Outcome, DEFAULT_RETRY};
