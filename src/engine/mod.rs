pub mod assignment;
pub mod cash_policy;
pub mod coordinator;
pub mod filters;
pub mod lifecycle;
pub mod queue;
pub mod ranking;
pub mod reconciler;
