// Account and job provisioning against the remote video service

pub mod provisioning;

pub use provisioning::{ProvisioningState, ProvisioningWorkflow};
