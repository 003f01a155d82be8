//! Controllers that turn Services into load-balancer virtual servers.
//!
//! [`vip::VipController`] reconciles one Service key at a time: it obtains an
//! address through the [`gateway::AllocationGateway`], writes one
//! virtual-server record per wanted port, promotes the active VIP once the
//! load-balancer controller reports every record as programmed, and sweeps
//! records for ports that went away. [`runtime::ControllerRuntime`] drives it
//! from the store's watch stream through a keyed [`queue::WorkQueue`].

pub mod builder;
pub mod diff;
pub mod gateway;
pub mod naming;
pub mod queue;
pub mod router;
pub mod runtime;
pub mod sweep;
pub mod vip;

#[cfg(test)]
mod sim;
