//! Orchestration core of the hive compute network.
//!
//! A node runs in one of two roles: a *head* accepts execution requests,
//! solicits volunteers over the roll-call protocol, optionally forms a
//! consensus cluster among them, dispatches the work order and aggregates
//! the replies; a *worker* volunteers for work it can actually do and
//! executes it, directly or through a replicated-execution engine.

mod dispatch;
mod head;
mod health;
mod manager;
mod messages;
mod node;
mod pipeline;
mod rollcall;
mod settings;
mod worker;
mod worker_role;

pub mod error;

pub use error::NodeError;
pub use head::ExecuteOutcome;
pub use manager::NodeManager;
pub use messages::{
    DisbandCluster, FormCluster, FormClusterResponse, HealthCheck, InboundMessage,
    InstallFunction, InstallFunctionResponse, Message, MessageKind, MessagesHandler, RollCall,
    RollCallResponse, WorkOrder, WorkOrderResponse,
};
pub use node::Node;
pub use settings::{NodeConfig, NodeRole};
pub use worker::start_node;

#[cfg(test)]
mod tests;
