use hive_network_exports::Pipeline;

use crate::messages::MessageKind;

/// Static policy table declaring which message kinds may legitimately
/// arrive on which delivery pipeline.
///
/// Responses and cluster/work instructions are only ever solicited
/// peer-to-peer: accepting them off a topic would let any subscriber
/// forge a result or drive another node's cluster state. Roll calls and
/// health checks are only ever broadcast: an unsolicited direct copy is
/// a probe for node state and is dropped without acknowledgement.
pub(crate) fn allowed_on(kind: MessageKind, pipeline: Pipeline) -> bool {
    match pipeline {
        Pipeline::Broadcast => matches!(kind, MessageKind::HealthCheck | MessageKind::RollCall),
        Pipeline::Direct => !matches!(kind, MessageKind::HealthCheck | MessageKind::RollCall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [MessageKind; 10] = [
        MessageKind::HealthCheck,
        MessageKind::RollCall,
        MessageKind::RollCallResponse,
        MessageKind::InstallFunction,
        MessageKind::InstallFunctionResponse,
        MessageKind::FormCluster,
        MessageKind::FormClusterResponse,
        MessageKind::DisbandCluster,
        MessageKind::WorkOrder,
        MessageKind::WorkOrderResponse,
    ];

    #[test]
    fn test_every_kind_has_exactly_one_legitimate_pipeline() {
        for kind in ALL_KINDS {
            assert_ne!(
                allowed_on(kind, Pipeline::Broadcast),
                allowed_on(kind, Pipeline::Direct),
                "kind {:?} must be allowed on exactly one pipeline",
                kind
            );
        }
    }

    #[test]
    fn test_responses_never_accepted_from_broadcast() {
        for kind in [
            MessageKind::RollCallResponse,
            MessageKind::FormClusterResponse,
            MessageKind::InstallFunctionResponse,
            MessageKind::WorkOrderResponse,
        ] {
            assert!(!allowed_on(kind, Pipeline::Broadcast));
            assert!(allowed_on(kind, Pipeline::Direct));
        }
    }

    #[test]
    fn test_solicitations_never_accepted_direct() {
        for kind in [MessageKind::HealthCheck, MessageKind::RollCall] {
            assert!(allowed_on(kind, Pipeline::Broadcast));
            assert!(!allowed_on(kind, Pipeline::Direct));
        }
    }
}
