//! Negotiated sub-API sessions.

use std::sync::Arc;

use serde_json::Value;

use graphenerpc_core::capability::Capability;
use graphenerpc_core::error::RpcError;
use graphenerpc_core::request::NEGOTIATION_API_ID;
use graphenerpc_core::transport::NodeTransport;

/// One negotiated sub-API riding on a shared transport.
///
/// A session only exists after its negotiation succeeded, so its api-id is
/// always valid; there is no way to call through an un-negotiated session.
pub struct ApiSession {
    capability: Capability,
    transport: Arc<dyn NodeTransport>,
    api_id: u64,
}

impl ApiSession {
    /// Negotiate `capability` over `transport`.
    ///
    /// Issues the reserved triple `[1, api_name, []]`; the node answers with
    /// the numeric session api-id for all further calls to this sub-API.
    /// Transport and node errors propagate unchanged.
    pub async fn negotiate(
        capability: Capability,
        transport: Arc<dyn NodeTransport>,
    ) -> Result<Self, RpcError> {
        let value = transport
            .call(NEGOTIATION_API_ID, capability.wire_name(), Vec::new())
            .await?;
        let api_id: u64 = serde_json::from_value(value)?;
        tracing::debug!(api = %capability, api_id, "sub-api negotiated");
        Ok(Self {
            capability,
            transport,
            api_id,
        })
    }

    /// Issue `method` on this sub-API; result and node errors pass through
    /// untouched. A node error rejects only this call.
    pub async fn exec(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.transport.call(self.api_id, method, params).await
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// The node-side name of this sub-API.
    pub fn name(&self) -> &'static str {
        self.capability.wire_name()
    }

    /// The session-scoped api-id obtained at negotiation.
    pub fn api_id(&self) -> u64 {
        self.api_id
    }
}

impl std::fmt::Debug for ApiSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSession")
            .field("capability", &self.capability)
            .field("api_id", &self.api_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use graphenerpc_core::transport::TransportState;
    use serde_json::json;

    struct FixedIdTransport;

    #[async_trait]
    impl NodeTransport for FixedIdTransport {
        async fn call(
            &self,
            api_id: u64,
            method: &str,
            params: Vec<Value>,
        ) -> Result<Value, RpcError> {
            if api_id == NEGOTIATION_API_ID {
                assert!(params.is_empty());
                return Ok(json!(7));
            }
            Ok(json!([api_id, method, params]))
        }

        async fn close(&self) {}

        fn state(&self) -> TransportState {
            TransportState::Open
        }

        fn url(&self) -> &str {
            "ws://fixed"
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl NodeTransport for RefusingTransport {
        async fn call(&self, _: u64, _: &str, _: Vec<Value>) -> Result<Value, RpcError> {
            Err(RpcError::Protocol(json!({"message": "no such api"})))
        }

        async fn close(&self) {}

        fn state(&self) -> TransportState {
            TransportState::Open
        }

        fn url(&self) -> &str {
            "ws://refusing"
        }
    }

    #[tokio::test]
    async fn negotiate_records_api_id_and_routes_exec() {
        let session = ApiSession::negotiate(Capability::History, Arc::new(FixedIdTransport))
            .await
            .unwrap();
        assert_eq!(session.api_id(), 7);
        assert_eq!(session.name(), "history");

        let echoed = session.exec("get_account_history", vec![json!("1.2.0")]).await.unwrap();
        assert_eq!(echoed, json!([7, "get_account_history", ["1.2.0"]]));
    }

    #[tokio::test]
    async fn negotiate_propagates_node_refusal() {
        let err = ApiSession::negotiate(Capability::Crypto, Arc::new(RefusingTransport))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[tokio::test]
    async fn non_integer_negotiation_result_is_rejected() {
        struct StringIdTransport;

        #[async_trait]
        impl NodeTransport for StringIdTransport {
            async fn call(&self, _: u64, _: &str, _: Vec<Value>) -> Result<Value, RpcError> {
                Ok(json!("not-a-number"))
            }

            async fn close(&self) {}

            fn state(&self) -> TransportState {
                TransportState::Open
            }

            fn url(&self) -> &str {
                "ws://bad"
            }
        }

        let err = ApiSession::negotiate(Capability::Orders, Arc::new(StringIdTransport))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Deserialization(_)));
    }
}
