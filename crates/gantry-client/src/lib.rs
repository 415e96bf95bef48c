// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend client decorator.
//!
//! `ClientDecorator` presents one capability surface regardless of the
//! plugin transport and enforces the cross-cutting guarantees: registry
//! existence check, decommission check before anything else, lazy start
//! (restart-on-use for exited backends), batch response back-filling, and
//! prompt cancellation for streaming calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gantry_core::traits::sender::{PacketSender, ResourceSender};
use gantry_core::types::{
    CallResourceRequest, CheckHealthRequest, CheckHealthResult, CollectMetricsRequest,
    CollectMetricsResult, DataResponse, Plugin, PublishStreamRequest, PublishStreamResponse,
    QueryDataRequest, QueryDataResponse, RunStreamRequest, SubscribeStreamRequest,
    SubscribeStreamResponse,
};
use gantry_core::{BackendClient, GantryError, ProcessManager, Registry};

/// Routes calls to the backend of the plugin named in each request.
pub struct ClientDecorator {
    registry: Arc<dyn Registry>,
    process: Arc<dyn ProcessManager>,
}

impl ClientDecorator {
    pub fn new(registry: Arc<dyn Registry>, process: Arc<dyn ProcessManager>) -> Self {
        Self { registry, process }
    }

    /// Resolve the target plugin and make sure its backend can serve.
    ///
    /// A decommissioned backend fails here without the process manager ever
    /// being invoked. Anything else gets a lazy start: a no-op for running
    /// backends, a fresh launch for exited or never-started ones.
    async fn resolve(&self, plugin_id: &str) -> Result<Arc<Plugin>, GantryError> {
        let plugin = self
            .registry
            .plugin(plugin_id)
            .await
            .ok_or_else(|| GantryError::not_found(plugin_id))?;

        if plugin.backend.is_decommissioned() {
            return Err(GantryError::unavailable(plugin_id, "decommissioned"));
        }

        self.process.start(plugin_id).await?;
        Ok(plugin)
    }
}

#[async_trait]
impl BackendClient for ClientDecorator {
    async fn query_data(
        &self,
        ctx: CancellationToken,
        req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        let ref_ids: Vec<String> = req.queries.iter().map(|q| q.ref_id.clone()).collect();

        let mut response = tokio::select! {
            _ = ctx.cancelled() => return Err(GantryError::Cancelled),
            res = plugin.backend.query_data(ctx.clone(), req) => res?,
        };

        // A partial backend reply still answers every query: back-fill an
        // error response for any ref ID the backend dropped.
        for ref_id in ref_ids {
            response
                .responses
                .entry(ref_id)
                .or_insert_with(|| DataResponse::error("no response from backend"));
        }
        Ok(response)
    }

    async fn call_resource(
        &self,
        ctx: CancellationToken,
        req: CallResourceRequest,
        sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        tokio::select! {
            _ = ctx.cancelled() => {
                debug!(plugin_id = %plugin.id(), "resource call cancelled");
                Err(GantryError::Cancelled)
            }
            res = plugin.backend.call_resource(ctx.clone(), req, sender) => res,
        }
    }

    async fn check_health(
        &self,
        ctx: CancellationToken,
        req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        plugin.backend.check_health(ctx, req).await
    }

    async fn collect_metrics(
        &self,
        ctx: CancellationToken,
        req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        plugin.backend.collect_metrics(ctx, req).await
    }

    async fn subscribe_stream(
        &self,
        ctx: CancellationToken,
        req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        plugin.backend.subscribe_stream(ctx, req).await
    }

    async fn publish_stream(
        &self,
        ctx: CancellationToken,
        req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        plugin.backend.publish_stream(ctx, req).await
    }

    async fn run_stream(
        &self,
        ctx: CancellationToken,
        req: RunStreamRequest,
        sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError> {
        let plugin = self.resolve(&req.context.plugin_id).await?;
        tokio::select! {
            _ = ctx.cancelled() => {
                debug!(plugin_id = %plugin.id(), "stream cancelled");
                Err(GantryError::Cancelled)
            }
            res = plugin.backend.run_stream(ctx.clone(), req, sender) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gantry_core::types::{DataQuery, PluginContext, StreamPacket};
    use gantry_core::BackendPlugin;
    use gantry_registry::InMemoryRegistry;
    use gantry_test_utils::{
        test_descriptor, CollectingPacketSender, CollectingResourceSender, FakeBackend,
        FakeProcessManager,
    };

    struct Fixture {
        client: ClientDecorator,
        process: Arc<FakeProcessManager>,
        backend: Arc<FakeBackend>,
    }

    async fn fixture(backend: FakeBackend) -> Fixture {
        let registry = Arc::new(InMemoryRegistry::new());
        let backend = Arc::new(backend);
        let id = backend.plugin_id().to_string();
        registry
            .add(Arc::new(Plugin {
                descriptor: test_descriptor(&id),
                backend: backend.clone(),
            }))
            .await
            .unwrap();
        let process = Arc::new(FakeProcessManager::new());
        Fixture {
            client: ClientDecorator::new(registry, process.clone()),
            process,
            backend,
        }
    }

    fn query_req(plugin_id: &str, ref_ids: &[&str]) -> QueryDataRequest {
        QueryDataRequest {
            context: PluginContext::new(plugin_id),
            queries: ref_ids
                .iter()
                .map(|r| DataQuery {
                    ref_id: r.to_string(),
                    query: serde_json::json!({}),
                    max_data_points: None,
                    interval_ms: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn unknown_plugin_fails_fast_without_starting_anything() {
        let f = fixture(FakeBackend::managed("loki")).await;
        let err = f
            .client
            .query_data(CancellationToken::new(), query_req("ghost", &["A"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::NotFound { .. }));
        assert_eq!(f.process.total_calls(), 0);
    }

    #[tokio::test]
    async fn decommissioned_plugin_is_unavailable_and_start_is_never_invoked() {
        let f = fixture(FakeBackend::managed("loki")).await;
        f.backend.decommission();

        let err = f
            .client
            .check_health(
                CancellationToken::new(),
                CheckHealthRequest {
                    context: PluginContext::new("loki"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::Unavailable { .. }));
        assert_eq!(f.process.start_count("loki"), 0);
    }

    #[tokio::test]
    async fn calls_lazily_start_the_backend() {
        let f = fixture(FakeBackend::managed("loki").with_query_data(|_req| {
            Ok(QueryDataResponse::default())
        }))
        .await;
        f.client
            .query_data(CancellationToken::new(), query_req("loki", &[]))
            .await
            .unwrap();
        assert_eq!(f.process.start_count("loki"), 1);
    }

    #[tokio::test]
    async fn start_failure_propagates_to_the_caller() {
        let f = fixture(FakeBackend::managed("loki")).await;
        f.process
            .fail_start
            .insert("loki".to_string(), "no binary".to_string());

        let err = f
            .client
            .query_data(CancellationToken::new(), query_req("loki", &["A"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::StartFailure { .. }));
    }

    #[tokio::test]
    async fn batch_partial_failure_returns_results_for_the_other_queries() {
        let f = fixture(FakeBackend::managed("loki").with_query_data(|req| {
            let mut resp = QueryDataResponse::default();
            for q in &req.queries {
                if q.ref_id == "B" {
                    resp.responses
                        .insert(q.ref_id.clone(), DataResponse::error("handler exploded"));
                } else {
                    resp.responses.insert(
                        q.ref_id.clone(),
                        DataResponse::ok(serde_json::json!({"rows": 3})),
                    );
                }
            }
            Ok(resp)
        }))
        .await;

        let resp = f
            .client
            .query_data(CancellationToken::new(), query_req("loki", &["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(resp.responses.len(), 3);
        assert!(resp.responses["A"].error.is_none());
        assert!(resp.responses["C"].error.is_none());
        assert_eq!(resp.responses["B"].error.as_deref(), Some("handler exploded"));
    }

    #[tokio::test]
    async fn dropped_ref_ids_are_back_filled_with_errors() {
        let f = fixture(FakeBackend::managed("loki").with_query_data(|req| {
            // Answer only the first query, drop the rest.
            let mut resp = QueryDataResponse::default();
            if let Some(q) = req.queries.first() {
                resp.responses
                    .insert(q.ref_id.clone(), DataResponse::ok(serde_json::json!(1)));
            }
            Ok(resp)
        }))
        .await;

        let resp = f
            .client
            .query_data(CancellationToken::new(), query_req("loki", &["A", "B"]))
            .await
            .unwrap();
        assert!(resp.responses["A"].error.is_none());
        assert_eq!(
            resp.responses["B"].error.as_deref(),
            Some("no response from backend")
        );
    }

    #[tokio::test]
    async fn method_not_implemented_passes_through() {
        let f = fixture(FakeBackend::managed("loki")).await;
        let err = f
            .client
            .collect_metrics(
                CancellationToken::new(),
                CollectMetricsRequest {
                    context: PluginContext::new("loki"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::MethodNotImplemented));
    }

    #[tokio::test]
    async fn resource_chunks_flow_through_the_sender() {
        let f = fixture(FakeBackend::managed("loki").with_call_resource(|_req| {
            Ok(vec![
                gantry_core::types::CallResourceResponse {
                    status: 200,
                    headers: Default::default(),
                    body: b"chunk-1".to_vec(),
                },
                gantry_core::types::CallResourceResponse {
                    status: 200,
                    headers: Default::default(),
                    body: b"chunk-2".to_vec(),
                },
            ])
        }))
        .await;

        let sender = Arc::new(CollectingResourceSender::new());
        f.client
            .call_resource(
                CancellationToken::new(),
                CallResourceRequest {
                    context: PluginContext::new("loki"),
                    path: "annotations".into(),
                    method: "GET".into(),
                    headers: Default::default(),
                    body: Vec::new(),
                },
                sender.clone(),
            )
            .await
            .unwrap();
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn cancelling_run_stream_stops_sending_and_returns_the_cause() {
        let f = fixture(FakeBackend::managed("loki").with_endless_stream()).await;
        let sender = Arc::new(CollectingPacketSender::new());
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });

        let err = f
            .client
            .run_stream(
                token,
                RunStreamRequest {
                    context: PluginContext::new("loki"),
                    path: "measurements".into(),
                    data: None,
                },
                sender.clone(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GantryError::Cancelled));

        // No further sends after the call returned.
        let count = sender.count();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sender.count(), count);
    }

    #[tokio::test]
    async fn finite_stream_completes_and_delivers_every_packet() {
        let packets = vec![
            StreamPacket {
                data: serde_json::json!({"v": 1}),
            },
            StreamPacket {
                data: serde_json::json!({"v": 2}),
            },
            StreamPacket {
                data: serde_json::json!({"v": 3}),
            },
        ];
        let f = fixture(FakeBackend::managed("loki").with_stream_packets(packets)).await;
        let sender = Arc::new(CollectingPacketSender::new());
        f.client
            .run_stream(
                CancellationToken::new(),
                RunStreamRequest {
                    context: PluginContext::new("loki"),
                    path: "measurements".into(),
                    data: None,
                },
                sender.clone(),
            )
            .await
            .unwrap();
        assert_eq!(sender.count(), 3);
    }
}
