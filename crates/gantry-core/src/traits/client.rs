// SPDX-FileCopyrightText: 2026 Gantry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend client seam: the uniform capability surface invoked against some
//! running plugin backend, regardless of transport.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::GantryError;
use crate::traits::sender::{PacketSender, ResourceSender};
use crate::types::{
    CallResourceRequest, CheckHealthRequest, CheckHealthResult, CollectMetricsRequest,
    CollectMetricsResult, PublishStreamRequest, PublishStreamResponse, QueryDataRequest,
    QueryDataResponse, RunStreamRequest, SubscribeStreamRequest, SubscribeStreamResponse,
};

/// Routes data-plane calls to the backend of the plugin named in each
/// request's context, enforcing cross-cutting guarantees (existence check,
/// decommission check, lazy start, error normalization).
#[async_trait]
pub trait BackendClient: Send + Sync + 'static {
    async fn query_data(
        &self,
        ctx: CancellationToken,
        req: QueryDataRequest,
    ) -> Result<QueryDataResponse, GantryError>;

    async fn call_resource(
        &self,
        ctx: CancellationToken,
        req: CallResourceRequest,
        sender: Arc<dyn ResourceSender>,
    ) -> Result<(), GantryError>;

    async fn check_health(
        &self,
        ctx: CancellationToken,
        req: CheckHealthRequest,
    ) -> Result<CheckHealthResult, GantryError>;

    async fn collect_metrics(
        &self,
        ctx: CancellationToken,
        req: CollectMetricsRequest,
    ) -> Result<CollectMetricsResult, GantryError>;

    async fn subscribe_stream(
        &self,
        ctx: CancellationToken,
        req: SubscribeStreamRequest,
    ) -> Result<SubscribeStreamResponse, GantryError>;

    async fn publish_stream(
        &self,
        ctx: CancellationToken,
        req: PublishStreamRequest,
    ) -> Result<PublishStreamResponse, GantryError>;

    async fn run_stream(
        &self,
        ctx: CancellationToken,
        req: RunStreamRequest,
        sender: Arc<dyn PacketSender>,
    ) -> Result<(), GantryError>;
}
