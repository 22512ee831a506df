use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Package, PackageId, Role},
    error::GatewayError,
    protocol::{
        ApiEnvelope, CancelRequest, NutritionExtractRequest, NutritionFacts, PageRequest,
        RoleResponse, SearchResponse,
    },
};
use tracing::debug;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Resolves the current authenticated session. Owned by an external
/// collaborator; the gateway only asks it for bearer tokens.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn bearer_token(&self) -> GatewayResult<String>;
}

/// Session provider backed by a fixed token, for tools and tests.
pub struct StaticSession {
    token: String,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn bearer_token(&self) -> GatewayResult<String> {
        Ok(self.token.clone())
    }
}

pub struct MissingSession;

#[async_trait]
impl SessionProvider for MissingSession {
    async fn bearer_token(&self) -> GatewayResult<String> {
        Err(GatewayError::Transport("no active session".into()))
    }
}

/// Typed wrapper over the package backend. Every call attaches the current
/// bearer token and normalizes the response envelope; no local state is
/// mutated — callers own state updates based on the result.
#[async_trait]
pub trait PackageGateway: Send + Sync {
    async fn search(
        &self,
        filters: &BTreeMap<String, String>,
        page: &PageRequest,
    ) -> GatewayResult<SearchResponse>;
    async fn retrieve(&self, id: &PackageId) -> GatewayResult<Package>;
    async fn pack(&self, id: &PackageId) -> GatewayResult<()>;
    async fn deliver(&self, id: &PackageId) -> GatewayResult<()>;
    async fn cancel(&self, id: &PackageId, reason: &str) -> GatewayResult<()>;
    async fn extract_nutrition(&self, image: &[u8]) -> GatewayResult<NutritionFacts>;
    async fn user_role(&self) -> GatewayResult<Role>;
}

pub struct HttpPackageGateway {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpPackageGateway {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            session,
        }
    }

    async fn authorized(&self, method: Method, path: &str) -> GatewayResult<RequestBuilder> {
        let token = self.session.bearer_token().await?;
        Ok(self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token))
    }
}

async fn send(request: RequestBuilder) -> GatewayResult<Response> {
    request.send().await.map_err(GatewayError::transport)
}

/// Envelope decoding, per the backend convention:
/// model present => success; non-2xx with errors and no model => structured
/// rejection; anything else => opaque failure.
async fn decode_model<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let ok = response.status().is_success();
    let envelope: ApiEnvelope<T> = response.json().await.map_err(GatewayError::transport)?;
    match (envelope.model, envelope.errors) {
        (Some(model), _) => Ok(model),
        (None, Some(messages)) if !ok && !messages.is_empty() => {
            Err(GatewayError::Rejected { messages })
        }
        _ => Err(GatewayError::Opaque),
    }
}

/// Commands carry their acknowledgement in `model` too; a 2xx with a null
/// model still counts as the opaque failure branch.
async fn decode_ack(response: Response) -> GatewayResult<()> {
    decode_model::<serde_json::Value>(response).await.map(|_| ())
}

#[async_trait]
impl PackageGateway for HttpPackageGateway {
    async fn search(
        &self,
        filters: &BTreeMap<String, String>,
        page: &PageRequest,
    ) -> GatewayResult<SearchResponse> {
        debug!(
            page_no = page.page_no,
            page_size = page.page_size,
            filter_count = filters.len(),
            "package search"
        );
        let request = self
            .authorized(Method::GET, "/package/search")
            .await?
            .query(page)
            .query(filters);
        decode_model(send(request).await?).await
    }

    async fn retrieve(&self, id: &PackageId) -> GatewayResult<Package> {
        let request = self
            .authorized(Method::GET, &format!("/package/{id}"))
            .await?;
        decode_model(send(request).await?).await
    }

    async fn pack(&self, id: &PackageId) -> GatewayResult<()> {
        let request = self
            .authorized(Method::PATCH, &format!("/package/{id}/pack"))
            .await?;
        decode_ack(send(request).await?).await
    }

    async fn deliver(&self, id: &PackageId) -> GatewayResult<()> {
        let request = self
            .authorized(Method::PATCH, &format!("/package/{id}/deliver"))
            .await?;
        decode_ack(send(request).await?).await
    }

    async fn cancel(&self, id: &PackageId, reason: &str) -> GatewayResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(GatewayError::Precondition("cancel reason is required".into()));
        }
        let request = self
            .authorized(Method::PATCH, &format!("/package/{id}/cancel"))
            .await?
            .json(&CancelRequest {
                cancel_reason: reason.to_string(),
            });
        decode_ack(send(request).await?).await
    }

    async fn extract_nutrition(&self, image: &[u8]) -> GatewayResult<NutritionFacts> {
        let request = self
            .authorized(Method::POST, "/nutrition/extract")
            .await?
            .json(&NutritionExtractRequest {
                image_b64: STANDARD.encode(image),
            });
        decode_model(send(request).await?).await
    }

    async fn user_role(&self) -> GatewayResult<Role> {
        let request = self.authorized(Method::GET, "/session/role").await?;
        decode_model::<RoleResponse>(send(request).await?)
            .await
            .map(|response| response.role)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
