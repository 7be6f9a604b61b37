use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{GatewayResult, TaskGateway};
use crate::error::{GatewayError, GatewayOp};
use crate::model::{HealthStatus, TaskDraft, TaskPatch, TaskRecord, TaskStats};

/// [`TaskGateway`] speaking JSON over HTTP to the task API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReorderRequest<'a> {
    todo_id: &'a str,
    target_id: &'a str,
}

impl HttpGateway {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:5000/api`.
    pub fn new(base_url: &str, timeout: Duration) -> GatewayResult<Self> {
        let base = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Client(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> GatewayResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "api request");
        Ok(self.client.request(method, url))
    }

    async fn send(&self, op: GatewayOp, request: RequestBuilder) -> GatewayResult<Vec<u8>> {
        let response = request.send().await.map_err(|err| transport(op, err))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|err| transport(op, err))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(server_error(op, status, &text));
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        op: GatewayOp,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let body = self.send(op, request).await?;
        serde_json::from_slice(&body).map_err(|err| GatewayError::Decode {
            op,
            reason: err.to_string(),
        })
    }

    async fn send_message(&self, op: GatewayOp, request: RequestBuilder) -> GatewayResult<String> {
        let body = self.send(op, request).await?;
        let message = serde_json::from_slice::<MessageBody>(&body)
            .unwrap_or_default()
            .message
            .unwrap_or_default();
        Ok(message)
    }
}

#[async_trait]
impl TaskGateway for HttpGateway {
    async fn list_tasks(&self) -> GatewayResult<Vec<TaskRecord>> {
        let request = self.request(Method::GET, &["todos"])?;
        self.send_json(GatewayOp::List, request).await
    }

    async fn create_task(&self, draft: &TaskDraft) -> GatewayResult<TaskRecord> {
        let request = self.request(Method::POST, &["todos"])?.json(draft);
        self.send_json(GatewayOp::Create, request).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> GatewayResult<TaskRecord> {
        let request = self.request(Method::PUT, &["todos", id])?.json(patch);
        self.send_json(GatewayOp::Update, request).await
    }

    async fn delete_task(&self, id: &str) -> GatewayResult<()> {
        let request = self.request(Method::DELETE, &["todos", id])?;
        self.send(GatewayOp::Delete, request).await.map(|_| ())
    }

    async fn fetch_stats(&self) -> GatewayResult<TaskStats> {
        let request = self.request(Method::GET, &["todos", "stats"])?;
        self.send_json(GatewayOp::Stats, request).await
    }

    async fn health(&self) -> GatewayResult<HealthStatus> {
        let request = self.request(Method::GET, &["health"])?;
        self.send_json(GatewayOp::Health, request).await
    }

    async fn reorder(&self, id: &str, target_id: &str) -> GatewayResult<String> {
        let body = ReorderRequest {
            todo_id: id,
            target_id,
        };
        let request = self.request(Method::PUT, &["todos", "order"])?.json(&body);
        self.send_message(GatewayOp::Reorder, request).await
    }

    async fn create_backup(&self) -> GatewayResult<String> {
        let request = self.request(Method::POST, &["todos", "backup"])?;
        self.send_message(GatewayOp::Backup, request).await
    }
}

fn parse_base_url(raw: &str) -> GatewayResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| GatewayError::InvalidUrl(raw.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn transport(op: GatewayOp, err: reqwest::Error) -> GatewayError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    GatewayError::Transport { op, reason }
}

fn server_error(op: GatewayOp, status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| op.fallback_message().to_string());
    GatewayError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(base, Duration::from_secs(1)).unwrap()
    }

    #[rstest]
    #[case("http://127.0.0.1:5000/api")]
    #[case("http://127.0.0.1:5000/api/")]
    fn endpoints_append_to_the_api_root(#[case] base: &str) {
        let url = gateway(base).endpoint(&["todos", "stats"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/todos/stats");
    }

    #[test]
    fn task_ids_are_percent_encoded() {
        let url = gateway("http://localhost/api")
            .endpoint(&["todos", "a b/c"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/todos/a%20b%2Fc");
    }

    #[rstest]
    #[case("not a url")]
    #[case("mailto:someone@example.com")]
    #[case("ftp://example.com/api")]
    fn rejects_unusable_base_urls(#[case] base: &str) {
        assert!(matches!(
            HttpGateway::new(base, Duration::from_secs(1)),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn server_error_prefers_the_body_message() {
        let err = server_error(
            GatewayOp::Update,
            StatusCode::NOT_FOUND,
            r#"{"error": "Todo not found"}"#,
        );
        assert_eq!(
            err,
            GatewayError::Server {
                status: 404,
                message: "Todo not found".into()
            }
        );
    }

    #[rstest]
    #[case("")]
    #[case("<html>Internal Server Error</html>")]
    #[case(r#"{"error": "  "}"#)]
    #[case(r#"{"message": "nope"}"#)]
    fn server_error_falls_back_per_operation(#[case] body: &str) {
        let err = server_error(GatewayOp::Create, StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(err.user_message(), "Could not create the task");
    }
}
