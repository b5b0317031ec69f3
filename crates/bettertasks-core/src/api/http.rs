use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{ApiResult, TaskApi};
use crate::error::ApiError;
use crate::model::{
    ListId, ListPatch, LoginRequest, NewList, NewTask, RegisterRequest, Task, TaskId, TaskList,
    TaskPatch, User, UserId,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("api base URL is empty");
        }

        let client = Client::builder()
            .user_agent(concat!("bettertasks/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed building HTTP client")?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn execute(
        &self,
        label: &'static str,
        request: RequestBuilder,
    ) -> ApiResult<reqwest::blocking::Response> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, label, "sending request");

        let resp = request
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .map_err(|source| {
                warn!(%request_id, label, error = %source, "request failed before a response");
                ApiError::Transport { label, source }
            })?;

        let status = resp.status();
        debug!(%request_id, label, status = status.as_u16(), "received response");
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().unwrap_or_default();
        let detail = error_detail(&body);
        warn!(
            %request_id,
            label,
            status = status.as_u16(),
            detail = ?detail,
            "request rejected by server"
        );
        Err(ApiError::Status {
            label,
            status: status.as_u16(),
            detail,
        })
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        label: &'static str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        self.execute(label, request)?
            .json::<T>()
            .map_err(|source| ApiError::Decode { label, source })
    }
}

impl TaskApi for HttpApi {
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    fn register(&self, payload: &RegisterRequest) -> ApiResult<User> {
        self.fetch(
            "register",
            self.client.post(self.url("/auth/register")).json(payload),
        )
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    fn login(&self, payload: &LoginRequest) -> ApiResult<User> {
        self.fetch(
            "login",
            self.client.post(self.url("/auth/login")).json(payload),
        )
    }

    #[instrument(skip(self))]
    fn get_user(&self, user_id: UserId) -> ApiResult<User> {
        self.fetch(
            "get user",
            self.client.get(self.url(&format!("/users/{user_id}"))),
        )
    }

    #[instrument(skip(self))]
    fn get_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>> {
        self.fetch(
            "get tasks",
            self.client
                .get(self.url(&format!("/tasks/?list_id={list_id}"))),
        )
    }

    #[instrument(skip(self, task), fields(list_id = task.list_id, priority = %task.priority))]
    fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        self.fetch(
            "create task",
            self.client.post(self.url("/tasks/")).json(task),
        )
    }

    #[instrument(skip(self, patch))]
    fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> ApiResult<Task> {
        self.fetch(
            "update task",
            self.client
                .patch(self.url(&format!("/tasks/{task_id}")))
                .json(patch),
        )
    }

    #[instrument(skip(self))]
    fn delete_task(&self, task_id: TaskId) -> ApiResult<()> {
        self.execute(
            "delete task",
            self.client.delete(self.url(&format!("/tasks/{task_id}"))),
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn finish_all_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>> {
        self.fetch(
            "finish all tasks",
            self.client
                .patch(self.url(&format!("/tasks/finish-all/{list_id}"))),
        )
    }

    #[instrument(skip(self))]
    fn get_lists(&self, owner_id: UserId) -> ApiResult<Vec<TaskList>> {
        self.fetch(
            "get lists",
            self.client
                .get(self.url(&format!("/lists/?owner_id={owner_id}"))),
        )
    }

    #[instrument(skip(self, list), fields(owner_id = list.owner_id))]
    fn create_list(&self, list: &NewList) -> ApiResult<TaskList> {
        self.fetch(
            "create list",
            self.client.post(self.url("/lists/")).json(list),
        )
    }

    #[instrument(skip(self, patch))]
    fn update_list(&self, list_id: ListId, patch: &ListPatch) -> ApiResult<TaskList> {
        self.fetch(
            "update list",
            self.client
                .patch(self.url(&format!("/lists/{list_id}")))
                .json(patch),
        )
    }

    #[instrument(skip(self))]
    fn delete_list(&self, list_id: ListId) -> ApiResult<()> {
        self.execute(
            "delete list",
            self.client.delete(self.url(&format!("/lists/{list_id}"))),
        )?;
        Ok(())
    }
}

/// Pulls the human-readable `detail` out of an error body. The backend sends
/// either `{"detail": "..."}` or, for rejected payloads, a list of
/// `{"msg": "..."}` objects.
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.trim().to_string()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
