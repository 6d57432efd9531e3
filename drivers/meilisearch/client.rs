//! Meilisearch HTTP client / Meilisearch 客户端
//!
//! Every write returns a task; callers await it with [`MeiliClient::wait_for_task`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tokio::time::{sleep, Instant};

use super::types::{ApiError, CreateIndex, SearchBody, SearchResponse, Task, TaskInfo, TaskStatus};
use crate::backend::BackendError;

pub struct MeiliClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    task_timeout: Duration,
    poll_interval: Duration,
}

impl MeiliClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        connect_timeout: Duration,
        task_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            task_timeout,
            poll_interval,
        })
    }

    fn index_url(&self, index: &str) -> String {
        format!("{}/indexes/{}", self.base_url, urlencoding::encode(index))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn enqueue(&self, request: RequestBuilder) -> Result<TaskInfo, BackendError> {
        let resp = self.authorize(request).send().await?;
        Ok(check_status(resp).await?.json::<TaskInfo>().await?)
    }

    /// Delete index and await the task / 删除索引
    pub async fn delete_index(&self, index: &str) -> Result<(), BackendError> {
        let resp = self
            .authorize(self.client.delete(self.index_url(index)))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::CollectionNotFound(index.to_string()));
        }
        let info = check_status(resp).await?.json::<TaskInfo>().await?;

        match self.wait_for_task(info.task_uid).await {
            Err(BackendError::TaskFailed { code, .. }) if code == "index_not_found" => {
                Err(BackendError::CollectionNotFound(index.to_string()))
            }
            other => other.map(|_| ()),
        }
    }

    /// Create index with primary key `id` / 创建索引
    pub async fn create_index(&self, index: &str) -> Result<Task, BackendError> {
        let body = CreateIndex {
            uid: index,
            primary_key: "id",
        };
        let info = self
            .enqueue(self.client.post(format!("{}/indexes", self.base_url)).json(&body))
            .await?;
        self.wait_for_task(info.task_uid).await
    }

    pub async fn set_searchable_attributes(&self, index: &str, attributes: &[&str]) -> Result<Task, BackendError> {
        let url = format!("{}/settings/searchable-attributes", self.index_url(index));
        let info = self.enqueue(self.client.put(url).json(attributes)).await?;
        self.wait_for_task(info.task_uid).await
    }

    /// Add documents (JSON array) and await indexing / 添加文档
    pub async fn add_documents<T: Serialize + Sync>(&self, index: &str, documents: &[T]) -> Result<Task, BackendError> {
        let url = format!("{}/documents", self.index_url(index));
        let info = self.enqueue(self.client.post(url).json(documents)).await?;
        self.wait_for_task(info.task_uid).await
    }

    pub async fn search(&self, index: &str, query: &str, limit: usize) -> Result<SearchResponse, BackendError> {
        let body = SearchBody { q: query, limit };
        let resp = self
            .authorize(self.client.post(format!("{}/search", self.index_url(index))).json(&body))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::CollectionNotFound(index.to_string()));
        }
        Ok(check_status(resp).await?.json::<SearchResponse>().await?)
    }

    async fn get_task(&self, uid: u64) -> Result<Task, BackendError> {
        let resp = self
            .authorize(self.client.get(format!("{}/tasks/{}", self.base_url, uid)))
            .send()
            .await?;
        Ok(check_status(resp).await?.json::<Task>().await?)
    }

    /// Poll until the task finishes or the wait times out / 轮询等待任务完成
    pub async fn wait_for_task(&self, uid: u64) -> Result<Task, BackendError> {
        let deadline = Instant::now() + self.task_timeout;
        loop {
            let task = self.get_task(uid).await?;
            if task.is_finished() {
                return task_outcome(task);
            }
            if Instant::now() >= deadline {
                return Err(BackendError::TaskTimeout(uid));
            }
            tracing::debug!("Task {} is {:?}, waiting", uid, task.status);
            sleep(self.poll_interval).await;
        }
    }
}

/// Succeeded tasks pass through, anything else is an error / 任务结果
pub fn task_outcome(task: Task) -> Result<Task, BackendError> {
    match task.status {
        TaskStatus::Succeeded => Ok(task),
        _ => {
            let (code, message) = match &task.error {
                Some(e) => (e.code.clone(), e.message.clone()),
                None => ("canceled".to_string(), format!("task ended as {:?}", task.status)),
            };
            Err(BackendError::TaskFailed {
                uid: task.uid,
                code,
                message,
            })
        }
    }
}

async fn check_status(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&body) {
        Ok(err) if !err.code.is_empty() => format!("{} ({})", err.message, err.code),
        Ok(err) => err.message,
        Err(_) => body,
    };
    Err(BackendError::Status {
        backend: "meilisearch",
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(value: serde_json::Value) -> Task {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_task_outcome() {
        let done = task(json!({ "uid": 3, "status": "succeeded", "details": { "receivedDocuments": 2, "indexedDocuments": 2 } }));
        assert!(done.is_finished());
        let done = task_outcome(done).unwrap();
        assert_eq!(done.details.unwrap().indexed_documents, Some(2));

        let failed = task(json!({
            "uid": 4,
            "status": "failed",
            "error": { "message": "Index `concepts` not found.", "code": "index_not_found", "type": "invalid_request", "link": "" }
        }));
        match task_outcome(failed) {
            Err(BackendError::TaskFailed { uid, code, .. }) => {
                assert_eq!(uid, 4);
                assert_eq!(code, "index_not_found");
            }
            other => panic!("unexpected {:?}", other.map(|t| t.uid)),
        }

        let pending = task(json!({ "uid": 5, "status": "processing" }));
        assert!(!pending.is_finished());
    }

    #[test]
    fn test_index_url() {
        let client = MeiliClient::new(
            "http://localhost:7700/",
            None,
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .unwrap();
        assert_eq!(client.index_url("concepts"), "http://localhost:7700/indexes/concepts");
    }
}
