//! Typesense HTTP client / Typesense 客户端

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use super::types::{ApiMessage, ImportResult, SearchResponse};
use crate::backend::BackendError;
use crate::search::schema::CollectionSchema;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

pub struct TypesenseClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl TypesenseClient {
    pub fn new(base_url: &str, api_key: &str, connect_timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, urlencoding::encode(collection))
    }

    /// Delete collection; 404 becomes `CollectionNotFound` / 删除集合
    pub async fn delete_collection(&self, collection: &str) -> Result<(), BackendError> {
        let resp = self
            .client
            .delete(self.collection_url(collection))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::CollectionNotFound(collection.to_string()));
        }
        check_status(resp).await?;
        Ok(())
    }

    /// Create collection / 创建集合
    pub async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), BackendError> {
        let resp = self
            .client
            .post(format!("{}/collections", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(schema)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Bulk import NDJSON with `action=create` / 批量导入
    pub async fn import(&self, collection: &str, body: String) -> Result<Vec<ImportResult>, BackendError> {
        let resp = self
            .client
            .post(format!("{}/documents/import", self.collection_url(collection)))
            .query(&[("action", "create")])
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;
        let text = check_status(resp).await?.text().await?;
        parse_import_response(&text)
    }

    /// Search documents / 搜索文档
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        query_by: &[&str],
        per_page: usize,
    ) -> Result<SearchResponse, BackendError> {
        let fields = query_by.join(",");
        let infix = vec!["always"; query_by.len()].join(",");
        let per_page = per_page.to_string();
        let resp = self
            .client
            .get(format!("{}/documents/search", self.collection_url(collection)))
            .query(&[
                ("q", query),
                ("query_by", fields.as_str()),
                ("infix", infix.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Ok(check_status(resp).await?.json::<SearchResponse>().await?)
    }
}

/// Map non-success responses to `BackendError::Status` / 检查响应状态
async fn check_status(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    Err(BackendError::Status {
        backend: "typesense",
        status: status.as_u16(),
        message,
    })
}

/// Parse the per-document import results / 解析导入结果
pub fn parse_import_response(text: &str) -> Result<Vec<ImportResult>, BackendError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<ImportResult>(line).map_err(BackendError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_response() {
        let text = "{\"success\":true}\n{\"success\":false,\"error\":\"A document with id x already exists.\",\"document\":\"{}\"}\n";
        let results = parse_import_response(text).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("A document with id x already exists."));
    }

    #[test]
    fn test_parse_import_response_rejects_garbage() {
        assert!(parse_import_response("not json").is_err());
        assert!(parse_import_response("").unwrap().is_empty());
    }

    #[test]
    fn test_collection_url_encodes_name() {
        let client = TypesenseClient::new("http://localhost:8108/", "xyz", Duration::from_secs(1)).unwrap();
        assert_eq!(client.collection_url("my concepts"), "http://localhost:8108/collections/my%20concepts");
    }
}
