//! Record source - file, URL or stdin as a stream of JSON records / 记录来源
//!
//! Formats / 格式：
//! - NDJSON: one record per non-blank line (default) / 每行一条记录
//! - JSON: whole document; a top-level array yields its elements / 整个文档

use std::path::PathBuf;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_util::io::StreamReader;
use url::Url;

/// Stream of raw records / 原始记录流
pub type RecordStream = BoxStream<'static, Result<Value, SourceError>>;

type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON on line {line}: {source}")]
    Line {
        line: usize,
        source: serde_json::Error,
    },
    #[error("invalid JSON document: {0}")]
    Document(#[source] serde_json::Error),
}

/// Record format / 记录格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Ndjson,
    Json,
}

impl SourceFormat {
    /// Guess format from a path or URL path / 根据扩展名判断格式
    pub fn from_path(path: &str) -> Self {
        if path.to_lowercase().ends_with(".json") {
            SourceFormat::Json
        } else {
            SourceFormat::Ndjson
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_lowercase();
        if content_type.contains("ndjson") || content_type.contains("jsonl") {
            Some(SourceFormat::Ndjson)
        } else if content_type.starts_with("application/json") {
            Some(SourceFormat::Json)
        } else {
            None
        }
    }
}

/// Where records come from / 记录位置
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLocation {
    Stdin,
    Url(Url),
    File(PathBuf),
}

impl SourceLocation {
    pub fn parse(source: &str) -> Self {
        if source == "-" {
            return SourceLocation::Stdin;
        }
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => SourceLocation::Url(url),
            _ => SourceLocation::File(PathBuf::from(source)),
        }
    }
}

/// Open a record stream / 打开记录流
pub async fn open(source: &str) -> Result<RecordStream, SourceError> {
    let (reader, format) = match SourceLocation::parse(source) {
        SourceLocation::Stdin => {
            let stdin: BoxReader = Box::new(tokio::io::stdin());
            (stdin, SourceFormat::Ndjson)
        }
        SourceLocation::File(path) => {
            let file = tokio::fs::File::open(&path).await.map_err(|e| SourceError::Open {
                path: path.display().to_string(),
                source: e,
            })?;
            let file: BoxReader = Box::new(file);
            (file, SourceFormat::from_path(source))
        }
        SourceLocation::Url(url) => fetch(url).await?,
    };

    tracing::debug!("Reading {} as {:?}", source, format);
    Ok(from_reader(reader, format))
}

async fn fetch(url: Url) -> Result<(BoxReader, SourceFormat), SourceError> {
    let url_str = url.to_string();
    let response = reqwest::get(url.clone()).await.map_err(|e| SourceError::Fetch {
        url: url_str.clone(),
        source: e,
    })?;
    if !response.status().is_success() {
        return Err(SourceError::Status {
            url: url_str,
            status: response.status().as_u16(),
        });
    }

    let format = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(SourceFormat::from_content_type)
        .unwrap_or_else(|| SourceFormat::from_path(url.path()));

    // Stream the body instead of loading it / 流式读取响应体
    let stream = Box::pin(
        response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
    );
    let reader: BoxReader = Box::new(StreamReader::new(stream));
    Ok((reader, format))
}

/// Turn any reader into a record stream / 将读取器转换为记录流
pub fn from_reader(reader: BoxReader, format: SourceFormat) -> RecordStream {
    match format {
        SourceFormat::Ndjson => {
            let lines = LinesStream::new(BufReader::new(reader).lines());
            lines
                .enumerate()
                .filter_map(|(index, line)| async move {
                    match line {
                        Err(e) => Some(Err(SourceError::Io(e))),
                        Ok(line) if line.trim().is_empty() => None,
                        Ok(line) => Some(serde_json::from_str::<Value>(&line).map_err(|e| SourceError::Line {
                            line: index + 1,
                            source: e,
                        })),
                    }
                })
                .boxed()
        }
        SourceFormat::Json => stream::once(read_document(reader))
            .flat_map(|result| match result {
                Ok(records) => stream::iter(records.into_iter().map(Ok)).boxed(),
                Err(e) => stream::iter(vec![Err(e)]).boxed(),
            })
            .boxed(),
    }
}

async fn read_document(mut reader: BoxReader) -> Result<Vec<Value>, SourceError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    match serde_json::from_slice::<Value>(&buf).map_err(SourceError::Document)? {
        Value::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}
