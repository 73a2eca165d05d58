//! Append-only registration audit log. Appends are fire-and-forget: the
//! HTTP response never waits on the sink, and a sink failure is only
//! reported to the operator log.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{fs, io::AsyncWriteExt, task::JoinHandle};
use tracing::error;
use uuid::Uuid;

use crate::accounts::repo::User;

/// One registration event, serialized as a single JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationEntry {
    pub id: Uuid,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub email: String,
    pub timestamp: String,
    pub ip: Option<String>,
}

impl RegistrationEntry {
    pub fn new(user: &User, ip: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339)?,
            ip,
        })
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: RegistrationEntry) -> anyhow::Result<()>;
}

/// Sink writing one JSON object per line to a local file.
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append(&self, entry: RegistrationEntry) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await.context("create audit dir")?;
            }
        }
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context("open audit log")?;
        file.write_all(&line).await.context("append audit log")?;
        Ok(())
    }
}

/// Spawn the append and move on. Errors are swallowed after logging; the
/// caller gets the handle only so tests can await completion.
pub fn submit(sink: Arc<dyn AuditSink>, entry: RegistrationEntry) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.append(entry).await {
            error!(error = %e, "registration audit append failed");
        }
    })
}
