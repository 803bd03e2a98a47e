// crates/server/src/tracker/token.rs
//! Bearer tokens for the tracker, sourced from the `az` CLI and cached
//! until shortly before expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

use super::TrackerError;

/// Azure DevOps OAuth resource id understood by
/// `az account get-access-token`.
const ADO_RESOURCE: &str = "499b84ac-1321-427f-aa17-267ca6975798";

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, TrackerError>;
}

/// Token cache over the `az` CLI. Refreshes five minutes before the
/// reported expiry; the lock serializes concurrent refreshes.
#[derive(Default)]
pub struct AzCliTokenSource {
    cache: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AzCliTokenSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenSource for AzCliTokenSource {
    async fn token(&self) -> Result<String, TrackerError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Utc::now() < cached.expires_at - Duration::minutes(5) {
                return Ok(cached.token.clone());
            }
        }

        tracing::info!("refreshing tracker token via az CLI");
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                ADO_RESOURCE,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| TrackerError::Auth(format!("failed to run az CLI: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TrackerError::Auth(format!(
                "az account get-access-token failed ({}). Run 'az login' to authenticate. {}",
                output.status,
                stderr.trim()
            )));
        }

        let doc: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| TrackerError::Auth(format!("unparseable az CLI response: {e}")))?;
        let token = doc
            .get("accessToken")
            .and_then(Value::as_str)
            .ok_or_else(|| TrackerError::Auth("accessToken missing in az CLI response".into()))?
            .to_string();
        let expires_at = doc
            .get("expiresOn")
            .and_then(Value::as_str)
            .and_then(parse_expires_on)
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        tracing::info!(%expires_at, "tracker token refreshed");
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }
}

/// `az` reports expiry as a local time like `2026-02-15 18:30:00.000000`.
fn parse_expires_on(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
