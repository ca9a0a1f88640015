//! Live data gateway over the academy REST API.
//!
//! Every read goes through [`Gateway::fetch_with_cache`], a read-through
//! cache keyed by path and request options whose entries expire after
//! `gateway.cache_ttl_secs`. Endpoints are organised in fixed
//! [`DataGroup`]s; a group's fetches run in order, while several groups
//! requested together run concurrently and fail independently.
//!
//! Writes to the backing API never invalidate the cache. A read may be up to
//! one TTL stale; [`Gateway::clear_cache`] is the only invalidation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::GatewayConfig;

pub const STUDENTS_PATH: &str = "/api/students";
pub const FINANCIAL_PLANS_PATH: &str = "/api/financial/plans";
pub const FINANCIAL_SUMMARY_PATH: &str = "/api/financial/summary";
pub const COURSES_PATH: &str = "/api/courses";
pub const ANALYTICS_DASHBOARD_PATH: &str = "/api/analytics/dashboard";
pub const TECHNIQUES_PATH: &str = "/api/techniques";

/// Endpoints probed by [`Gateway::health_check`].
pub const HEALTH_ENDPOINTS: &[&str] = &[STUDENTS_PATH, COURSES_PATH, FINANCIAL_PLANS_PATH];

const RECENT_REGISTRATION_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{path} reported failure: {message}")]
    Unsuccessful { path: String, message: String },
}

/// A fixed group of related endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataGroup {
    Students,
    Financial,
    Courses,
    Analytics,
    Techniques,
}

impl DataGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataGroup::Students => "students",
            DataGroup::Financial => "financial",
            DataGroup::Courses => "courses",
            DataGroup::Analytics => "analytics",
            DataGroup::Techniques => "techniques",
        }
    }
}

impl fmt::Display for DataGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra request options; part of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
}

/// Caller context forwarded to every group fetch.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Headers added to every request, e.g. an authorization token.
    pub headers: BTreeMap<String, String>,
}

impl QueryContext {
    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            headers: self.headers.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub adult: usize,
    pub teen: usize,
    pub child: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentsSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub categories: CategoryCounts,
    pub recent_registrations: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub beginner: usize,
    pub intermediate: usize,
    pub advanced: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoursesSummary {
    pub total: usize,
    pub active: usize,
    pub levels: LevelCounts,
}

/// The data retrieved for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "group", rename_all = "lowercase")]
pub enum GroupData {
    Students {
        list: Vec<Value>,
        summary: StudentsSummary,
    },
    Financial {
        plans: Vec<Value>,
        summary: Value,
    },
    Courses {
        list: Vec<Value>,
        summary: CoursesSummary,
    },
    Analytics {
        dashboard: Value,
    },
    Techniques {
        list: Vec<Value>,
    },
}

/// Result slot of one group fetch. A failure never affects other slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOutcome {
    Ready(GroupData),
    Failed { error: String },
}

impl GroupOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, GroupOutcome::Ready(_))
    }

    pub fn data(&self) -> Option<&GroupData> {
        match self {
            GroupOutcome::Ready(data) => Some(data),
            GroupOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            GroupOutcome::Ready(_) => None,
            GroupOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHealth {
    pub endpoint: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: String,
    pub endpoints: Vec<EndpointHealth>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.endpoints
            .iter()
            .all(|e| e.status == HealthStatus::Healthy)
    }
}

struct CacheEntry {
    data: Value,
    fetched_at: Instant,
}

pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ttl: config.cache_ttl(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Override the configured cache lifetime.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` as JSON, served from the cache while the entry is fresh.
    pub async fn fetch_with_cache(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Value, GatewayError> {
        let key = cache_key(path, options);

        if let Some(data) = self.cached(&key) {
            tracing::debug!(path, "cache hit");
            return Ok(data);
        }

        tracing::debug!(path, "fetching");
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        let data: Value = response.json().await?;

        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                key,
                CacheEntry {
                    data: data.clone(),
                    fetched_at: Instant::now(),
                },
            );

        Ok(data)
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Empty the cache.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        tracing::info!("API cache cleared");
    }

    /// Number of cached entries, including expired ones not yet replaced.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Fetch one group's endpoints in order and derive its summary.
    pub async fn fetch_group(&self, group: DataGroup, ctx: &QueryContext) -> GroupOutcome {
        match self.try_fetch_group(group, ctx).await {
            Ok(data) => GroupOutcome::Ready(data),
            Err(e) => {
                tracing::warn!(%group, "failed to fetch group: {}", e);
                GroupOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_fetch_group(
        &self,
        group: DataGroup,
        ctx: &QueryContext,
    ) -> Result<GroupData, GatewayError> {
        let options = ctx.request_options();
        let data = match group {
            DataGroup::Students => {
                let list = self.fetch_list(STUDENTS_PATH, &options).await?;
                let summary = students_summary(&list, Utc::now());
                GroupData::Students { list, summary }
            }
            DataGroup::Financial => {
                let plans = self.fetch_list(FINANCIAL_PLANS_PATH, &options).await?;
                let summary = self.fetch_data(FINANCIAL_SUMMARY_PATH, &options).await?;
                GroupData::Financial { plans, summary }
            }
            DataGroup::Courses => {
                let list = self.fetch_list(COURSES_PATH, &options).await?;
                let summary = courses_summary(&list);
                GroupData::Courses { list, summary }
            }
            DataGroup::Analytics => GroupData::Analytics {
                dashboard: self.fetch_data(ANALYTICS_DASHBOARD_PATH, &options).await?,
            },
            DataGroup::Techniques => GroupData::Techniques {
                list: self.fetch_list(TECHNIQUES_PATH, &options).await?,
            },
        };
        Ok(data)
    }

    async fn fetch_data(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Value, GatewayError> {
        let body = self.fetch_with_cache(path, options).await?;
        unwrap_envelope(path, body)
    }

    async fn fetch_list(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GatewayError> {
        match self.fetch_data(path, options).await? {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    /// Fetch several groups concurrently; slots come back in request order.
    pub async fn fetch_groups(
        &self,
        groups: &[DataGroup],
        ctx: &QueryContext,
    ) -> Vec<(DataGroup, GroupOutcome)> {
        let fetches = groups.iter().map(|&group| async move {
            let outcome = self.fetch_group(group, ctx).await;
            (group, outcome)
        });
        futures::future::join_all(fetches).await
    }

    /// Probe the core endpoints directly, bypassing the cache.
    pub async fn health_check(&self) -> HealthReport {
        let mut endpoints = Vec::with_capacity(HEALTH_ENDPOINTS.len());
        for endpoint in HEALTH_ENDPOINTS {
            let started = Instant::now();
            let result = self
                .client
                .get(format!("{}{}", self.base_url, endpoint))
                .send()
                .await;
            let response_time_ms = started.elapsed().as_millis() as u64;

            let (status, error) = match result {
                Ok(response) if response.status().is_success() => (HealthStatus::Healthy, None),
                Ok(response) => (
                    HealthStatus::Error,
                    Some(format!("HTTP {}", response.status().as_u16())),
                ),
                Err(e) => (HealthStatus::Error, Some(e.to_string())),
            };
            endpoints.push(EndpointHealth {
                endpoint: endpoint.to_string(),
                status,
                response_time_ms,
                error,
            });
        }

        HealthReport {
            timestamp: Utc::now().to_rfc3339(),
            endpoints,
        }
    }
}

fn cache_key(path: &str, options: &RequestOptions) -> String {
    let serialized = serde_json::to_string(options).unwrap_or_default();
    format!("{}_{}", path, serialized)
}

/// Unwrap a `{ success, data }` envelope. `success: false` is a failure;
/// a body without `data` is returned whole.
fn unwrap_envelope(path: &str, body: Value) -> Result<Value, GatewayError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("success: false")
            .to_string();
        return Err(GatewayError::Unsuccessful {
            path: path.to_string(),
            message,
        });
    }
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn field_is(item: &Value, field: &str, expected: &str) -> bool {
    item.get(field).and_then(Value::as_str) == Some(expected)
}

fn truthy(item: &Value, field: &str) -> bool {
    match item.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

pub fn students_summary(students: &[Value], now: DateTime<Utc>) -> StudentsSummary {
    let cutoff = now - chrono::Duration::days(RECENT_REGISTRATION_DAYS);
    let active = students.iter().filter(|s| truthy(s, "isActive")).count();
    let count_category = |category: &str| {
        students
            .iter()
            .filter(|s| field_is(s, "category", category))
            .count()
    };

    StudentsSummary {
        total: students.len(),
        active,
        inactive: students.len() - active,
        categories: CategoryCounts {
            adult: count_category("ADULT"),
            teen: count_category("TEEN"),
            child: count_category("CHILD"),
        },
        recent_registrations: students
            .iter()
            .filter_map(|s| s.get("createdAt").and_then(Value::as_str))
            .filter_map(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .filter(|created| created.with_timezone(&Utc) > cutoff)
            .count(),
    }
}

pub fn courses_summary(courses: &[Value]) -> CoursesSummary {
    let count_level = |level: &str| {
        courses
            .iter()
            .filter(|c| field_is(c, "category", level))
            .count()
    };

    CoursesSummary {
        total: courses.len(),
        active: courses.iter().filter(|c| truthy(c, "active")).count(),
        levels: LevelCounts {
            beginner: count_level("BEGINNER"),
            intermediate: count_level("INTERMEDIATE"),
            advanced: count_level("ADVANCED"),
        },
    }
}
