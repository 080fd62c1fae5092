use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::coach::CoachReply;

#[derive(Debug, Default, Clone, Serialize)]
pub struct MetricsData {
    pub category_usage: HashMap<String, u64>,
    pub source_usage: HashMap<String, u64>,
    pub total_replies: u64,
}

#[derive(Debug, Clone)]
pub struct MetricsManager {
    inner: Arc<RwLock<MetricsData>>,
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsData::default())),
        }
    }

    pub async fn record_reply(&self, reply: &CoachReply) {
        let mut data = self.inner.write().await;
        data.total_replies += 1;
        *data
            .source_usage
            .entry(reply.source.as_str().to_string())
            .or_insert(0) += 1;
        if let Some(category) = reply.category {
            *data.category_usage.entry(category.as_str().to_string()).or_insert(0) += 1;
        }
    }

    pub async fn get_metrics(&self) -> MetricsData {
        self.inner.read().await.clone()
    }
}
