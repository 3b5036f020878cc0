//! Several tool providers merged into one catalog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use flightdeck_core::error::ToolError;
use flightdeck_core::tool::{ToolArgs, ToolProvider, ToolSpec};
use serde_json::Value;
use tracing::warn;

/// Routes each tool name to the first provider that listed it.
///
/// The catalog is fixed when the provider is built.
pub struct MultiProvider {
    providers: Vec<Arc<dyn ToolProvider>>,
    specs: Vec<ToolSpec>,
    routes: HashMap<String, usize>,
}

impl MultiProvider {
    /// List every provider once. A provider whose listing fails is dropped.
    pub async fn build(providers: Vec<Arc<dyn ToolProvider>>) -> Self {
        let mut kept: Vec<Arc<dyn ToolProvider>> = Vec::with_capacity(providers.len());
        let mut specs = Vec::new();
        let mut routes = HashMap::new();

        for provider in providers {
            let listed = match provider.list_tools().await {
                Ok(listed) => listed,
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Dropping provider, listing failed");
                    continue;
                }
            };

            let index = kept.len();
            for spec in listed {
                if routes.contains_key(&spec.name) {
                    warn!(
                        provider = provider.name(),
                        tool = %spec.name,
                        "Duplicate tool name, keeping the first provider's"
                    );
                    continue;
                }
                routes.insert(spec.name.clone(), index);
                specs.push(spec);
            }
            kept.push(provider);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            providers: kept,
            specs,
            routes,
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

#[async_trait]
impl ToolProvider for MultiProvider {
    fn name(&self) -> &str {
        "multi"
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(self.specs.clone())
    }

    async fn call(&self, name: &str, args: ToolArgs) -> Result<Value, ToolError> {
        let index = self
            .routes
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        self.providers[*index].call(name, args).await
    }
}
