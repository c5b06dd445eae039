// src/state.rs

//! The shell session: the one object every command handler receives.

use crate::CancellationToken;
use crate::constants::{DEFAULT_ACCOUNT, FALLBACK_REGIONS};
use crate::core::cache::CacheService;
use crate::core::config_loader::ShellConfig;
use crate::core::hierarchy::CommandGraph;
use crate::core::navigator::Navigator;
use crate::core::routing::RoutingEngine;
use crate::models::{ResourceKind, RuntimeSettings};
use crate::system::fanout;
use crate::system::provider::ResourceProvider;
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// A resource list plus anything the user should know about how it was obtained.
#[derive(Debug, Clone)]
pub struct Listing {
    pub items: Arc<Value>,
    /// Per-region failures or skips of a partial fetch.
    pub warnings: Vec<String>,
    pub from_cache: bool,
}

impl Listing {
    pub fn as_slice(&self) -> &[Value] {
        self.items.as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug)]
pub struct Session {
    pub navigator: Navigator,
    pub cache: CacheService,
    pub routing: RoutingEngine,
    pub settings: RuntimeSettings,
    pub config: ShellConfig,
    provider: Arc<dyn ResourceProvider>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        graph: Arc<CommandGraph>,
        config: ShellConfig,
        settings: RuntimeSettings,
        provider: Arc<dyn ResourceProvider>,
        mut cache: CacheService,
        cancel: CancellationToken,
    ) -> Self {
        cache.set_account(account_for(&settings));
        Self {
            navigator: Navigator::new(graph),
            cache,
            routing: RoutingEngine::new(),
            settings,
            config,
            provider,
            cancel,
        }
    }

    pub fn provider(&self) -> &dyn ResourceProvider {
        self.provider.as_ref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Clears a previous interrupt before a new command starts.
    pub fn reset_cancellation(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.config.ttl_seconds()
    }

    /// The cache's account identity: the profile, or `"default"`.
    pub fn account_id(&self) -> String {
        account_for(&self.settings)
    }

    /// Switches the account identity. Routes built for the previous account
    /// stop answering queries.
    pub fn set_profile(&mut self, profile: String) {
        self.settings.profile = Some(profile);
        let account = self.account_id();
        self.cache.set_account(account);
        self.routing.sync_account(&self.cache);
    }

    /// Runtime regions, else configured regions, else the provider's, else a fallback.
    pub fn effective_regions(&self) -> Vec<String> {
        if !self.settings.regions.is_empty() {
            return self.settings.regions.clone();
        }
        if !self.config.provider.regions.is_empty() {
            return self.config.provider.regions.clone();
        }
        let from_provider = self.provider.default_regions();
        if !from_provider.is_empty() {
            return from_provider;
        }
        FALLBACK_REGIONS.iter().map(|r| r.to_string()).collect()
    }

    /// Lists every `kind` resource through the cache. `refresh` skips the read.
    pub fn list_resources(&mut self, kind: ResourceKind, refresh: bool) -> Result<Listing> {
        let regions = self.effective_regions();
        let key = if kind.is_regional() {
            regions.join(",")
        } else {
            "global".to_string()
        };

        if !refresh && !self.settings.no_cache {
            if let Some(items) = self.cache.get(kind.namespace(), &key) {
                return Ok(Listing {
                    items,
                    warnings: Vec::new(),
                    from_cache: true,
                });
            }
        }

        let outcome = fanout::discover_regions(
            self.provider.as_ref(),
            kind,
            &regions,
            self.config.provider.max_workers,
            &self.cancel,
        )
        .with_context(|| format!("Failed to discover {}", kind.listing_name()))?;

        let warnings = outcome.warnings();
        let ttl = self.ttl_seconds();
        let items = self
            .cache
            .put(kind.namespace(), &key, Value::Array(outcome.items), ttl);
        Ok(Listing {
            items,
            warnings,
            from_cache: false,
        })
    }

    /// The full document of one resource, through the cache.
    pub fn resource_detail(&mut self, kind: ResourceKind, id: &str, region: Option<&str>) -> Result<Arc<Value>> {
        let namespace = detail_namespace(kind);
        if !self.settings.no_cache {
            if let Some(hit) = self.cache.get(&namespace, id) {
                return Ok(hit);
            }
        }
        let detail = self
            .provider
            .get_detail(kind, id, region)
            .with_context(|| format!("Failed to fetch {} '{}'", kind, id))?;
        let ttl = self.ttl_seconds();
        Ok(self.cache.put(&namespace, id, detail, ttl))
    }

    /// Drops cached lists and details of one kind.
    pub fn invalidate_kind(&mut self, kind: ResourceKind) {
        self.cache.invalidate_namespace(kind.namespace());
        self.cache.invalidate_namespace(&detail_namespace(kind));
    }
}

fn account_for(settings: &RuntimeSettings) -> String {
    settings
        .profile
        .clone()
        .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string())
}

/// Cache namespace for full resource documents of `kind`.
pub fn detail_namespace(kind: ResourceKind) -> String {
    format!("{}:detail", kind.namespace())
}
