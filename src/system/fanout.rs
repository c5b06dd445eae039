// src/system/fanout.rs

use crate::CancellationToken;
use crate::dev_utils::BlockTimer;
use crate::models::ResourceKind;
use crate::system::provider::{ProviderError, ResourceProvider};
use rayon::prelude::*;
use serde_json::Value;
use std::sync::atomic::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFailure {
    pub region: String,
    pub error: ProviderError,
}

#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("Provider unavailable: all {} region(s) failed ({}).", .failures.len(), summarize_failures(.failures))]
    AllRegionsFailed { failures: Vec<RegionFailure> },
    #[error("Interrupted before any region was queried.")]
    Interrupted,
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

fn summarize_failures(failures: &[RegionFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.region, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Merged result of a multi-region discovery.
#[derive(Debug, Default)]
pub struct FanoutOutcome {
    /// Items of every successful region, in region order.
    pub items: Vec<Value>,
    pub succeeded: usize,
    pub failures: Vec<RegionFailure>,
    /// Regions never queried because the user interrupted.
    pub skipped: Vec<String>,
}

impl FanoutOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// One line per failed or skipped region.
    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.region, f.error))
            .chain(self.skipped.iter().map(|r| format!("{}: skipped (interrupted)", r)))
            .collect()
    }
}

enum RegionResult {
    Done(Vec<Value>),
    Failed(ProviderError),
    Skipped,
}

/// Queries `regions` in parallel on a pool of at most `max_workers` threads.
///
/// The cancellation flag is checked before each region starts; regions already
/// in flight finish and keep their results.
///
/// # Errors
/// [`FanoutError::AllRegionsFailed`] when no region answered, and
/// [`FanoutError::Interrupted`] when cancellation came before the first region.
pub fn discover_regions(
    provider: &dyn ResourceProvider,
    kind: ResourceKind,
    regions: &[String],
    max_workers: usize,
    cancel: &CancellationToken,
) -> Result<FanoutOutcome, FanoutError> {
    let _timer = BlockTimer::new(format!("fanout {}", kind));

    if !kind.is_regional() {
        return match provider.discover(kind, regions) {
            Ok(items) => Ok(FanoutOutcome {
                items,
                succeeded: 1,
                ..FanoutOutcome::default()
            }),
            Err(error) => Err(FanoutError::AllRegionsFailed {
                failures: vec![RegionFailure {
                    region: "global".to_string(),
                    error,
                }],
            }),
        };
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1).min(regions.len().max(1)))
        .build()?;

    let results: Vec<(String, RegionResult)> = pool.install(|| {
        regions
            .par_iter()
            .map(|region| {
                if cancel.load(Ordering::SeqCst) {
                    return (region.clone(), RegionResult::Skipped);
                }
                log::trace!("Discovering {} in {}", kind, region);
                let result = match provider.discover(kind, std::slice::from_ref(region)) {
                    Ok(items) => RegionResult::Done(items),
                    Err(e) => RegionResult::Failed(e),
                };
                (region.clone(), result)
            })
            .collect()
    });

    let mut outcome = FanoutOutcome::default();
    for (region, result) in results {
        match result {
            RegionResult::Done(items) => {
                outcome.succeeded += 1;
                outcome.items.extend(items);
            }
            RegionResult::Failed(error) => {
                log::warn!("Discovery of {} failed in {}: {}", kind, region, error);
                outcome.failures.push(RegionFailure { region, error });
            }
            RegionResult::Skipped => outcome.skipped.push(region),
        }
    }

    if outcome.succeeded == 0 {
        if !outcome.failures.is_empty() {
            return Err(FanoutError::AllRegionsFailed {
                failures: outcome.failures,
            });
        }
        if !outcome.skipped.is_empty() {
            return Err(FanoutError::Interrupted);
        }
    }
    Ok(outcome)
}
