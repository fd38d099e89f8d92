//! Fallback gate (LLM tier)
//!
//! Admission control and a hard deadline around the generative backend.
//! A permit is held only inside [`FallbackGate::attempt`]; when the
//! deadline fires the provider future is dropped together with its
//! permit, so a stuck call never keeps a slot past its budget.

use crate::config::AdmissionPolicy;
use crate::extractor::{LlmProvider, LlmRequest};
use namescreen_core::{Error, ExtractedEntity, NameCategory, Result, Tier};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What the fallback tier concluded
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackVerdict {
    /// A name, with the category the model stated (if any)
    Name {
        entity: ExtractedEntity,
        category: Option<NameCategory>,
    },
    /// The model states the comment carries no name
    NoName { confidence: f32 },
}

/// Bounded-concurrency, deadline-enforcing access to an LLM provider
pub struct FallbackGate {
    provider: Option<Arc<dyn LlmProvider>>,
    permits: Arc<Semaphore>,
    limit: Mutex<usize>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Tracks one call inside the provider
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FallbackGate {
    /// Create a gate allowing `max_concurrent` calls in flight
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, max_concurrent: usize) -> Self {
        Self {
            provider,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            limit: Mutex::new(max_concurrent),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Whether a provider is wired in
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Name of the wired provider
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Calls currently inside the provider
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Free slots right now
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Configured concurrency bound
    pub fn limit(&self) -> usize {
        *self.limit.lock()
    }

    /// Change the concurrency bound
    ///
    /// Growing takes effect at once. Shrinking retires free slots now and
    /// the rest as in-flight calls finish, so the new bound is never exceeded
    /// by newly admitted calls.
    pub fn resize(&self, new_limit: usize) {
        let mut limit = self.limit.lock();
        if new_limit > *limit {
            self.permits.add_permits(new_limit - *limit);
        } else if new_limit < *limit {
            let mut surplus = *limit - new_limit;
            while surplus > 0 {
                match self.permits.try_acquire() {
                    Ok(permit) => {
                        permit.forget();
                        surplus -= 1;
                    }
                    Err(_) => break,
                }
            }

            if surplus > 0 {
                match (tokio::runtime::Handle::try_current(), u32::try_from(surplus)) {
                    (Ok(handle), Ok(surplus)) => {
                        let permits = Arc::clone(&self.permits);
                        handle.spawn(async move {
                            if let Ok(retired) = permits.acquire_many_owned(surplus).await {
                                retired.forget();
                            }
                        });
                    }
                    (Err(_), _) => warn!(surplus, "No runtime to retire busy fallback slots"),
                    (_, Err(_)) => warn!(surplus, "Too many busy fallback slots to retire"),
                }
            }
        }
        *limit = new_limit;
    }

    /// Run one fallback call under the admission policy and deadline
    pub async fn attempt(
        &self,
        request: LlmRequest,
        policy: AdmissionPolicy,
        timeout: Duration,
    ) -> Result<FallbackVerdict> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::unavailable("no LLM provider configured"))?;

        let deadline = Instant::now() + timeout;

        let _permit = match policy {
            AdmissionPolicy::Reject => self
                .permits
                .try_acquire()
                .map_err(|_| Error::AdmissionRejected)?,
            AdmissionPolicy::Queue => tokio::time::timeout_at(deadline, self.permits.acquire())
                .await
                .map_err(|_| Error::Timeout)?
                .map_err(|_| Error::internal("fallback gate closed"))?,
        };

        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        debug!(provider = provider.name(), "Fallback call admitted");

        let answer = tokio::time::timeout_at(deadline, provider.infer(&request))
            .await
            .map_err(|_| Error::Timeout)??;

        Ok(match (answer.name, answer.category) {
            (Some(name), category) if category != Some(NameCategory::None) => FallbackVerdict::Name {
                entity: ExtractedEntity::new(name, answer.confidence, Tier::Llm),
                category,
            },
            _ => FallbackVerdict::NoName {
                confidence: answer.confidence,
            },
        })
    }
}
