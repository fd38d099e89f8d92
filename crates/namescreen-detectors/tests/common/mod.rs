//! Mock providers for testing
//!
//! Configurable implementations of the NER and LLM capability traits that
//! count calls, simulate latency and failures, and record how many calls
//! were in flight at once.

#![allow(dead_code)]

use async_trait::async_trait;
use namescreen_core::{EntitySpan, Error, NameCategory, Result};
use namescreen_detectors::{LlmAnswer, LlmProvider, LlmRequest, NerProvider};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// A configurable NER mock returning fixed person spans
pub struct MockNer {
    name: String,
    spans: Vec<EntitySpan>,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockNer {
    /// Mock that finds no persons
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            spans: Vec::new(),
            simulated_latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Add a person span with the given confidence
    pub fn with_person(mut self, text: &str, confidence: f32) -> Self {
        self.spans.push(EntitySpan::person(text, 0, text.len(), confidence));
        self
    }

    /// Add a non-person span
    pub fn with_entity(mut self, text: &str, label: &str, confidence: f32) -> Self {
        self.spans.push(EntitySpan {
            text: text.to_string(),
            start: 0,
            end: text.len(),
            label: label.to_string(),
            confidence,
        });
        self
    }

    /// Set simulated latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Get the number of times extract was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NerProvider for MockNer {
    async fn extract(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.spans.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An NER provider that is always unreachable
pub struct FailingNer {
    call_count: AtomicU32,
}

impl FailingNer {
    pub fn new() -> Self {
        Self {
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NerProvider for FailingNer {
    async fn extract(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(Error::unavailable("simulated NER outage"))
    }

    fn name(&self) -> &str {
        "failing-ner"
    }
}

/// What a [`MockLlm`] answers
#[derive(Clone)]
pub enum LlmBehavior {
    Name(String, Option<NameCategory>),
    NoName,
    Fail,
}

/// A configurable LLM mock tracking concurrency
pub struct MockLlm {
    behavior: LlmBehavior,
    confidence: f32,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLlm {
    /// Mock answering with a name
    pub fn naming(name: &str, category: Option<NameCategory>) -> Self {
        Self::with_behavior(LlmBehavior::Name(name.to_string(), category))
    }

    /// Mock stating there is no name
    pub fn no_name() -> Self {
        Self::with_behavior(LlmBehavior::NoName)
    }

    /// Mock whose backend errors
    pub fn failing() -> Self {
        Self::with_behavior(LlmBehavior::Fail)
    }

    fn with_behavior(behavior: LlmBehavior) -> Self {
        Self {
            behavior,
            confidence: 0.85,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Set simulated latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Get the number of times infer was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn infer(&self, _request: &LlmRequest) -> Result<LlmAnswer> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        match &self.behavior {
            LlmBehavior::Name(name, category) => Ok(LlmAnswer {
                name: Some(name.clone()),
                category: *category,
                confidence: self.confidence,
            }),
            LlmBehavior::NoName => Ok(LlmAnswer {
                name: None,
                category: Some(NameCategory::None),
                confidence: 0.9,
            }),
            LlmBehavior::Fail => Err(Error::provider("simulated LLM failure")),
        }
    }

    fn name(&self) -> &str {
        "mock-llm"
    }
}
