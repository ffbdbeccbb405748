//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::models::Paper;
use crate::sources::{Source, SourceError};
use crate::utils::{write_atomic, ThrottledClient};

/// What a [`MockSource`] does when asked for a paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Report the paper as not applicable
    NotApplicable,
    /// Fail with a network error carrying this message
    Fail(String),
    /// Write these bytes to the destination and succeed
    Write(Vec<u8>),
    /// Claim success without writing anything
    ClaimOnly,
}

/// A mock source for testing that follows a scripted behavior and records
/// every call it receives.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    behavior: MockBehavior,
    overrides: HashMap<String, MockBehavior>,
    calls: Mutex<Vec<MockCall>>,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub paper_id: String,
    pub with_session: bool,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new(id: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            id: id.into(),
            behavior,
            overrides: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Use a different behavior for one paper id.
    pub fn with_override(mut self, paper_id: impl Into<String>, behavior: MockBehavior) -> Self {
        self.overrides.insert(paper_id.into(), behavior);
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    /// Paper ids this source was asked for, in order.
    pub fn paper_ids(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.paper_id.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn retrieve(
        &self,
        paper: &Paper,
        destination: &Path,
        session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        self.lock().push(MockCall {
            paper_id: paper.paper_id.clone(),
            with_session: session.is_some(),
        });

        match self.overrides.get(&paper.paper_id).unwrap_or(&self.behavior) {
            MockBehavior::NotApplicable => Ok(false),
            MockBehavior::Fail(message) => Err(SourceError::Network(message.clone())),
            MockBehavior::Write(bytes) => {
                write_atomic(destination, bytes)?;
                Ok(true)
            }
            MockBehavior::ClaimOnly => Ok(true),
        }
    }
}
