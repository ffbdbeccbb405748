//! Local file source: accepts a PDF that is already at the destination.

use async_trait::async_trait;
use std::path::Path;

use crate::models::Paper;
use crate::sources::{Source, SourceError};
use crate::utils::{check_pdf, ThrottledClient};

/// Last resort: succeeds when a previous run (or the user) already placed a
/// readable PDF at the destination path. Never touches the network.
#[derive(Debug, Clone, Default)]
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Source for LocalSource {
    fn id(&self) -> &str {
        "local"
    }

    fn name(&self) -> &str {
        "Local file"
    }

    async fn retrieve(
        &self,
        _paper: &Paper,
        destination: &Path,
        _session: Option<&ThrottledClient>,
    ) -> Result<bool, SourceError> {
        Ok(check_pdf(destination))
    }
}
