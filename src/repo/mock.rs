use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::{Package, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::repo::{RepositoryBackend, Revision, TagRequest, VcsKind, WorkingContext};
use crate::warning::ReleaseWarning;

/// File written into mock checkouts, naming the revision.
pub const MOCK_CHECKOUT_FILE: &str = "REVISION";

#[derive(Default)]
struct MockState {
    tags: HashSet<String>,
    calls: Vec<String>,
}

/// Mock backend for testing without any version-control client.
///
/// Honors dry-run like the real backends: nothing is written and no tag
/// changes while the executor is in dry-run mode. Clones share state.
#[derive(Clone, Default)]
pub struct MockBackend {
    context: WorkingContext,
    candidates: Vec<String>,
    fail_checkout: bool,
    fail_tag: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: WorkingContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_candidates(mut self, candidates: &[&str]) -> Self {
        self.candidates = candidates.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Pretend `version` is already tagged.
    pub fn with_tag(self, version: &str) -> Self {
        self.lock().tags.insert(version.to_string());
        self
    }

    pub fn failing_checkout(mut self) -> Self {
        self.fail_checkout = true;
        self
    }

    pub fn failing_tag(mut self) -> Self {
        self.fail_tag = true;
        self
    }

    /// Every backend operation seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn has_tag(&self, version: &str) -> bool {
        self.lock().tags.contains(version)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl RepositoryBackend for MockBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn working_context(&self, _exec: &CommandExecutor, _dir: &Path) -> Result<WorkingContext> {
        Ok(self.context.clone())
    }

    fn package_candidates(&self, _context: &WorkingContext) -> Vec<String> {
        self.candidates.clone()
    }

    fn default_branch(&self, _package: &Package) -> String {
        "master".to_string()
    }

    fn tag_location(&self, package: &Package, version: &ReleaseVersion) -> String {
        format!("mock:{}@{}", package, version)
    }

    fn tag_exists(
        &self,
        _exec: &CommandExecutor,
        _package: &Package,
        version: &ReleaseVersion,
    ) -> Result<bool> {
        Ok(self.has_tag(version.as_str()))
    }

    fn checkout_release(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>> {
        self.record(format!("checkout {}", revision.label()));
        if self.fail_checkout {
            return Err(ReleaseError::CheckoutFailed {
                revision: revision.label(),
                detail: "mock checkout failure".to_string(),
            });
        }
        if !exec.is_dry_run() {
            fs::create_dir_all(target_dir)?;
            fs::write(target_dir.join(MOCK_CHECKOUT_FILE), revision.label())?;
        }
        Ok(Vec::new())
    }

    fn tag_release(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        self.record(format!("tag {}", request.version));
        let location = self.tag_location(&request.package, &request.version);
        if self.fail_tag {
            return Err(ReleaseError::TagFailed {
                tag: location,
                detail: "mock tag failure".to_string(),
            });
        }
        if !exec.is_dry_run() && !self.lock().tags.insert(request.version.to_string()) {
            return Err(ReleaseError::TagFailed {
                tag: location,
                detail: "tag already exists".to_string(),
            });
        }
        Ok(())
    }

    fn remove_tag(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        self.record(format!("remove-tag {}", request.version));
        if !exec.is_dry_run() && !self.lock().tags.remove(request.version.as_str()) {
            return Err(ReleaseError::TagRemovalFailed {
                tag: self.tag_location(&request.package, &request.version),
                detail: "no such tag".to_string(),
            });
        }
        Ok(())
    }
}
