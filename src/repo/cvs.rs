use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{Package, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CommandExecutor};
use crate::repo::{RepositoryBackend, Revision, TagRequest, VcsKind, WorkingContext};
use crate::warning::ReleaseWarning;

/// CVS's name for the trunk.
const HEAD: &str = "HEAD";

/// Read the repository root recorded in a sandbox's `CVS/Root`.
pub(crate) fn read_sandbox_root(dir: &Path) -> Option<String> {
    read_admin_file(dir, "Root")
}

fn read_admin_file(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join("CVS").join(name))
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// The directory a module was checked out as, for `dir` anywhere inside it.
///
/// Climbs while the parent is a sandbox of the same repository, then skips
/// the file-less directories CVS creates to hold a module path.
fn module_top(dir: &Path) -> PathBuf {
    let root = read_sandbox_root(dir);
    let mut chain = vec![dir.to_path_buf()];
    loop {
        let Some(parent) = chain.last().and_then(|d| d.parent()).map(Path::to_path_buf) else {
            break;
        };
        if read_sandbox_root(&parent).is_none() || read_sandbox_root(&parent) != root {
            break;
        }
        chain.push(parent);
    }
    chain
        .iter()
        .rev()
        .find(|d| holds_files(d))
        .unwrap_or(&chain[0])
        .clone()
}

/// Whether a sandbox directory has files of its own. `CVS/Entries` lists
/// files as `/name/...` and subdirectories as `D/name/...`.
fn holds_files(dir: &Path) -> bool {
    match fs::read_to_string(dir.join("CVS").join("Entries")) {
        Ok(entries) => entries.lines().any(|line| line.starts_with('/')),
        Err(_) => true,
    }
}

/// CVS repository. Tags are applied from a sandbox checked out into the
/// release workspace.
pub struct CvsBackend {
    root: String,
}

impl CvsBackend {
    pub fn new(root: impl Into<String>) -> Self {
        CvsBackend { root: root.into() }
    }

    fn cvs(&self) -> Cmd {
        Cmd::new("cvs").args(["-Q", "-d", self.root.as_str()])
    }

    /// Check out `revision` into `target_dir`, which must not be an existing
    /// sandbox of another module.
    fn checkout(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<()> {
        let parent = target_dir
            .parent()
            .ok_or_else(|| ReleaseError::internal("checkout target has no parent directory"))?;
        let name = target_dir
            .file_name()
            .ok_or_else(|| ReleaseError::internal("checkout target has no name"))?
            .to_string_lossy()
            .into_owned();

        if !exec.is_dry_run() {
            fs::create_dir_all(parent)?;
        }

        let mut cmd = self.cvs().args(["checkout", "-d", name.as_str()]);
        match revision {
            Revision::Branch { branch, .. } if branch == HEAD => {}
            Revision::Branch { branch, .. } => cmd = cmd.args(["-r", branch.as_str()]),
            Revision::Tag { version, .. } => cmd = cmd.args(["-r", version.as_str()]),
        }
        exec.run(&cmd.arg(revision.package().as_str()).current_dir(parent), true)?;
        Ok(())
    }
}

impl RepositoryBackend for CvsBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Cvs
    }

    fn working_context(&self, _exec: &CommandExecutor, dir: &Path) -> Result<WorkingContext> {
        if read_sandbox_root(dir).is_none() {
            return Ok(WorkingContext::default());
        }
        let dir = module_top(dir);
        let dir = dir.as_path();

        let module = read_admin_file(dir, "Repository").map(|repository| {
            let root_path = self.root.rsplit(':').next().unwrap_or(&self.root);
            repository
                .strip_prefix(root_path)
                .map(|rest| rest.trim_start_matches('/').to_string())
                .unwrap_or(repository)
        });

        // CVS/Tag holds "T<branch>", "N<tag>" or "D<date>".
        let sticky = read_admin_file(dir, "Tag");
        let (branch, tag) = match sticky.as_deref() {
            Some(s) if s.starts_with('N') => (None, Some(s[1..].to_string())),
            Some(s) if s.starts_with('T') => (Some(s[1..].to_string()), None),
            _ => (Some(HEAD.to_string()), None),
        };

        Ok(WorkingContext {
            url: module,
            branch,
            tag,
        })
    }

    fn package_candidates(&self, context: &WorkingContext) -> Vec<String> {
        context
            .url
            .iter()
            .filter(|module| !module.is_empty() && *module != ".")
            .cloned()
            .collect()
    }

    fn default_branch(&self, _package: &Package) -> String {
        HEAD.to_string()
    }

    fn tag_location(&self, package: &Package, version: &ReleaseVersion) -> String {
        format!("{}:{}@{}", self.root, package, version)
    }

    fn tag_exists(
        &self,
        exec: &CommandExecutor,
        package: &Package,
        version: &ReleaseVersion,
    ) -> Result<bool> {
        let log = exec.query(&self.cvs().args(["rlog", "-h", package.as_str()]))?;
        let marker = format!("{}:", version);
        Ok(log.is_some_and(|log| log.lines().any(|line| line.trim().starts_with(&marker))))
    }

    fn checkout_release(
        &self,
        exec: &CommandExecutor,
        target_dir: &Path,
        revision: &Revision,
    ) -> Result<Vec<ReleaseWarning>> {
        self.checkout(exec, target_dir, revision)
            .map(|_| Vec::new())
            .map_err(|e| ReleaseError::checkout_failed(revision.label(), e))
    }

    fn tag_release(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        let sandbox = request.sandbox.join(request.package.leaf());
        let tag = || -> Result<()> {
            self.checkout(
                exec,
                &sandbox,
                &Revision::branch(&request.package, &request.branch),
            )?;
            log::debug!("cvs tags carry no message; not recording '{}'", request.message);
            exec.run(
                &Cmd::new("cvs")
                    .args(["-Q", "tag", request.version.as_str()])
                    .current_dir(&sandbox),
                true,
            )?;
            Ok(())
        };
        tag().map_err(|e| {
            ReleaseError::tag_failed(self.tag_location(&request.package, &request.version), e)
        })
    }

    fn remove_tag(&self, exec: &CommandExecutor, request: &TagRequest) -> Result<()> {
        let sandbox = request.sandbox.join(request.package.leaf());
        let untag = || -> Result<()> {
            self.checkout(
                exec,
                &sandbox,
                &Revision::tag(&request.package, &request.version),
            )?;
            exec.run(
                &Cmd::new("cvs")
                    .args(["-Q", "tag", "-d", request.version.as_str()])
                    .current_dir(&sandbox),
                true,
            )?;
            Ok(())
        };
        untag().map_err(|e| {
            ReleaseError::tag_removal_failed(
                self.tag_location(&request.package, &request.version),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CmdOutput, ExecMode, MockRunner};

    fn executor(runner: &MockRunner, dry_run: bool) -> CommandExecutor {
        CommandExecutor::with_runner(
            Box::new(runner.clone()),
            ExecMode {
                dry_run,
                ..Default::default()
            },
        )
    }

    fn sandbox(root: &str, repository: &str, tag: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let admin = dir.path().join("CVS");
        fs::create_dir(&admin).unwrap();
        fs::write(admin.join("Root"), format!("{}\n", root)).unwrap();
        fs::write(admin.join("Repository"), format!("{}\n", repository)).unwrap();
        if let Some(tag) = tag {
            fs::write(admin.join("Tag"), format!("{}\n", tag)).unwrap();
        }
        dir
    }

    #[test]
    fn test_working_context_reads_admin_files() {
        let dir = sandbox("/cvs/root", "ioc/xpp/vac", Some("NR1.2.0"));
        let runner = MockRunner::new();
        let cvs = CvsBackend::new("/cvs/root");

        let ctx = cvs.working_context(&executor(&runner, false), dir.path()).unwrap();
        assert_eq!(ctx.url.as_deref(), Some("ioc/xpp/vac"));
        assert_eq!(ctx.tag.as_deref(), Some("R1.2.0"));
        assert!(ctx.branch.is_none());
        assert_eq!(cvs.package_candidates(&ctx), vec!["ioc/xpp/vac"]);
    }

    #[test]
    fn test_absolute_repository_is_made_relative() {
        let dir = sandbox(":ext:host:/cvs/root", "/cvs/root/modules/motor", None);
        let runner = MockRunner::new();
        let cvs = CvsBackend::new(":ext:host:/cvs/root");

        let ctx = cvs.working_context(&executor(&runner, false), dir.path()).unwrap();
        assert_eq!(ctx.url.as_deref(), Some("modules/motor"));
        assert_eq!(ctx.branch.as_deref(), Some("HEAD"));
    }

    #[test]
    fn test_tag_exists_parses_symbolic_names() {
        let runner = MockRunner::new();
        runner.respond(
            "cvs -Q -d /cvs/root rlog",
            CmdOutput::ok("RCS file: x,v\nsymbolic names:\n\tR1.2.0: 1.4\n\tR1.1.0: 1.2\n"),
        );
        let exec = executor(&runner, false);
        let cvs = CvsBackend::new("/cvs/root");
        let package = Package::parse("ioc/xpp/vac").unwrap();

        assert!(cvs
            .tag_exists(&exec, &package, &ReleaseVersion::parse("R1.2.0").unwrap())
            .unwrap());
        assert!(!cvs
            .tag_exists(&exec, &package, &ReleaseVersion::parse("R1.3.0").unwrap())
            .unwrap());
    }

    #[test]
    fn test_tag_release_from_sandbox() {
        let work = tempfile::tempdir().unwrap();
        let runner = MockRunner::new();
        let exec = executor(&runner, false);
        let cvs = CvsBackend::new("/cvs/root");
        let request = TagRequest {
            package: Package::parse("ioc/xpp/vac").unwrap(),
            version: ReleaseVersion::parse("R1.3.0").unwrap(),
            branch: HEAD.to_string(),
            message: "unused".to_string(),
            sandbox: work.path().to_path_buf(),
        };

        cvs.tag_release(&exec, &request).unwrap();
        assert_eq!(
            runner.executed(),
            vec![
                "cvs -Q -d /cvs/root checkout -d vac ioc/xpp/vac".to_string(),
                "cvs -Q tag R1.3.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_dry_run_tag_skips_everything() {
        let runner = MockRunner::new();
        let exec = executor(&runner, true);
        let cvs = CvsBackend::new("/cvs/root");
        let request = TagRequest {
            package: Package::parse("ioc/xpp/vac").unwrap(),
            version: ReleaseVersion::parse("R1.3.0").unwrap(),
            branch: HEAD.to_string(),
            message: "unused".to_string(),
            sandbox: std::path::PathBuf::from("/nonexistent/pkg-release-cvs"),
        };

        cvs.tag_release(&exec, &request).unwrap();
        assert!(runner.executed().is_empty());
    }

    fn add_subdir(parent: &Path, name: &str, root: &str, repository: &str, entries: &str) {
        let admin = parent.join(name).join("CVS");
        fs::create_dir_all(&admin).unwrap();
        fs::write(admin.join("Root"), format!("{}\n", root)).unwrap();
        fs::write(admin.join("Repository"), format!("{}\n", repository)).unwrap();
        fs::write(admin.join("Entries"), entries).unwrap();
    }

    #[test]
    fn test_working_context_from_module_subdirectory() {
        let dir = sandbox("/cvs/root", "modules/motor", Some("Tmotor-fixes"));
        fs::write(
            dir.path().join("CVS/Entries"),
            "/Makefile/1.3///\nD/motorApp////\n",
        )
        .unwrap();
        add_subdir(
            dir.path(),
            "motorApp",
            "/cvs/root",
            "modules/motor/motorApp",
            "/Makefile/1.1///\n",
        );
        let runner = MockRunner::new();
        let cvs = CvsBackend::new("/cvs/root");

        let ctx = cvs
            .working_context(&executor(&runner, false), &dir.path().join("motorApp"))
            .unwrap();
        assert_eq!(cvs.package_candidates(&ctx), vec!["modules/motor"]);
        assert_eq!(ctx.branch.as_deref(), Some("motor-fixes"));
    }

    #[test]
    fn test_working_context_skips_module_path_directories() {
        let dir = sandbox("/cvs/root", "modules", None);
        fs::write(dir.path().join("CVS/Entries"), "D/motor////\n").unwrap();
        add_subdir(
            dir.path(),
            "motor",
            "/cvs/root",
            "modules/motor",
            "/Makefile/1.3///\nD/motorApp////\n",
        );
        let motor = dir.path().join("motor");
        add_subdir(
            &motor,
            "motorApp",
            "/cvs/root",
            "modules/motor/motorApp",
            "/Makefile/1.1///\n",
        );
        let runner = MockRunner::new();
        let cvs = CvsBackend::new("/cvs/root");

        let ctx = cvs
            .working_context(&executor(&runner, false), &motor.join("motorApp"))
            .unwrap();
        assert_eq!(cvs.package_candidates(&ctx), vec!["modules/motor"]);
    }

    #[test]
    fn test_sandbox_of_other_repository_is_not_climbed() {
        let dir = sandbox("/cvs/other", "vendor", None);
        add_subdir(dir.path(), "vac", "/cvs/root", "ioc/xpp/vac", "/Makefile/1.1///\n");
        let runner = MockRunner::new();
        let cvs = CvsBackend::new("/cvs/root");

        let ctx = cvs
            .working_context(&executor(&runner, false), &dir.path().join("vac"))
            .unwrap();
        assert_eq!(cvs.package_candidates(&ctx), vec!["ioc/xpp/vac"]);
    }
}
