//! Interrupt handling.
//!
//! A watcher thread waits for Ctrl-C. While an external command runs, the
//! interrupt only raises a flag: the child receives the same signal, exits,
//! and the executor turns the flag into [`ReleaseError::Interrupted`] so the
//! pipeline's regular cleanup runs. When no command is running (for example
//! while blocked on a prompt) the watcher removes every registered workspace
//! itself and exits the process.
//!
//! [`ReleaseError::Interrupted`]: crate::error::ReleaseError::Interrupted

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::PipelineOutcome;
use crate::error::Result;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static ACTIVE_CHILDREN: AtomicUsize = AtomicUsize::new(0);
static LIVE_WORKSPACES: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Start the Ctrl-C watcher. Call once, from `main`.
pub fn install_handler() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt-watcher".to_string())
        .spawn(move || {
            runtime.block_on(async {
                loop {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        log::warn!("cannot listen for interrupts: {}", err);
                        return;
                    }
                    on_interrupt();
                }
            })
        })?;

    Ok(())
}

fn on_interrupt() {
    let repeated = INTERRUPTED.swap(true, Ordering::SeqCst);
    if !repeated && ACTIVE_CHILDREN.load(Ordering::SeqCst) > 0 {
        log::warn!("interrupt received, waiting for the running command to stop");
        return;
    }

    remove_registered_workspaces();
    eprintln!("Interrupted.");
    std::process::exit(PipelineOutcome::Interrupted.exit_code());
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Marks an external command as running for as long as it is alive.
pub struct ChildGuard(());

impl ChildGuard {
    pub fn enter() -> Self {
        ACTIVE_CHILDREN.fetch_add(1, Ordering::SeqCst);
        ChildGuard(())
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        ACTIVE_CHILDREN.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Record a workspace that must be removed if the process is interrupted.
pub fn register_workspace(path: &Path) {
    if let Ok(mut live) = LIVE_WORKSPACES.lock() {
        live.push(path.to_path_buf());
    }
}

pub fn unregister_workspace(path: &Path) {
    if let Ok(mut live) = LIVE_WORKSPACES.lock() {
        live.retain(|p| p != path);
    }
}

pub fn registered_workspaces() -> Vec<PathBuf> {
    LIVE_WORKSPACES
        .lock()
        .map(|live| live.clone())
        .unwrap_or_default()
}

fn remove_registered_workspaces() {
    let paths = match LIVE_WORKSPACES.lock() {
        Ok(mut live) => std::mem::take(&mut *live),
        Err(_) => return,
    };
    for path in paths {
        if let Err(err) = crate::install::remove_tree(&path) {
            eprintln!("cannot remove workspace {}: {}", path.display(), err);
        }
    }
}
