//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.
//! `format_*` functions build strings and are testable; `display_*` functions print.

use console::style;

use crate::domain::ResolvedRelease;
use crate::pipeline::PipelineReport;
use crate::repo::VcsKind;
use crate::warning::ReleaseWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Echo an external command. Skipped (dry-run) commands are marked.
pub fn display_command(command_line: &str, skipped: bool) {
    if skipped {
        println!("{} {}", style("[dry-run]").cyan(), command_line);
    } else {
        println!("{} {}", style("$").dim(), command_line);
    }
}

pub fn display_warning(warning: &ReleaseWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Describe what a release run is about to do.
pub fn format_plan(release: &ResolvedRelease, backend: VcsKind) -> String {
    let flags = &release.flags;
    let mut lines = vec![
        format!("Package:     {}", release.package),
        format!("Version:     {}", release.version),
        format!("Repository:  {}", backend),
        format!("Branch:      {}", release.branch),
        format!("Tag:         {}", release.tag_location),
        format!("Install dir: {}", release.install_dir.display()),
    ];

    let mut actions = Vec::new();
    if flags.is_removal() {
        if flags.removes_build() {
            actions.push("remove installed build");
        }
        if flags.removes_tag() {
            actions.push("remove tag");
        }
    } else {
        if !flags.no_test_build {
            actions.push("test build");
        }
        if flags.creates_tag() {
            actions.push("tag");
        }
        actions.push("install");
    }
    lines.push(format!("Actions:     {}", actions.join(", ")));

    if let Some(message) = &release.message {
        let mut message_lines = message.lines();
        lines.push(format!("Message:     {}", message_lines.next().unwrap_or("")));
        lines.extend(message_lines.map(|line| format!("             {}", line)));
    }
    if flags.dry_run {
        lines.push("Dry run:     no changes will be made".to_string());
    }
    lines.join("\n")
}

pub fn display_plan(plan: &str) {
    println!("\n{}", style("Release plan:").bold());
    for line in plan.lines() {
        println!("  {}", line);
    }
}

/// Print the final summary of a run.
pub fn display_report(report: &PipelineReport) {
    for warning in &report.warnings {
        display_warning(warning);
    }

    if report.outcome.is_success() {
        match (&report.tag, &report.install_dir) {
            (Some(tag), Some(dir)) => {
                display_success(&format!("Released {} into {}", tag, dir.display()))
            }
            (None, Some(dir)) => display_success(&format!("Done: {}", dir.display())),
            (Some(tag), None) => display_success(&format!("Done: {}", tag)),
            (None, None) => display_success("Done"),
        }
    } else {
        let detail = report.diagnostic.as_deref().unwrap_or("no further detail");
        display_error(&format!("{} ({})", report.outcome, detail));
    }

    if let Some(path) = &report.kept_workspace {
        display_status(&format!("Workspace left at {}", path.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Package, ReleaseFlags, ReleaseVersion};
    use std::path::PathBuf;

    fn release(flags: ReleaseFlags) -> ResolvedRelease {
        ResolvedRelease {
            package: Package::parse("modules/asyn").unwrap(),
            version: ReleaseVersion::parse("R4.31-0.1.0").unwrap(),
            branch: "master".to_string(),
            tag_location: "/git/modules/asyn.git:refs/tags/R4.31-0.1.0".to_string(),
            message: Some("First line\nSecond line".to_string()),
            install_dir: PathBuf::from("/epics/R3.14.12-0.4.0/modules/asyn/R4.31-0.1.0"),
            flags,
        }
    }

    #[test]
    fn test_format_plan_release() {
        let plan = format_plan(&release(ReleaseFlags::default()), VcsKind::Git);
        assert!(plan.contains("Package:     modules/asyn"));
        assert!(plan.contains("Repository:  git"));
        assert!(plan.contains("Actions:     test build, tag, install"));
        assert!(plan.contains("             Second line"));
        assert!(!plan.contains("Dry run"));
    }

    #[test]
    fn test_format_plan_nuke_dry_run() {
        let flags = ReleaseFlags {
            nuke_release: true,
            dry_run: true,
            ..Default::default()
        };
        let plan = format_plan(&release(flags), VcsKind::Subversion);
        assert!(plan.contains("Actions:     remove installed build, remove tag"));
        assert!(plan.contains("Dry run:"));
    }

    #[test]
    fn test_display_error() {
        // Visual verification test - output is printed to stderr
        display_error("test error");
    }

    #[test]
    fn test_display_command() {
        display_command("git tag -a R1.0.0", true);
        display_command("git fetch origin", false);
    }
}
