use std::fmt;
use std::path::Path;
use std::process::Command;
use updrepo_schema::ToolsSection;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(tool: &Path) -> bool {
    if tool.components().count() > 1 {
        return tool.is_file();
    }
    Command::new("which")
        .arg(tool)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Safe wrapper around libc::geteuid().
#[allow(unsafe_code)]
fn effective_uid() -> u32 {
    // SAFETY: geteuid() takes no arguments, has no side effects and cannot fail.
    unsafe { libc::geteuid() }
}

/// Check everything `fetch` and `apply` need on the running system.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_update_prereqs(tools: &ToolsSection) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    let required = [
        (
            &tools.mksquashfs,
            "building squashfs images from package payloads",
            "zypper install squashfs | apt install squashfs-tools | dnf install squashfs-tools",
        ),
        (
            &tools.mount,
            "loop-mounting update images",
            "part of util-linux (usually pre-installed)",
        ),
        (
            &tools.adddir,
            "splicing mounted updates into the running root",
            "shipped with the installation system (installation-images)",
        ),
        (
            &tools.bsdtar,
            "extracting rpm and compressed payloads",
            "zypper install bsdtar | apt install libarchive-tools | dnf install bsdtar",
        ),
    ];
    for (tool, purpose, install_hint) in required {
        if !command_exists(tool) {
            missing.push(MissingPrereq {
                name: tool.display().to_string(),
                purpose,
                install_hint,
            });
        }
    }

    if effective_uid() != 0 {
        missing.push(MissingPrereq {
            name: "root privileges".to_owned(),
            purpose: "mounting images and writing the parts manifest",
            install_hint: "run as root inside the installation system",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nApplying updates requires these tools on the installation system.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "mksquashfs".to_owned(),
            purpose: "building images",
            install_hint: "zypper install squashfs",
        };
        let s = format!("{m}");
        assert!(s.contains("mksquashfs"));
        assert!(s.contains("building images"));
        assert!(s.contains("zypper install squashfs"));
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let items = vec![
            MissingPrereq {
                name: "mksquashfs".to_owned(),
                purpose: "images",
                install_hint: "zypper install squashfs",
            },
            MissingPrereq {
                name: "/sbin/adddir".to_owned(),
                purpose: "splice",
                install_hint: "installation-images",
            },
        ];
        let output = format_missing(&items);
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("mksquashfs"));
        assert!(output.contains("/sbin/adddir"));
    }

    #[test]
    fn absent_absolute_tool_is_reported() {
        let tools = ToolsSection {
            adddir: PathBuf::from("/nonexistent/updrepo/adddir"),
            ..ToolsSection::default()
        };
        let missing = check_update_prereqs(&tools);
        assert!(missing
            .iter()
            .any(|m| m.name == "/nonexistent/updrepo/adddir"));
    }
}
