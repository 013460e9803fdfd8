//! Capability detection and guidance for Linux.
//!
//! GameCap needs procfs access to see new processes, and ideally the
//! privilege to follow other users' `exe` links.

use crate::display::detect_display_server;
use gamecap_platform_core::DisplayServer;

/// A system capability that GameCap may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_procfs_access(),
        check_privileged_resolution(),
        check_display_access(),
        check_gstreamer_tools(),
    ]
}

/// Check that the process table is readable.
fn check_procfs_access() -> Capability {
    let available = std::fs::read_dir(crate::procfs::PROC_ROOT).is_ok();

    Capability {
        name: "Process Table".to_string(),
        description: "procfs access for game launch detection".to_string(),
        available,
        required: true,
        fix_instructions: if !available {
            Some("Mount procfs at /proc (mount -t proc proc /proc)".to_string())
        } else {
            None
        },
    }
}

/// Check whether `exe` links of other processes can be followed.
fn check_privileged_resolution() -> Capability {
    let uid = unsafe { libc::geteuid() };
    let ptrace_scope = std::fs::read_to_string("/proc/sys/kernel/yama/ptrace_scope")
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let available = uid == 0 || ptrace_scope == 0;

    Capability {
        name: "Privileged Path Resolution".to_string(),
        description: "Follow /proc/<pid>/exe for precise executable paths".to_string(),
        available,
        required: false, // cmdline-based resolution is the fallback
        fix_instructions: if !available {
            Some(
                "Run as root or set kernel.yama.ptrace_scope=0; cmdline resolution is used otherwise"
                    .to_string(),
            )
        } else {
            None
        },
    }
}

/// Check for a display that the capture engine can grab.
fn check_display_access() -> Capability {
    let server = detect_display_server();
    let available = server == DisplayServer::X11;

    Capability {
        name: "X11 Display".to_string(),
        description: "X11 session for ximagesrc display capture".to_string(),
        available,
        required: true,
        fix_instructions: match server {
            DisplayServer::Wayland => {
                Some("Run under XWayland with DISPLAY set, or log into an X11 session".to_string())
            }
            DisplayServer::X11 => None,
            _ => Some("Start GameCap from a graphical session".to_string()),
        },
    }
}

/// Check for the GStreamer plugins used by the display engine.
fn check_gstreamer_tools() -> Capability {
    let available = std::process::Command::new("gst-inspect-1.0")
        .args(["ximagesrc"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    Capability {
        name: "GStreamer Plugins".to_string(),
        description: "ximagesrc, x264enc, and matroskamux elements".to_string(),
        available,
        required: true,
        fix_instructions: if !available {
            Some(
                "Install plugins: sudo apt install gstreamer1.0-plugins-good gstreamer1.0-plugins-ugly"
                    .to_string(),
            )
        } else {
            None
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("GameCap System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
