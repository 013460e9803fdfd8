//! Check system capabilities.

use gamecap_platform_core::DisplayServer;
use gamecap_platform_linux::{detect_display_server, permissions};

pub fn run() -> anyhow::Result<()> {
    println!("GameCap System Check");
    println!("{}", "=".repeat(50));

    match detect_display_server() {
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        DisplayServer::Wayland => {
            println!("[WARN] Display server: Wayland (display capture needs XWayland)")
        }
        _ => println!("[WARN] Display server: Unknown"),
    }

    let monitors = gamecap_platform_linux::detect_monitors()?;
    println!("[OK] Monitors detected: {}", monitors.len());
    for m in &monitors {
        println!(
            "     {} {}x{} @ {}Hz {}",
            m.name,
            m.width,
            m.height,
            m.refresh_rate_hz,
            if m.primary { "(primary)" } else { "" }
        );
    }

    let capabilities = permissions::check_capabilities();
    println!();
    permissions::print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. GameCap is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
