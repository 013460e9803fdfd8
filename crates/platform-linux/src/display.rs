//! Display/monitor detection.

use gamecap_common::error::GameCapResult;
use gamecap_platform_core::{DisplayServer, MonitorInfo};

/// Detect connected monitors.
///
/// On X11 the `xrandr --query` output is parsed. Anywhere else, or when
/// `xrandr` is unavailable, a single 1920x1080 primary monitor is assumed.
pub fn detect_monitors() -> GameCapResult<Vec<MonitorInfo>> {
    tracing::debug!("Detecting monitors");

    if detect_display_server() == DisplayServer::X11 {
        match std::process::Command::new("xrandr").arg("--query").output() {
            Ok(output) if output.status.success() => {
                let monitors = parse_xrandr(&String::from_utf8_lossy(&output.stdout));
                if !monitors.is_empty() {
                    return Ok(monitors);
                }
            }
            Ok(output) => {
                tracing::debug!(status = ?output.status, "xrandr exited unsuccessfully");
            }
            Err(e) => tracing::debug!(error = %e, "xrandr unavailable"),
        }
    }

    Ok(vec![default_monitor()])
}

fn default_monitor() -> MonitorInfo {
    MonitorInfo {
        name: "default".to_string(),
        width: 1920,
        height: 1080,
        x: 0,
        y: 0,
        refresh_rate_hz: 60,
        primary: true,
    }
}

/// Parse the connected outputs out of `xrandr --query`.
///
/// Only the header line of each output is used, e.g.
/// `DP-1 connected primary 2560x1440+0+0 (normal left inverted) 597mm x 336mm`.
/// The refresh rate comes from the mode line marked with `*`.
pub fn parse_xrandr(output: &str) -> Vec<MonitorInfo> {
    let mut monitors: Vec<MonitorInfo> = Vec::new();

    for line in output.lines() {
        if !line.starts_with(char::is_whitespace) {
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else { continue };
            if fields.next() != Some("connected") {
                continue;
            }
            let rest: Vec<&str> = fields.collect();
            let primary = rest.first() == Some(&"primary");
            let Some((width, height, x, y)) = rest.iter().find_map(|f| parse_geometry(f)) else {
                continue;
            };
            monitors.push(MonitorInfo {
                name: name.to_string(),
                width,
                height,
                x,
                y,
                refresh_rate_hz: 60,
                primary,
            });
        } else if line.contains('*') {
            if let Some(last) = monitors.last_mut() {
                if let Some(rate) = line
                    .split_whitespace()
                    .find(|f| f.contains('*'))
                    .and_then(|f| f.trim_end_matches(['*', '+']).parse::<f64>().ok())
                {
                    last.refresh_rate_hz = rate.round() as u32;
                }
            }
        }
    }

    if !monitors.is_empty() && !monitors.iter().any(|m| m.primary) {
        monitors[0].primary = true;
    }
    monitors
}

/// `WxH+X+Y` → `(w, h, x, y)`.
fn parse_geometry(field: &str) -> Option<(u32, u32, i32, i32)> {
    let (size, offsets) = field.split_once('+')?;
    let (w, h) = size.split_once('x')?;
    let (x, y) = offsets.split_once('+')?;
    Some((w.parse().ok()?, h.parse().ok()?, x.parse().ok()?, y.parse().ok()?))
}

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}
