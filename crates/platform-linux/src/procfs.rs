//! Process inspection through `/proc`.
//!
//! Two executable-path strategies are provided:
//! - [`ProcExeQuery`] reads the `/proc/<pid>/exe` link. This needs the same
//!   uid as the target or `CAP_SYS_PTRACE`, so it is the privileged path.
//! - [`ProcCmdlineQuery`] reads world-readable `cmdline`, `comm`, and `cwd`
//!   data instead. Wine/Proton processes report their Windows path here.

use std::path::{Path, PathBuf};

use gamecap_common::error::{GameCapError, GameCapResult};
use gamecap_platform_core::{
    MonitorInfo, PathQuery, ProcessInspector, WindowHandle, WindowInfo, WindowProbe,
};

/// Default procfs mount point.
pub const PROC_ROOT: &str = "/proc";

/// Privileged strategy: follow the `exe` link.
#[derive(Debug, Clone)]
pub struct ProcExeQuery {
    root: PathBuf,
}

impl ProcExeQuery {
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcExeQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PathQuery for ProcExeQuery {
    fn name(&self) -> &str {
        "proc-exe"
    }

    fn query(&self, pid: u32) -> GameCapResult<PathBuf> {
        let link = self.root.join(pid.to_string()).join("exe");
        let target = std::fs::read_link(&link)
            .map_err(|e| GameCapError::process_resolution(pid, format!("{}: {e}", link.display())))?;

        // The kernel appends " (deleted)" when the binary was replaced on disk.
        let raw = target.to_string_lossy();
        let trimmed = raw.strip_suffix(" (deleted)").unwrap_or(&raw);
        Ok(PathBuf::from(trimmed))
    }
}

/// Unprivileged strategy: read `cmdline`, then `comm` relative to `cwd`.
#[derive(Debug, Clone)]
pub struct ProcCmdlineQuery {
    root: PathBuf,
}

impl ProcCmdlineQuery {
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcCmdlineQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PathQuery for ProcCmdlineQuery {
    fn name(&self) -> &str {
        "proc-cmdline"
    }

    fn query(&self, pid: u32) -> GameCapResult<PathBuf> {
        let dir = self.root.join(pid.to_string());

        if let Some(argv0) = read_argv0(&dir) {
            if is_absolute_any(&argv0) {
                return Ok(PathBuf::from(argv0));
            }
            if argv0.contains('/') {
                if let Ok(cwd) = std::fs::read_link(dir.join("cwd")) {
                    return Ok(cwd.join(argv0));
                }
            }
        }

        let comm = read_comm(&dir).ok_or_else(|| {
            GameCapError::process_resolution(pid, "no readable cmdline or comm entry")
        })?;
        let cwd = std::fs::read_link(dir.join("cwd")).map_err(|e| {
            GameCapError::process_resolution(pid, format!("only a bare name ({comm}) is readable: {e}"))
        })?;
        Ok(cwd.join(comm))
    }
}

/// First NUL-separated argument of `/proc/<pid>/cmdline`.
fn read_argv0(dir: &Path) -> Option<String> {
    let bytes = std::fs::read(dir.join("cmdline")).ok()?;
    let first = bytes.split(|b| *b == 0).next()?;
    if first.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(first).into_owned())
}

fn read_comm(dir: &Path) -> Option<String> {
    let comm = std::fs::read_to_string(dir.join("comm")).ok()?;
    let comm = comm.trim();
    (!comm.is_empty()).then(|| comm.to_string())
}

/// Absolute in either POSIX or Windows (`C:\`) form.
fn is_absolute_any(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcEntry {
    pub pid: u32,
    pub name: String,
}

/// List live processes under a procfs root.
pub fn list_processes(root: &Path) -> std::io::Result<Vec<ProcEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(root)?.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let dir = entry.path();
        if is_zombie(&dir) {
            continue;
        }
        let name = read_comm(&dir).unwrap_or_default();
        entries.push(ProcEntry { pid, name });
    }
    entries.sort_by_key(|e| e.pid);
    Ok(entries)
}

/// `/proc/<pid>/stat` state field is `Z` for zombies.
fn is_zombie(dir: &Path) -> bool {
    let Ok(stat) = std::fs::read_to_string(dir.join("stat")) else {
        return false;
    };
    // The command name is parenthesised and may contain spaces.
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|state| state == "Z")
        .unwrap_or(false)
}

/// [`ProcessInspector`] backed by procfs.
///
/// Linux has no portable way to enumerate a process's windows without a
/// display-server client, so window probing reports `Unsupported` and the
/// recorder falls back to display geometry.
#[derive(Debug, Clone)]
pub struct ProcInspector {
    root: PathBuf,
}

impl ProcInspector {
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInspector for ProcInspector {
    fn is_running(&self, pid: u32) -> bool {
        let dir = self.root.join(pid.to_string());
        dir.exists() && !is_zombie(&dir)
    }

    fn main_window(&self, _pid: u32) -> WindowProbe {
        WindowProbe::Unsupported
    }

    fn window_details(&self, _window: WindowHandle) -> Option<WindowInfo> {
        None
    }

    fn window_process(&self, _window: WindowHandle) -> Option<u32> {
        None
    }

    fn primary_display(&self) -> Option<MonitorInfo> {
        let monitors = crate::display::detect_monitors().ok()?;
        monitors
            .iter()
            .find(|m| m.primary)
            .cloned()
            .or_else(|| monitors.first().cloned())
    }

    fn find_process(&self, executable: &Path) -> Option<u32> {
        let exe_query = ProcExeQuery::with_root(&self.root);
        let cmdline_query = ProcCmdlineQuery::with_root(&self.root);
        let entries = list_processes(&self.root).ok()?;
        entries.into_iter().map(|e| e.pid).find(|pid| {
            exe_query.query(*pid).ok().as_deref() == Some(executable)
                || cmdline_query.query(*pid).ok().as_deref() == Some(executable)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_process(root: &Path, pid: u32, cmdline: &[u8], comm: &str) -> PathBuf {
        let dir = root.join(pid.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cmdline"), cmdline).unwrap();
        std::fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
        std::fs::write(dir.join("stat"), format!("{pid} ({comm}) S 1 1 1")).unwrap();
        dir
    }

    #[test]
    fn exe_link_is_followed_and_deleted_suffix_trimmed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = fake_process(tmp.path(), 42, b"game\0", "game");
        std::os::unix::fs::symlink("/opt/games/game (deleted)", dir.join("exe")).unwrap();

        let path = ProcExeQuery::with_root(tmp.path()).query(42).unwrap();
        assert_eq!(path, PathBuf::from("/opt/games/game"));
    }

    #[test]
    fn exe_query_fails_without_link() {
        let tmp = tempfile::tempdir().unwrap();
        fake_process(tmp.path(), 7, b"x\0", "x");
        let err = ProcExeQuery::with_root(tmp.path()).query(7).unwrap_err();
        assert!(matches!(err, GameCapError::ProcessResolution { pid: 7, .. }));
    }

    #[test]
    fn cmdline_accepts_windows_absolute_argv0() {
        let tmp = tempfile::tempdir().unwrap();
        fake_process(
            tmp.path(),
            100,
            b"Z:\\steamapps\\common\\Hades\\Hades.exe\0-dx12\0",
            "Hades.exe",
        );
        let path = ProcCmdlineQuery::with_root(tmp.path()).query(100).unwrap();
        assert_eq!(path, PathBuf::from("Z:\\steamapps\\common\\Hades\\Hades.exe"));
    }

    #[test]
    fn cmdline_falls_back_to_comm_under_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = fake_process(tmp.path(), 5, b"", "celeste");
        std::os::unix::fs::symlink("/games/Celeste", dir.join("cwd")).unwrap();

        let path = ProcCmdlineQuery::with_root(tmp.path()).query(5).unwrap();
        assert_eq!(path, PathBuf::from("/games/Celeste/celeste"));
    }

    #[test]
    fn listing_skips_zombies_and_non_numeric_entries() {
        let tmp = tempfile::tempdir().unwrap();
        fake_process(tmp.path(), 10, b"a\0", "alive");
        let zombie = fake_process(tmp.path(), 11, b"", "dead");
        std::fs::write(zombie.join("stat"), "11 (dead proc) Z 1 1 1").unwrap();
        std::fs::create_dir_all(tmp.path().join("self")).unwrap();

        let entries = list_processes(tmp.path()).unwrap();
        assert_eq!(
            entries,
            vec![ProcEntry {
                pid: 10,
                name: "alive".to_string()
            }]
        );

        let inspector = ProcInspector::with_root(tmp.path());
        assert!(inspector.is_running(10));
        assert!(!inspector.is_running(11));
        assert!(!inspector.is_running(12));
        assert_eq!(inspector.main_window(10), WindowProbe::Unsupported);
    }

    #[test]
    fn find_process_matches_cmdline_path() {
        let tmp = tempfile::tempdir().unwrap();
        fake_process(tmp.path(), 300, b"/opt/games/celeste\0", "celeste");
        let inspector = ProcInspector::with_root(tmp.path());
        assert_eq!(
            inspector.find_process(Path::new("/opt/games/celeste")),
            Some(300)
        );
        assert_eq!(inspector.find_process(Path::new("/opt/other")), None);
    }
}
