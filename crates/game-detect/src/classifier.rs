//! Game classification by install location.
//!
//! An executable is a game when its path runs through a known game-library
//! root such as `steamapps/common`. The display name comes from the
//! launcher's install manifests when one maps the install folder to a human
//! name, otherwise from the executable's file name.

use std::path::{Path, PathBuf};

use gamecap_common::config::DetectionConfig;
use serde::Deserialize;

/// Where install manifests for a library marker live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// No manifests; fallback naming only.
    None,
    /// Steam `appmanifest_*.acf` files in the `steamapps` directory the
    /// marker sits under.
    SteamApps,
    /// Epic launcher `.item` JSON files in a fixed directory.
    EpicItems(PathBuf),
}

/// A path segment identifying a game-library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryMarker {
    pub segment: String,
    pub manifests: ManifestSource,
}

impl LibraryMarker {
    pub fn new(segment: impl Into<String>, manifests: ManifestSource) -> Self {
        Self {
            segment: segment.into(),
            manifests,
        }
    }
}

/// Result of classifying an executable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_game: bool,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct GameClassifier {
    markers: Vec<LibraryMarker>,
}

/// A marker hit inside a normalized path.
struct MarkerMatch<'a> {
    marker: &'a LibraryMarker,
    /// Normalized path up to (not including) the marker.
    prefix: String,
    /// First component after the marker, if the executable is nested.
    install_dir: Option<String>,
}

impl GameClassifier {
    pub fn new(markers: Vec<LibraryMarker>) -> Self {
        Self { markers }
    }

    /// Built-in Steam and Epic markers plus any configured extras.
    pub fn from_config(config: &DetectionConfig) -> Self {
        let epic = config
            .epic_manifest_dir
            .clone()
            .map_or(ManifestSource::None, ManifestSource::EpicItems);
        let mut markers = vec![
            LibraryMarker::new("steamapps/common", ManifestSource::SteamApps),
            LibraryMarker::new("Epic Games", epic),
        ];
        markers.extend(
            config
                .extra_library_markers
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| LibraryMarker::new(s.trim(), ManifestSource::None)),
        );
        Self { markers }
    }

    pub fn markers(&self) -> &[LibraryMarker] {
        &self.markers
    }

    /// Classify `path`. Never fails; unreadable manifests fall back to the
    /// file-name display name.
    pub fn classify(&self, path: &Path) -> Classification {
        let fallback = fallback_name(path);
        let normalized = normalize(path);

        let Some(hit) = self.find_marker(&normalized) else {
            return Classification {
                is_game: false,
                display_name: fallback,
            };
        };

        let mut candidates = Vec::with_capacity(2);
        if let Some(dir) = hit.install_dir.clone() {
            candidates.push(dir);
        }
        if let Some(parent) = parent_folder(&normalized) {
            if !candidates.iter().any(|c| c.eq_ignore_ascii_case(&parent)) {
                candidates.push(parent);
            }
        }

        let display_name = lookup_manifest_name(hit.marker, &hit.prefix, &candidates)
            .unwrap_or(fallback);
        tracing::trace!(
            path = %path.display(),
            marker = %hit.marker.segment,
            name = %display_name,
            "Executable classified as game"
        );
        Classification {
            is_game: true,
            display_name,
        }
    }

    fn find_marker<'a>(&'a self, normalized: &str) -> Option<MarkerMatch<'a>> {
        let lowered = normalized.to_ascii_lowercase();
        self.markers.iter().find_map(|marker| {
            let segment = marker.segment.replace('\\', "/").to_ascii_lowercase();
            let segment = segment.trim_matches('/');
            if segment.is_empty() {
                return None;
            }
            let start = find_segment(&lowered, segment)?;
            let rest = &normalized[start + segment.len()..];
            let mut components = rest.split('/').filter(|c| !c.is_empty());
            let first = components.next();
            // A bare executable directly under the root has no install folder.
            let install_dir = first
                .filter(|_| components.next().is_some())
                .map(str::to_string);
            Some(MarkerMatch {
                marker,
                prefix: normalized[..start].to_string(),
                install_dir,
            })
        })
    }
}

/// Byte offset of `segment` in `haystack` where it starts and ends on path
/// component boundaries. Both inputs are ASCII-lowercased, which keeps byte
/// offsets aligned with the original path.
fn find_segment(haystack: &str, segment: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.match_indices(segment).map(|(i, _)| i).find(|&i| {
        let end = i + segment.len();
        let starts_clean = i == 0 || bytes[i - 1] == b'/';
        let ends_clean = end == bytes.len() || bytes[end] == b'/';
        starts_clean && ends_clean
    })
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn parent_folder(normalized: &str) -> Option<String> {
    let mut components = normalized.rsplit('/').filter(|c| !c.is_empty());
    components.next()?;
    components.next().map(str::to_string)
}

/// File name without extension, `_ - .` turned into spaces, whitespace
/// collapsed.
pub fn fallback_name(path: &Path) -> String {
    let normalized = normalize(path);
    let file = normalized
        .rsplit('/')
        .find(|c| !c.is_empty())
        .unwrap_or_default();
    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    let spaced: String = stem
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
        .collect();
    let name = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        file.to_string()
    } else {
        name
    }
}

fn lookup_manifest_name(
    marker: &LibraryMarker,
    prefix: &str,
    candidates: &[String],
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    match &marker.manifests {
        ManifestSource::None => None,
        ManifestSource::SteamApps => {
            let steamapps = PathBuf::from(format!("{prefix}steamapps"));
            scan_manifests(&steamapps, |path| {
                let name = path.file_name()?.to_str()?;
                if !(name.starts_with("appmanifest_") && name.ends_with(".acf")) {
                    return None;
                }
                parse_acf(&std::fs::read_to_string(path).ok()?)
            }, candidates)
        }
        ManifestSource::EpicItems(dir) => scan_manifests(
            dir,
            |path| {
                if path.extension().and_then(|e| e.to_str()) != Some("item") {
                    return None;
                }
                parse_epic_item(&std::fs::read_to_string(path).ok()?)
            },
            candidates,
        ),
    }
}

/// Read every manifest in `dir` and return the display name whose install
/// folder matches a candidate. Earlier candidates take priority; entries are
/// visited in sorted order so results do not depend on directory order.
fn scan_manifests(
    dir: &Path,
    parse: impl Fn(&Path) -> Option<(String, String)>,
    candidates: &[String],
) -> Option<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Manifest directory unreadable");
            return None;
        }
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    let mappings: Vec<(String, String)> = paths.iter().filter_map(|p| parse(p)).collect();
    candidates.iter().find_map(|candidate| {
        mappings
            .iter()
            .find(|(install_dir, _)| install_dir.eq_ignore_ascii_case(candidate))
            .map(|(_, name)| name.clone())
    })
}

/// Extract `(installdir, name)` from a Steam app manifest.
fn parse_acf(content: &str) -> Option<(String, String)> {
    let value_of = |key: &str| {
        content.lines().find_map(|line| {
            let mut fields = line.split('"');
            fields.next()?;
            let k = fields.next()?;
            if !k.eq_ignore_ascii_case(key) {
                return None;
            }
            fields.next()?;
            fields.next().map(str::to_string)
        })
    };
    let install_dir = value_of("installdir")?;
    let name = value_of("name")?;
    (!install_dir.is_empty() && !name.is_empty()).then_some((install_dir, name))
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EpicItem {
    display_name: Option<String>,
    install_location: Option<String>,
}

/// Extract `(install folder, DisplayName)` from an Epic `.item` manifest.
fn parse_epic_item(content: &str) -> Option<(String, String)> {
    let item: EpicItem = serde_json::from_str(content).ok()?;
    let location = item.install_location?.replace('\\', "/");
    let folder = location.rsplit('/').find(|c| !c.is_empty())?.to_string();
    let name = item.display_name.filter(|n| !n.is_empty())?;
    Some((folder, name))
}
