/*
 * Responsibility
 * - Service version (from the package) and build tag (from a deploy marker file)
 * - The marker is `../buildtag.<tag>` relative to the working directory
 */
use std::path::Path;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const UNKNOWN_BUILD: &str = "unknown";

const BUILD_TAG_PREFIX: &str = "buildtag.";

/// Build tag for the running process, or "unknown".
pub fn build_tag() -> String {
    build_tag_in(Path::new("..")).unwrap_or_else(|| UNKNOWN_BUILD.to_string())
}

/// Exactly one `buildtag.*` entry in `dir` yields its suffix; zero or several yield `None`.
pub fn build_tag_in(dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;

    let mut tags = entries.filter_map(|entry| {
        let name = entry.ok()?.file_name().into_string().ok()?;
        name.strip_prefix(BUILD_TAG_PREFIX).map(str::to_string)
    });

    match (tags.next(), tags.next()) {
        (Some(tag), None) => Some(tag),
        _ => None,
    }
}
