use std::env;
use std::path::{Path, PathBuf};
use which::which;

/// Executable names probed on `PATH` for a named engine.
pub fn engine_executable_names(engine: &str) -> &'static [&'static str] {
    match engine.trim().to_ascii_lowercase().as_str() {
        "chromium" => &["chromium", "chromium-browser"],
        "chrome" => {
            #[cfg(target_os = "windows")]
            {
                &["chrome.exe"]
            }
            #[cfg(not(target_os = "windows"))]
            {
                &["google-chrome-stable", "google-chrome", "chrome"]
            }
        }
        "edge" => &["microsoft-edge-stable", "microsoft-edge", "msedge"],
        "brave" => &["brave-browser", "brave"],
        _ => &[],
    }
}

/// Locate the executable for `engine`.
///
/// `MENUPROBE_<ENGINE>_PATH` wins, then an engine value that is itself a path,
/// then the `PATH` lookup.
pub fn resolve_engine(engine: &str) -> Option<PathBuf> {
    let trimmed = engine.trim();
    if trimmed.is_empty() {
        return None;
    }
    let var = format!(
        "MENUPROBE_{}_PATH",
        trimmed.to_ascii_uppercase().replace(|ch: char| !ch.is_ascii_alphanumeric(), "_")
    );
    if let Ok(raw) = env::var(&var) {
        let candidate = PathBuf::from(raw.trim());
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let as_path = Path::new(trimmed);
    if as_path.components().count() > 1 && as_path.exists() {
        return Some(as_path.to_path_buf());
    }

    engine_executable_names(trimmed)
        .iter()
        .find_map(|name| which(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_engines_have_candidates() {
        for engine in ["chromium", "Chrome", "edge", "brave"] {
            assert!(!engine_executable_names(engine).is_empty(), "{engine}");
        }
        assert!(engine_executable_names("webkit").is_empty());
    }

    #[test]
    fn blank_engine_resolves_to_nothing() {
        assert!(resolve_engine("  ").is_none());
    }

    #[test]
    fn explicit_path_is_accepted() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = resolve_engine(file.path().to_str().unwrap());
        assert_eq!(resolved.as_deref(), Some(file.path()));
    }
}
