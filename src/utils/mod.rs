use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::config::Config;

/// Locate an executable without spawning it. A bare name is searched on
/// PATH; anything with a path separator is checked directly.
pub fn resolve_binary(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Startup check for external tools. Returns human-readable warnings; an
/// empty list means everything needed is available.
pub fn check_dependencies(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();
    if resolve_binary(&config.extraction.binary).is_none() {
        warnings.push(format!(
            "'{}' was not found on PATH. Video files cannot be processed; audio files still work.",
            config.extraction.binary
        ));
    }
    warnings
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Generate a unique filename with timestamp
pub fn generate_unique_filename(base_name: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let random_suffix = Uuid::new_v4().to_string()[..8].to_string();

    format!(
        "{}_{}_{}_{}.{}",
        "postscribe",
        sanitize_filename(base_name),
        timestamp,
        random_suffix,
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_resolve_binary_finds_tools_on_path() {
        assert!(resolve_binary("sh").is_some());
    }

    #[test]
    fn test_resolve_binary_misses_unknown_tools() {
        assert!(resolve_binary("postscribe-no-such-tool").is_none());
    }

    #[test]
    fn test_resolve_binary_accepts_explicit_paths() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tool");
        fs_err::write(&path, "#!/bin/sh\n").unwrap();

        assert_eq!(
            resolve_binary(&path.to_string_lossy()),
            Some(path.clone())
        );
        assert!(resolve_binary(&temp.path().join("absent").to_string_lossy()).is_none());
    }

    #[test]
    fn test_check_dependencies_reports_a_missing_encoder() {
        let mut config = Config::default();
        config.extraction.binary = "postscribe-no-such-tool".to_string();

        let warnings = check_dependencies(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("postscribe-no-such-tool"));
    }

    #[cfg(unix)]
    #[test]
    fn test_check_dependencies_passes_with_an_available_binary() {
        let mut config = Config::default();
        config.extraction.binary = "sh".to_string();
        assert!(check_dependencies(&config).is_empty());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my video.mp4"), "my video.mp4");
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
        assert_eq!(sanitize_filename("  padded.mp4  "), "padded.mp4");
    }

    #[test]
    fn test_generate_unique_filename_varies() {
        let first = generate_unique_filename("talk", "mp3");
        let second = generate_unique_filename("talk", "mp3");

        assert!(first.starts_with("postscribe_talk_"));
        assert!(first.ends_with(".mp3"));
        assert_ne!(first, second);
    }
}
