use std::path::PathBuf;

/// Returns the leadboard project root directory.
///
/// Honors `LEADBOARD_ROOT`, otherwise `.leadboard` in the working directory.
pub fn leadboard_root() -> PathBuf {
    if let Ok(root) = std::env::var("LEADBOARD_ROOT") {
        PathBuf::from(root)
    } else {
        PathBuf::from(".leadboard")
    }
}

/// Per-user config file, used when no project config exists.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "leadboard", "leadboard")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Resolve the config file location.
///
/// Order: `LEADBOARD_CONFIG`, then `<root>/config.yaml` if it exists, then the
/// per-user config path. Falls back to the project path when no user config
/// directory can be determined.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LEADBOARD_CONFIG")
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }

    let project = leadboard_root().join("config.yaml");
    if project.exists() {
        return project;
    }

    user_config_path()
        .filter(|p| p.exists())
        .unwrap_or(project)
}
