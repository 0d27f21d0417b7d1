use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn profiles_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("rownin");
            Some(state_dir.join("profiles.json"))
        } else {
            ProjectDirs::from("", "", "rownin")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("profiles.json"))
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rownin").map(|pd| pd.config_dir().join("config.json"))
    }
}
