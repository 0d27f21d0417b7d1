use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::session::RecordedSession;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The fixed set of profiles a rower can pick without a keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProfileColor {
    Orange,
    Green,
    Blue,
    Pink,
}

impl ProfileColor {
    pub fn hex(&self) -> &'static str {
        match self {
            ProfileColor::Orange => "#FF8C00",
            ProfileColor::Green => "#32CD32",
            ProfileColor::Blue => "#1E90FF",
            ProfileColor::Pink => "#FF69B4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ProfileColor::from_str(name, true).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub sessions: Vec<RecordedSession>,
}

impl Profile {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            sessions: Vec::new(),
        }
    }

    /// Fastest finished race, the one raced as a ghost
    pub fn best_session(&self) -> Option<&RecordedSession> {
        self.sessions.iter().min_by_key(|s| s.duration)
    }
}

pub trait ProfileStore {
    fn load(&self) -> Result<Vec<Profile>>;
    fn save(&self, profiles: &[Profile]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::profiles_path().unwrap_or_else(|| PathBuf::from("profiles.json")),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self) -> Result<Vec<Profile>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        let profiles: Vec<Profile> = serde_json::from_slice(&bytes)?;
        tracing::info!("loaded {} profiles from {}", profiles.len(), self.path.display());
        Ok(profiles)
    }

    fn save(&self, profiles: &[Profile]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(profiles)?;
        fs::write(&self.path, data)?;
        tracing::info!("saved {} profiles to {}", profiles.len(), self.path.display());
        Ok(())
    }
}

/// All known profiles plus the one currently rowing
#[derive(Debug)]
pub struct Profiles<S: ProfileStore> {
    store: S,
    profiles: Vec<Profile>,
    current: Option<usize>,
}

impl<S: ProfileStore> Profiles<S> {
    pub fn load(store: S) -> Result<Self> {
        let profiles = store.load()?;
        Ok(Self {
            store,
            profiles,
            current: None,
        })
    }

    /// Starts from no profiles without reading the store, e.g. to overwrite a damaged file
    pub fn empty(store: S) -> Self {
        Self {
            store,
            profiles: Vec::new(),
            current: None,
        }
    }

    pub fn all(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn current(&self) -> Option<&Profile> {
        self.current.map(|i| &self.profiles[i])
    }

    /// Makes `name` the current profile, creating it on first use
    pub fn select(&mut self, name: &str) -> Result<&Profile> {
        let idx = match self.profiles.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                let color = ProfileColor::from_name(name)
                    .ok_or_else(|| Error::UnknownProfile(name.to_string()))?;
                self.profiles.push(Profile::new(name, color.hex()));
                self.profiles.len() - 1
            }
        };
        self.current = Some(idx);
        let profile = &self.profiles[idx];
        tracing::info!("selected profile {} | {}", profile.name, profile.color);
        Ok(profile)
    }

    /// Appends a finished race to the current profile and persists everything
    pub fn record_session(&mut self, session: RecordedSession) -> Result<()> {
        let idx = self
            .current
            .ok_or_else(|| Error::UnknownProfile(String::new()))?;
        self.profiles[idx].sessions.push(session);
        self.store.save(&self.profiles)
    }

    /// Best session of every profile that has one, as (name, color, session)
    pub fn ghosts(&self) -> impl Iterator<Item = (&str, &str, &RecordedSession)> {
        self.profiles.iter().filter_map(|p| {
            p.best_session()
                .map(|s| (p.name.as_str(), p.color.as_str(), s))
        })
    }

    pub fn reset(&mut self) -> Result<()> {
        tracing::warn!("resetting profiles");
        self.profiles.clear();
        self.current = None;
        self.store.save(&self.profiles)
    }

    pub fn save(&self) -> Result<()> {
        self.store.save(&self.profiles)
    }
}
