//! Named-profile persistence: one JSON object `{ name -> profile }` on disk,
//! replaced atomically on every write.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use eyre::WrapErr;

use crate::error::{Result, SliderError};
use crate::profile::MotionProfile;

/// Store handle. Concurrent preset writes are rare and small, so a plain
/// in-process mutex around read-modify-write is sufficient.
#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PresetStore {
    /// Open the store, creating an empty file (and parent directories) on
    /// first run.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("create preset dir {parent:?}"))?;
            }
            store.persist(&BTreeMap::new())?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All presets, name-ordered. Profiles are returned as stored; callers
    /// that execute one must go through [`PresetStore::get`].
    pub fn list(&self) -> Result<BTreeMap<String, MotionProfile>> {
        let _g = self.lock.lock().map_err(|_| SliderError::Preset("store lock poisoned".into()))?;
        self.read_all()
    }

    /// Fetch one preset, re-validated so a hand-edited file cannot smuggle an
    /// invalid profile to the worker.
    pub fn get(&self, name: &str) -> Result<Option<MotionProfile>> {
        let _g = self.lock.lock().map_err(|_| SliderError::Preset("store lock poisoned".into()))?;
        match self.read_all()?.remove(name) {
            Some(profile) => {
                let profile = profile
                    .validated()
                    .map_err(|e| SliderError::Preset(format!("preset {name:?}: {e}")))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    pub fn save(&self, name: &str, profile: &MotionProfile) -> Result<()> {
        let _g = self.lock.lock().map_err(|_| SliderError::Preset("store lock poisoned".into()))?;
        let mut all = self.read_all()?;
        all.insert(name.to_string(), profile.clone());
        self.persist(&all)
    }

    /// Remove a preset; returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let _g = self.lock.lock().map_err(|_| SliderError::Preset("store lock poisoned".into()))?;
        let mut all = self.read_all()?;
        let existed = all.remove(name).is_some();
        if existed {
            self.persist(&all)?;
        }
        Ok(existed)
    }

    fn read_all(&self) -> Result<BTreeMap<String, MotionProfile>> {
        let bytes = std::fs::read(&self.path)
            .wrap_err_with(|| format!("read preset store {:?}", self.path))?;
        let map = serde_json::from_slice(&bytes)
            .map_err(|e| SliderError::Preset(format!("parse {:?}: {e}", self.path)))?;
        Ok(map)
    }

    /// Full-file replace: serialize into a staging sibling, fsync it, then
    /// rename over the store so readers never observe a half-written file.
    fn persist(&self, all: &BTreeMap<String, MotionProfile>) -> Result<()> {
        let staged = self.staged_path();
        let file = std::fs::File::create(&staged)
            .wrap_err_with(|| format!("create {staged:?}"))?;
        serde_json::to_writer_pretty(&file, all)
            .map_err(|e| SliderError::Preset(format!("encode {staged:?}: {e}")))?;
        file.sync_all()
            .wrap_err_with(|| format!("sync {staged:?}"))?;
        drop(file);
        std::fs::rename(&staged, &self.path)
            .wrap_err_with(|| format!("replace preset store {:?}", self.path))?;
        Ok(())
    }

    /// Staging file beside the store (`presets.json.staged`): appending keeps
    /// the `.json` extension intact and the rename on one filesystem.
    fn staged_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| OsString::from("presets.json"));
        name.push(".staged");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Ease;
    use crate::profile::Keyframe;

    fn sweep() -> MotionProfile {
        MotionProfile {
            length_mm: 500.0,
            keyframes: vec![
                Keyframe {
                    t: 0.0,
                    pos_mm: 0.0,
                    ease: Ease::Linear,
                },
                Keyframe {
                    t: 2.0,
                    pos_mm: 100.0,
                    ease: Ease::Linear,
                },
            ],
            max_speed_mm_s: 120.0,
            max_accel_mm_s2: 300.0,
        }
    }

    #[test]
    fn open_creates_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("presets.json");
        let store = PresetStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn save_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::open(dir.path().join("presets.json")).unwrap();
        let p = sweep();
        store.save("sunset", &p).unwrap();
        store.save("dolly", &p).unwrap();
        // The staging sibling is consumed by the rename, never left behind.
        assert!(!dir.path().join("presets.json.staged").exists());

        let names: Vec<_> = store.list().unwrap().into_keys().collect();
        assert_eq!(names, vec!["dolly".to_string(), "sunset".to_string()]);
        assert_eq!(store.get("sunset").unwrap(), Some(p.clone()));
        assert_eq!(store.get("nope").unwrap(), None);

        assert!(store.delete("sunset").unwrap());
        assert!(!store.delete("sunset").unwrap());
        assert_eq!(store.get("sunset").unwrap(), None);
    }

    #[test]
    fn hand_edited_invalid_preset_is_rejected_on_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let store = PresetStore::open(&path).unwrap();
        std::fs::write(
            &path,
            r#"{"bad":{"length_mm":100,"keyframes":[{"t":0,"pos_mm":0}],"max_speed_mm_s":50,"max_accel_mm_s2":100}}"#,
        )
        .unwrap();
        assert!(store.get("bad").is_err());
        // listing still works; only execution-bound fetches enforce validity
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_store_surfaces_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let store = PresetStore::open(&path).unwrap();
        std::fs::write(&path, b"not json").unwrap();
        assert!(store.list().is_err());
    }
}
