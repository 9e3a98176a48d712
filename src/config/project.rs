// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    pads::{default_pads, Pad},
    sequencer::{Pattern, SessionState, Transport},
};

use super::error::ConfigError;

/// A project file: pads, pattern, transport and the sample files loaded into the pads.
/// Field names are camelCase, matching the pad, pattern and transport wire shapes.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// The name of the project.
    name: String,

    /// The pads. Defaults to the standard roster.
    #[serde(default = "default_pads")]
    pads: Vec<Pad>,

    /// The step pattern. Defaults to an empty pattern the length of the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<Pattern>,

    /// Tempo and resolution.
    #[serde(default)]
    transport: Transport,

    /// Sample files by pad id. Relative paths are relative to the project file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    samples: BTreeMap<String, String>,

    /// The directory the project was loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Project {
    /// Creates a project from a session's state.
    pub fn new(name: &str, state: &SessionState) -> Project {
        Project {
            name: name.to_string(),
            pads: state.pads.clone(),
            pattern: Some(state.pattern.clone()),
            transport: state.transport.clone(),
            samples: BTreeMap::new(),
            base_dir: PathBuf::new(),
        }
    }

    /// Loads a project from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Project, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut project: Project = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yml::from_str(&contents)?,
            Some("json") => serde_json::from_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        project.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(project)
    }

    /// Saves the project as YAML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;
        fs::write(path, serialized).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(project = self.name, path = %path.display(), "Saved project");
        Ok(())
    }

    /// The name of the project.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pads.
    pub fn pads(&self) -> &[Pad] {
        &self.pads
    }

    /// The transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The pattern exactly as written, if any.
    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    /// Assigns a sample file to a pad.
    pub fn set_sample(&mut self, pad_id: &str, path: &str) {
        self.samples.insert(pad_id.to_string(), path.to_string());
    }

    /// Sample files by pad id, resolved against the project's directory.
    pub fn sample_paths(&self) -> Vec<(String, PathBuf)> {
        self.samples
            .iter()
            .map(|(pad_id, path)| (pad_id.clone(), self.base_dir.join(path)))
            .collect()
    }

    /// The session state this project describes. The pattern is sized to the transport.
    pub fn session_state(&self) -> SessionState {
        let transport = self.transport.clamped();
        let length = transport.pattern_length();
        let mut pattern = self
            .pattern
            .clone()
            .unwrap_or_else(|| Pattern::new(length));
        pattern.set_length(length);

        SessionState {
            pads: self.pads.clone(),
            pattern,
            transport,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PROJECT: &str = r##"
name: Boom Bap
transport:
  bpm: 92
  stepsPerBar: 16
  bars: 2
  swing: 0.1
pattern:
  length: 32
  steps:
    0: [pad-0]
    4: [pad-1, pad-0]
    20: [pad-2]
pads:
  - id: pad-0
    name: Kick
    color: "#ef4444"
    gain: 1.0
    attack: 0.0
    decay: 0.4
  - id: pad-1
    name: Snare
    color: "#f59e0b"
    gain: 0.8
    attack: 0.001
    decay: 0.25
    trimEnd: 0.2
    loop: true
    muted: true
samples:
  pad-0: kick.wav
  pad-1: /samples/snare.wav
"##;

    #[test]
    fn test_load_yaml() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("boom.yaml");
        fs::write(&path, PROJECT).unwrap();

        let project = Project::load(&path).unwrap();
        assert_eq!(project.name(), "Boom Bap");
        assert_eq!(project.pads().len(), 2);
        assert_eq!(project.pads()[1].trim_end, Some(0.2));
        assert!(project.pads()[1].looping);
        assert!(project.pads()[1].muted);
        assert_eq!(project.transport().bpm, 92.0);

        let samples = project.sample_paths();
        assert_eq!(samples[0], ("pad-0".to_string(), tempdir.path().join("kick.wav")));
        assert_eq!(samples[1], ("pad-1".to_string(), PathBuf::from("/samples/snare.wav")));

        let state = project.session_state();
        assert_eq!(state.pattern.length(), 32);
        assert!(state.pattern.is_active(20, "pad-2"));
        assert_eq!(
            state.pattern.pads_at(4),
            &["pad-1".to_string(), "pad-0".to_string()]
        );
    }

    #[test]
    fn test_pattern_follows_transport() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("short.yml");
        fs::write(
            &path,
            "name: Short\ntransport: {bpm: 120, stepsPerBar: 8, bars: 1}\npattern: {length: 64, steps: {3: [pad-4]}}\n",
        )
        .unwrap();

        let state = Project::load(&path).unwrap().session_state();
        assert_eq!(state.pattern.length(), 8);
        assert!(state.pattern.is_active(3, "pad-4"));
        assert_eq!(state.pads.len(), 8);
    }

    #[test]
    fn test_out_of_range_transport_is_clamped() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("huge.yaml");
        fs::write(
            &path,
            "name: Huge\ntransport: {bpm: 400, stepsPerBar: 16, bars: 18446744073709551615}\n",
        )
        .unwrap();

        let state = Project::load(&path).unwrap().session_state();
        assert_eq!(state.transport.bars, 8);
        assert_eq!(state.transport.bpm, 200.0);
        assert_eq!(state.pattern.length(), 128);
    }

    #[test]
    fn test_defaults() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("empty.json");
        fs::write(&path, r#"{"name": "Empty"}"#).unwrap();

        let project = Project::load(&path).unwrap();
        assert!(project.pattern().is_none());
        assert!(project.sample_paths().is_empty());
        let state = project.session_state();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_save_and_reload() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut state = SessionState::default();
        state.pattern.toggle(0, "pad-0");
        state.pattern.toggle(8, "pad-3");
        state.pads[3].looping = true;

        let mut project = Project::new("Saved", &state);
        project.set_sample("pad-3", "hat.wav");
        let path = tempdir.path().join("saved.yaml");
        project.save(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("stepsPerBar"));
        assert!(contents.contains("loop: true"));

        let reloaded = Project::load(&path).unwrap();
        assert_eq!(reloaded.name(), "Saved");
        assert_eq!(reloaded.session_state(), state);
        assert_eq!(reloaded.sample_paths()[0].1, tempdir.path().join("hat.wav"));
    }

    #[test]
    fn test_errors() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("project.toml");
        fs::write(&path, "name = 'nope'").unwrap();
        assert!(matches!(
            Project::load(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            Project::load(&tempdir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));

        let path = tempdir.path().join("broken.yaml");
        fs::write(&path, "name: [unterminated").unwrap();
        assert!(matches!(Project::load(&path), Err(ConfigError::Yaml(_))));
    }
}
