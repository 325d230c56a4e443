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
use std::path::{Path, PathBuf};

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::poll::Poll;

const DEFAULT_ROOT: &str = "/";
const DEFAULT_USER: &str = "pi";
const DEFAULT_REALTIME_GROUP: &str = "realtime";
const DEFAULT_POLL_INTERVAL: &str = "200ms";
const DEFAULT_POLL_ATTEMPTS: u32 = 50;

const DEFAULT_PACKAGES: [&str; 7] = [
    "jackd2",
    "drumgizmo",
    "a2jmidid",
    "jack-tools",
    "alsa-utils",
    "wget",
    "unzip",
];
const DEFAULT_CONFLICTING_SERVICES: [&str; 7] = [
    "pulseaudio.service",
    "pulseaudio.socket",
    "pipewire.service",
    "pipewire.socket",
    "pipewire-pulse.service",
    "pipewire-pulse.socket",
    "wireplumber.service",
];
const DEFAULT_GROUPS: [&str; 2] = ["audio", "realtime"];
/// Card name fragments, most preferred first.
const DEFAULT_DEVICE_PATTERNS: [&str; 4] = ["USB", "UMC", "codec", "headphones"];

const LIMITS_PATH: &str = "/etc/security/limits.d/99-drumpi.conf";
const BIN_DIR: &str = "/usr/local/bin";
const UNIT_DIR: &str = "/etc/systemd/system";
const PLUMBING_RULES_PATH: &str = "/etc/jack-plumbing";

/// The settings for a provisioning run. Every field is optional; unset fields
/// fall back to the defaults for a stock Raspberry Pi OS install.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Settings {
    /// Prefix for every system path touched. Only useful for staging an image.
    root: Option<PathBuf>,

    /// The operating user. drumpi must be invoked by this user.
    user: Option<String>,

    /// The operating user's home directory (default: /home/<user>).
    home: Option<PathBuf>,

    /// Packages to install.
    packages: Option<Vec<String>>,

    /// Services that compete for the audio device.
    conflicting_services: Option<Vec<String>>,

    /// Groups the operating user joins. Also the groups granted realtime limits.
    groups: Option<Vec<String>>,

    /// The group created if the platform does not ship one.
    realtime_group: Option<String>,

    /// Card name fragments used to pick the audio interface, most preferred first.
    device_patterns: Option<Vec<String>>,

    /// How long to wait between readiness probes, e.g. "200ms".
    poll_interval: Option<String>,

    /// How many readiness probes to make before giving up.
    poll_attempts: Option<u32>,

    /// The sample kit.
    #[serde(default)]
    kit: Kit,

    /// The JACK server parameters.
    #[serde(default)]
    jack: Jack,
}

impl Settings {
    /// Returns a copy of the settings with every system path placed under the given root.
    pub fn with_root(mut self, root: &Path) -> Settings {
        self.root = Some(root.to_path_buf());
        self
    }

    /// Checks the values that are parsed lazily.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.poll()?;
        if self.groups().is_empty() {
            return Err(ConfigError::Invalid {
                field: "groups",
                reason: "at least one group is required".to_string(),
            });
        }
        if self.device_patterns().iter().any(|p| p.contains(' ')) {
            return Err(ConfigError::Invalid {
                field: "device_patterns",
                reason: "patterns may not contain spaces".to_string(),
            });
        }
        Ok(())
    }

    /// The root all system paths are resolved against.
    pub fn root(&self) -> &Path {
        self.root.as_deref().unwrap_or(Path::new(DEFAULT_ROOT))
    }

    /// Maps an absolute path on the provisioned system to the path drumpi operates on.
    pub fn on_root(&self, path: &Path) -> PathBuf {
        self.root().join(path.strip_prefix("/").unwrap_or(path))
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    pub fn home(&self) -> PathBuf {
        match &self.home {
            Some(home) => home.clone(),
            None => Path::new("/home").join(self.user()),
        }
    }

    pub fn packages(&self) -> Vec<String> {
        or_defaults(&self.packages, &DEFAULT_PACKAGES)
    }

    pub fn conflicting_services(&self) -> Vec<String> {
        or_defaults(&self.conflicting_services, &DEFAULT_CONFLICTING_SERVICES)
    }

    pub fn groups(&self) -> Vec<String> {
        or_defaults(&self.groups, &DEFAULT_GROUPS)
    }

    pub fn realtime_group(&self) -> &str {
        self.realtime_group
            .as_deref()
            .unwrap_or(DEFAULT_REALTIME_GROUP)
    }

    pub fn device_patterns(&self) -> Vec<String> {
        or_defaults(&self.device_patterns, &DEFAULT_DEVICE_PATTERNS)
    }

    /// Returns the readiness poll parameters.
    pub fn poll(&self) -> Result<Poll, ConfigError> {
        let interval = self
            .poll_interval
            .as_deref()
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let interval = DurationString::from_string(interval.to_string()).map_err(|e| {
            ConfigError::Invalid {
                field: "poll_interval",
                reason: e.to_string(),
            }
        })?;
        Ok(Poll::new(
            interval.into(),
            self.poll_attempts.unwrap_or(DEFAULT_POLL_ATTEMPTS),
        ))
    }

    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    pub fn jack(&self) -> &Jack {
        &self.jack
    }

    /// The kit directory as seen by the provisioned system.
    pub fn kit_dir(&self) -> PathBuf {
        match &self.kit.directory {
            Some(directory) => directory.clone(),
            None => self.home().join("drumgizmo").join(&self.kit.name),
        }
    }

    pub fn kit_descriptor(&self) -> PathBuf {
        self.kit_dir().join(&self.kit.descriptor)
    }

    pub fn kit_midimap(&self) -> PathBuf {
        self.kit_dir().join(&self.kit.midimap)
    }

    pub fn limits_path(&self) -> PathBuf {
        PathBuf::from(LIMITS_PATH)
    }

    pub fn start_jack_path(&self) -> PathBuf {
        Path::new(BIN_DIR).join("drumpi-start-jack")
    }

    pub fn start_drumgizmo_path(&self) -> PathBuf {
        Path::new(BIN_DIR).join("drumpi-start-drumgizmo")
    }

    pub fn unit_path(&self, unit: &str) -> PathBuf {
        Path::new(UNIT_DIR).join(unit)
    }

    pub fn plumbing_rules_path(&self) -> PathBuf {
        PathBuf::from(PLUMBING_RULES_PATH)
    }
}

fn or_defaults(value: &Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(value) => value.clone(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

/// The sample kit to install.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Kit {
    /// The kit name. Also the default kit directory name.
    name: String,
    /// Where the kit archive is downloaded from.
    url: String,
    /// The file name the archive is downloaded to.
    archive: String,
    /// The kit descriptor file name.
    descriptor: String,
    /// The MIDI map file name.
    midimap: String,
    /// Overrides the kit directory (default: <home>/drumgizmo/<name>).
    directory: Option<PathBuf>,
}

impl Default for Kit {
    fn default() -> Self {
        Kit {
            name: "DRSKit".to_string(),
            url: "https://drumgizmo.org/kits/DRSKit/DRSKit2_1.zip".to_string(),
            archive: "DRSKit2_1.zip".to_string(),
            descriptor: "DRSKit_full.xml".to_string(),
            midimap: "Midimap_full.xml".to_string(),
            directory: None,
        }
    }
}

impl Kit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn archive(&self) -> &str {
        &self.archive
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn midimap(&self) -> &str {
        &self.midimap
    }
}

/// JACK server parameters.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Jack {
    sample_rate: u32,
    /// Frames per period.
    period: u32,
    periods: u32,
    /// Realtime priority of the JACK server.
    priority: u32,
    /// The realtime priority ceiling granted to the audio groups.
    rtprio_limit: u32,
    /// The port whose presence means the server is ready for clients.
    ready_port: String,
}

impl Default for Jack {
    fn default() -> Self {
        Jack {
            sample_rate: 48000,
            period: 512,
            periods: 3,
            priority: 75,
            rtprio_limit: 95,
            ready_port: "system:playback_1".to_string(),
        }
    }
}

impl Jack {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn periods(&self) -> u32 {
        self.periods
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn rtprio_limit(&self) -> u32 {
        self.rtprio_limit
    }

    pub fn ready_port(&self) -> &str {
        &self.ready_port
    }
}
