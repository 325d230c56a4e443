// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::path::Path;

use config::{Config, Environment, File};
use tracing::info;

pub mod error;
pub mod identity;
mod settings;

pub use self::error::ConfigError;
pub use self::settings::{Jack, Kit, Settings};

/// Read when no settings file is given on the command line. Optional.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/drumpi.yaml";

/// Prefix for environment overrides, e.g. DRUMPI_USER or DRUMPI_KIT__URL.
const ENV_PREFIX: &str = "DRUMPI";

/// Settings given as space-separated lists in the environment.
const LIST_KEYS: [&str; 4] = [
    "packages",
    "conflicting_services",
    "groups",
    "device_patterns",
];

/// Loads the settings, layering (lowest priority first) the built-in defaults,
/// the settings file and DRUMPI_* environment variables.
///
/// An explicitly given settings file must exist; the default one may be absent.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::from(Path::new(DEFAULT_SETTINGS_PATH)).required(false),
    };

    let environment = LIST_KEYS.iter().fold(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(" "),
        |environment, key| environment.with_list_parse_key(key),
    );

    let settings: Settings = Config::builder()
        .add_source(file)
        .add_source(environment)
        .build()?
        .try_deserialize()?;
    settings.validate()?;

    info!(
        user = settings.user(),
        root = %settings.root().display(),
        kit = settings.kit().name(),
        "Loaded settings."
    );
    Ok(settings)
}
