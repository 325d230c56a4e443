// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
    collections::HashMap,
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::config::{ConfigError, Settings};
use crate::error::ProvisionError;

pub mod templates;

/// The service units drumpi writes, in the order they are enabled.
pub const SERVICES: [&str; 3] = ["jackd.service", "drumgizmo.service", "jack-plumbing.service"];

const EXECUTABLE_MODE: u32 = 0o755;
const REGULAR_MODE: u32 = 0o644;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{template}' has no value for placeholder '{placeholder}'")]
    Unresolved {
        template: &'static str,
        placeholder: String,
    },

    #[error("template '{template}' has an unterminated placeholder")]
    Unterminated { template: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A file body with `{{name}}` substitution points.
#[derive(Clone, Copy, Debug)]
pub struct Template {
    name: &'static str,
    body: &'static str,
}

impl Template {
    pub const fn new(name: &'static str, body: &'static str) -> Template {
        Template { name, body }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Substitutes every placeholder. A placeholder without a value is an error,
    /// values without a placeholder are ignored.
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(self.body.len());
        let mut rest = self.body;

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(TemplateError::Unterminated {
                    template: self.name,
                });
            };
            let placeholder = after[..end].trim();
            match values.get(placeholder) {
                Some(value) => rendered.push_str(value),
                None => {
                    return Err(TemplateError::Unresolved {
                        template: self.name,
                        placeholder: placeholder.to_string(),
                    })
                }
            }
            rest = &after[end + 2..];
        }
        rendered.push_str(rest);

        Ok(rendered)
    }
}

/// A file written verbatim on every run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Short name, used by `drumpi render`.
    pub name: &'static str,
    /// The path on the provisioned system.
    pub path: PathBuf,
    pub contents: String,
    pub executable: bool,
}

impl Artifact {
    /// Overwrites the artifact under the given root, creating parent directories.
    /// Returns the path written.
    pub fn write(&self, settings: &Settings) -> Result<PathBuf, ProvisionError> {
        let path = settings.on_root(&self.path);
        let write_failure = |source| ProvisionError::ArtifactWriteFailure {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failure)?;
        }
        fs::write(&path, &self.contents).map_err(write_failure)?;

        let mode = if self.executable {
            EXECUTABLE_MODE
        } else {
            REGULAR_MODE
        };
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).map_err(write_failure)?;

        info!(artifact = self.name, path = %path.display(), "Wrote file.");
        Ok(path)
    }
}

fn path_value(path: &Path) -> String {
    path.display().to_string()
}

/// The substitution values shared by every template.
fn values(settings: &Settings) -> Result<HashMap<&'static str, String>, TemplateError> {
    let jack = settings.jack();
    let poll = settings.poll()?;

    Ok(HashMap::from([
        ("user", settings.user().to_string()),
        ("rtprio", jack.rtprio_limit().to_string()),
        ("priority", jack.priority().to_string()),
        ("sample_rate", jack.sample_rate().to_string()),
        ("period", jack.period().to_string()),
        ("periods", jack.periods().to_string()),
        ("ready_port", jack.ready_port().to_string()),
        ("device_patterns", settings.device_patterns().join(" ")),
        ("attempts", poll.attempts().to_string()),
        ("interval", poll.shell_interval()),
        ("kit_descriptor", path_value(&settings.kit_descriptor())),
        ("midimap", path_value(&settings.kit_midimap())),
        ("start_jack", path_value(&settings.start_jack_path())),
        ("start_drumgizmo", path_value(&settings.start_drumgizmo_path())),
        ("rules", path_value(&settings.plumbing_rules_path())),
    ]))
}

/// The realtime limits policy: one rtprio and one memlock line per group.
pub fn limits_policy(settings: &Settings) -> Result<Vec<Artifact>, TemplateError> {
    let mut values = values(settings)?;
    let mut contents = templates::LIMITS_HEADER.render(&values)?;
    for group in settings.groups() {
        values.insert("group", group);
        contents.push_str(&templates::LIMITS_ENTRY.render(&values)?);
    }

    Ok(vec![Artifact {
        name: "limits",
        path: settings.limits_path(),
        contents,
        executable: false,
    }])
}

pub fn helper_scripts(settings: &Settings) -> Result<Vec<Artifact>, TemplateError> {
    let values = values(settings)?;
    Ok(vec![
        Artifact {
            name: templates::START_JACK.name(),
            path: settings.start_jack_path(),
            contents: templates::START_JACK.render(&values)?,
            executable: true,
        },
        Artifact {
            name: templates::START_DRUMGIZMO.name(),
            path: settings.start_drumgizmo_path(),
            contents: templates::START_DRUMGIZMO.render(&values)?,
            executable: true,
        },
    ])
}

pub fn service_units(settings: &Settings) -> Result<Vec<Artifact>, TemplateError> {
    let values = values(settings)?;
    [
        templates::JACKD_SERVICE,
        templates::DRUMGIZMO_SERVICE,
        templates::PLUMBING_SERVICE,
    ]
    .iter()
    .map(|template| {
        Ok(Artifact {
            name: template.name(),
            path: settings.unit_path(template.name()),
            contents: template.render(&values)?,
            executable: false,
        })
    })
    .collect()
}

pub fn autoconnect_rules(settings: &Settings) -> Result<Vec<Artifact>, TemplateError> {
    let values = values(settings)?;
    Ok(vec![Artifact {
        name: templates::PLUMBING_RULES.name(),
        path: settings.plumbing_rules_path(),
        contents: templates::PLUMBING_RULES.render(&values)?,
        executable: false,
    }])
}

/// Every generated artifact, in the order they are written.
pub fn all(settings: &Settings) -> Result<Vec<Artifact>, TemplateError> {
    let mut artifacts = limits_policy(settings)?;
    artifacts.extend(helper_scripts(settings)?);
    artifacts.extend(service_units(settings)?);
    artifacts.extend(autoconnect_rules(settings)?);
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt, path::Path};

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_render() {
        let template = Template::new("test", "a={{a}} b={{ b }} c={{a}}\n");
        let values = HashMap::from([("a", "1".to_string()), ("b", "2".to_string()), ("unused", "x".to_string())]);
        assert_eq!(template.render(&values).unwrap(), "a=1 b=2 c=1\n");
    }

    #[test]
    fn test_render_unresolved() {
        let template = Template::new("test", "{{missing}}");
        let err = template.render(&HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Unresolved { placeholder, .. } if placeholder == "missing"
        ));

        let template = Template::new("test", "{{open");
        assert!(matches!(
            template.render(&HashMap::new()),
            Err(TemplateError::Unterminated { .. })
        ));
    }

    #[test]
    fn test_shell_arithmetic_is_not_a_placeholder() {
        let template = Template::new("test", "x=$((x + 1)) ${HOME}\n");
        assert_eq!(template.render(&HashMap::new()).unwrap(), "x=$((x + 1)) ${HOME}\n");
    }

    #[test]
    fn test_limits_policy() {
        let artifacts = limits_policy(&Settings::default()).unwrap();
        assert_eq!(artifacts.len(), 1);
        let directives: Vec<&str> = artifacts[0]
            .contents
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect();
        assert_eq!(
            directives,
            vec![
                "@audio - rtprio 95",
                "@audio - memlock unlimited",
                "@realtime - rtprio 95",
                "@realtime - memlock unlimited",
            ]
        );
    }

    #[test]
    fn test_start_jack_arguments() {
        let scripts = helper_scripts(&Settings::default()).unwrap();
        let jack = &scripts[0];
        assert_eq!(jack.path, Path::new("/usr/local/bin/drumpi-start-jack"));
        assert!(jack.executable);
        assert!(jack.contents.starts_with("#!/bin/sh\n"));
        assert!(jack.contents.contains("PATTERNS=\"USB UMC codec headphones\""));
        assert!(jack.contents.contains("ATTEMPTS=50\n"));
        assert!(jack.contents.contains("INTERVAL=0.2\n"));
        assert!(jack
            .contents
            .contains("exec jackd -R -P 75 -d alsa -d \"hw:$CARD\" -r 48000 -p 512 -n 3"));
    }

    #[test]
    fn test_start_drumgizmo_arguments() {
        let scripts = helper_scripts(&Settings::default()).unwrap();
        let drumgizmo = &scripts[1];
        assert!(drumgizmo.executable);
        assert!(drumgizmo.contents.contains("grep -qx 'system:playback_1'"));
        assert!(drumgizmo.contents.contains(
            "exec drumgizmo -i jackmidi -I midimap=/home/pi/drumgizmo/DRSKit/Midimap_full.xml -o jackaudio /home/pi/drumgizmo/DRSKit/DRSKit_full.xml"
        ));
    }

    #[test]
    fn test_service_units() {
        let units = service_units(&Settings::default()).unwrap();
        let names: Vec<&str> = units.iter().map(|unit| unit.name).collect();
        assert_eq!(names, SERVICES.to_vec());

        let jackd = &units[0].contents;
        assert!(jackd.contains("ExecStart=/usr/local/bin/drumpi-start-jack\n"));
        assert!(jackd.contains("Restart=on-failure\n"));
        assert!(jackd.contains("RestartSec=1\n"));
        assert!(jackd.contains("User=pi\n"));

        let drumgizmo = &units[1].contents;
        assert!(drumgizmo.contains("After=jackd.service\n"));
        assert!(drumgizmo.contains("Requires=jackd.service\n"));
        assert!(drumgizmo
            .contains("ConditionPathExists=/home/pi/drumgizmo/DRSKit/DRSKit_full.xml\n"));
        assert_eq!(
            units[1].path,
            Path::new("/etc/systemd/system/drumgizmo.service")
        );

        let plumbing = &units[2].contents;
        assert!(plumbing.contains("After=jackd.service drumgizmo.service\n"));
        assert!(plumbing.contains("ExecStart=/usr/bin/jack-plumbing -o /etc/jack-plumbing\n"));
    }

    #[test]
    fn test_write_overwrites_and_sets_mode() {
        let root = tempdir().unwrap();
        let settings = Settings::default().with_root(root.path());
        let mut artifact = helper_scripts(&settings).unwrap().remove(0);

        let path = artifact.write(&settings).unwrap();
        assert_eq!(path, root.path().join("usr/local/bin/drumpi-start-jack"));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        artifact.contents = "short".to_string();
        artifact.write(&settings).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn test_write_failure() {
        let root = tempdir().unwrap();
        // A file where a directory is needed.
        fs::write(root.path().join("etc"), "").unwrap();
        let settings = Settings::default().with_root(root.path());
        let artifact = autoconnect_rules(&settings).unwrap().remove(0);

        let err = artifact.write(&settings).unwrap_err();
        assert!(matches!(err, ProvisionError::ArtifactWriteFailure { .. }));
    }

    #[test]
    fn test_all_names_are_unique() {
        let artifacts = all(&Settings::default()).unwrap();
        let mut names: Vec<&str> = artifacts.iter().map(|a| a.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), artifacts.len());
        assert_eq!(artifacts.len(), 7);
    }
}
