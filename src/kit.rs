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
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, span, Level};

use crate::config::Settings;
use crate::error::ProvisionError;
use crate::orchestrator::Outcome;
use crate::system::{Invocation, System};

mod fetch;

pub use fetch::{Fetcher, Wget};

/// How deep below the extraction directory the kit directory may be.
const SEARCH_DEPTH: usize = 2;
/// Extraction directory name, next to the kit directory.
const STAGING_DIR: &str = ".drumpi-kit-staging";

/// A sample kit directory. The kit is installed if and only if both the
/// descriptor and the MIDI map are present.
#[derive(Clone, Debug)]
pub struct KitAsset {
    directory: PathBuf,
    descriptor: String,
    midimap: String,
}

impl KitAsset {
    pub fn new(directory: PathBuf, descriptor: &str, midimap: &str) -> KitAsset {
        KitAsset {
            directory,
            descriptor: descriptor.to_string(),
            midimap: midimap.to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The required files that are not present.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        [&self.descriptor, &self.midimap]
            .iter()
            .map(|file| self.directory.join(file))
            .filter(|path| !path.is_file())
            .collect()
    }

    pub fn is_installed(&self) -> bool {
        self.missing_files().is_empty()
    }
}

/// Finds the shallowest directory at or below `root` (at most `max_depth`
/// levels down) that contains `descriptor`. Siblings are visited in name order
/// so the result does not depend on directory listing order.
pub fn find_kit_root(root: &Path, descriptor: &str, max_depth: usize) -> io::Result<Option<PathBuf>> {
    let mut level = vec![root.to_path_buf()];
    for depth in 0..=max_depth {
        for dir in level.iter() {
            if dir.join(descriptor).is_file() {
                return Ok(Some(dir.clone()));
            }
        }
        if depth == max_depth {
            break;
        }

        let mut next = Vec::new();
        for dir in level.iter() {
            let mut children: Vec<PathBuf> = fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_dir())
                .collect();
            children.sort();
            next.extend(children);
        }
        level = next;
    }
    Ok(None)
}

/// Downloads and installs a kit, unless it is already installed.
pub struct Installer<'a> {
    kit: KitAsset,
    url: String,
    archive: PathBuf,
    staging: PathBuf,
    owner: String,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Installer<'a> {
    pub fn new(settings: &Settings, fetcher: &'a dyn Fetcher) -> Installer<'a> {
        let kit = settings.kit();
        let directory = settings.on_root(&settings.kit_dir());
        let parent = directory
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| settings.root().to_path_buf());

        Installer {
            kit: KitAsset::new(directory, kit.descriptor(), kit.midimap()),
            url: kit.url().to_string(),
            archive: parent.join(kit.archive()),
            staging: parent.join(STAGING_DIR),
            owner: settings.user().to_string(),
            fetcher,
        }
    }

    pub fn kit(&self) -> &KitAsset {
        &self.kit
    }

    pub fn install(&self, system: &dyn System) -> Result<Outcome, ProvisionError> {
        let span = span!(Level::INFO, "install kit");
        let _enter = span.enter();

        if self.kit.is_installed() {
            info!(kit = %self.kit.directory.display(), "Kit already present.");
            self.take_ownership(system)?;
            return Ok(Outcome::AlreadyPresent);
        }

        self.clear_stale()?;
        if let Some(parent) = self.archive.parent() {
            fs::create_dir_all(parent)?;
        }
        self.fetcher.download(system, &self.url, &self.archive)?;
        self.fetcher.extract(system, &self.archive, &self.staging)?;

        let Some(found) = find_kit_root(&self.staging, &self.kit.descriptor, SEARCH_DEPTH)? else {
            self.clear_stale()?;
            return Err(ProvisionError::KitStructureNotFound {
                descriptor: self.kit.descriptor.clone(),
                searched: self.staging.clone(),
            });
        };
        info!(found = %found.display(), "Found kit in archive.");

        remove_dir_if_present(&self.kit.directory)?;
        fs::rename(&found, &self.kit.directory)?;
        self.clear_stale()?;

        if let Some(missing) = self.kit.missing_files().into_iter().next() {
            return Err(ProvisionError::KitVerificationFailed { missing });
        }

        self.take_ownership(system)?;

        info!(kit = %self.kit.directory.display(), "Kit installed.");
        Ok(Outcome::Applied)
    }

    /// Hands the kit to the operating user and their login group. Runs on every
    /// install, so a failed chown is repaired by the next run.
    fn take_ownership(&self, system: &dyn System) -> Result<(), ProvisionError> {
        system.run(
            &Invocation::new("chown")
                .arg("-R")
                .arg(format!("{}:", self.owner))
                .arg(self.kit.directory.to_string_lossy()),
        )?;
        Ok(())
    }

    /// Removes the archive and the extraction directory left by an earlier run.
    fn clear_stale(&self) -> Result<(), ProvisionError> {
        remove_dir_if_present(&self.staging)?;
        match fs::remove_file(&self.archive) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn remove_dir_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
pub mod test {
    use std::{
        cell::Cell,
        fs,
        path::{Path, PathBuf},
    };

    use tempfile::tempdir;

    use super::*;
    use crate::system::mock;

    /// A fetcher that "extracts" a fixed set of files and counts its calls.
    pub struct FakeFetcher {
        files: Vec<&'static str>,
        pub downloads: Cell<usize>,
        pub extractions: Cell<usize>,
    }

    impl FakeFetcher {
        pub fn new(files: &[&'static str]) -> FakeFetcher {
            FakeFetcher {
                files: files.to_vec(),
                downloads: Cell::new(0),
                extractions: Cell::new(0),
            }
        }

        /// An archive laid out like the DRSKit release.
        pub fn drskit() -> FakeFetcher {
            FakeFetcher::new(&[
                "DRSKit/DRSKit_full.xml",
                "DRSKit/Midimap_full.xml",
                "DRSKit/Kick/samples/1-Kick.wav",
            ])
        }
    }

    impl Fetcher for FakeFetcher {
        fn download(&self, _: &dyn System, _: &str, archive: &Path) -> Result<(), ProvisionError> {
            self.downloads.set(self.downloads.get() + 1);
            fs::write(archive, "zip")?;
            Ok(())
        }

        fn extract(&self, _: &dyn System, _: &Path, into: &Path) -> Result<(), ProvisionError> {
            self.extractions.set(self.extractions.get() + 1);
            for file in self.files.iter() {
                let path = into.join(file);
                fs::create_dir_all(path.parent().unwrap())?;
                fs::write(path, "<drumkit/>")?;
            }
            fs::create_dir_all(into)?;
            Ok(())
        }
    }

    fn settings(root: &Path) -> Settings {
        Settings::default().with_root(root)
    }

    fn kit_dir(root: &Path) -> PathBuf {
        root.join("home/pi/drumgizmo/DRSKit")
    }

    #[test]
    fn test_descriptor_at_extracted_root() {
        let root = tempdir().unwrap();
        let fetcher = FakeFetcher::drskit();
        let system = mock::System::new();
        let installer = Installer::new(&settings(root.path()), &fetcher);

        let outcome = installer.install(&system).unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let kit = kit_dir(root.path());
        assert!(kit.join("DRSKit_full.xml").is_file());
        assert!(kit.join("Midimap_full.xml").is_file());
        assert!(kit.join("Kick/samples/1-Kick.wav").is_file());
        // Archive and staging are cleaned up.
        let parent = root.path().join("home/pi/drumgizmo");
        assert!(!parent.join("DRSKit2_1.zip").exists());
        assert!(!parent.join(STAGING_DIR).exists());
        assert_eq!(
            system.calls(),
            vec![format!("chown -R pi: {}", kit.display())]
        );
    }

    #[test]
    fn test_descriptor_nested_one_level_deeper() {
        let root = tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[
            "DRSKit2_1/DRSKit/DRSKit_full.xml",
            "DRSKit2_1/DRSKit/Midimap_full.xml",
            "DRSKit2_1/README.txt",
        ]);
        let installer = Installer::new(&settings(root.path()), &fetcher);

        installer.install(&mock::System::new()).unwrap();

        let kit = kit_dir(root.path());
        assert!(kit.join("DRSKit_full.xml").is_file());
        assert!(kit.join("Midimap_full.xml").is_file());
        assert!(!kit.join("README.txt").exists());
    }

    #[test]
    fn test_descriptor_missing() {
        let root = tempdir().unwrap();
        let fetcher = FakeFetcher::new(&["a/b/c/DRSKit_full.xml", "Midimap_full.xml"]);
        let installer = Installer::new(&settings(root.path()), &fetcher);

        let err = installer.install(&mock::System::new()).unwrap_err();

        assert!(matches!(err, ProvisionError::KitStructureNotFound { .. }));
        assert!(!kit_dir(root.path()).exists());
        let parent = root.path().join("home/pi/drumgizmo");
        assert!(!parent.join(STAGING_DIR).exists());
        assert!(!parent.join("DRSKit2_1.zip").exists());
    }

    #[test]
    fn test_midimap_missing_fails_verification() {
        let root = tempdir().unwrap();
        let fetcher = FakeFetcher::new(&["DRSKit/DRSKit_full.xml"]);
        let system = mock::System::new();
        let installer = Installer::new(&settings(root.path()), &fetcher);

        let err = installer.install(&system).unwrap_err();

        match err {
            ProvisionError::KitVerificationFailed { missing } => {
                assert_eq!(missing, kit_dir(root.path()).join("Midimap_full.xml"))
            }
            e => panic!("unexpected error {e}"),
        }
        assert!(system.calls().is_empty());
    }

    #[test]
    fn test_already_present_skips_download() {
        let root = tempdir().unwrap();
        let kit = kit_dir(root.path());
        fs::create_dir_all(&kit).unwrap();
        fs::write(kit.join("DRSKit_full.xml"), "").unwrap();
        fs::write(kit.join("Midimap_full.xml"), "").unwrap();

        let fetcher = FakeFetcher::drskit();
        let system = mock::System::new();
        let installer = Installer::new(&settings(root.path()), &fetcher);

        assert_eq!(installer.install(&system).unwrap(), Outcome::AlreadyPresent);
        assert_eq!(fetcher.downloads.get(), 0);
        assert_eq!(fetcher.extractions.get(), 0);
        assert_eq!(
            system.calls(),
            vec![format!("chown -R pi: {}", kit.display())]
        );
    }

    #[test]
    fn test_failed_chown_is_repaired_on_rerun() {
        let root = tempdir().unwrap();
        let kit = kit_dir(root.path());
        let fetcher = FakeFetcher::drskit();
        let installer = Installer::new(&settings(root.path()), &fetcher);

        let failing = mock::System::new().fail("chown", 1, "chown: invalid user: 'pi:'");
        let err = installer.install(&failing).unwrap_err();
        assert!(matches!(err, ProvisionError::Command(_)));
        assert!(installer.kit().is_installed());

        let system = mock::System::new();
        assert_eq!(installer.install(&system).unwrap(), Outcome::AlreadyPresent);
        assert_eq!(
            system.calls(),
            vec![format!("chown -R pi: {}", kit.display())]
        );
        assert_eq!(fetcher.downloads.get(), 1);
    }

    #[test]
    fn test_partial_kit_is_replaced_and_stale_artifacts_cleared() {
        let root = tempdir().unwrap();
        let kit = kit_dir(root.path());
        let parent = root.path().join("home/pi/drumgizmo");
        fs::create_dir_all(&kit).unwrap();
        fs::write(kit.join("DRSKit_full.xml"), "").unwrap();
        fs::write(kit.join("stale.wav"), "").unwrap();
        fs::create_dir_all(parent.join(STAGING_DIR).join("old")).unwrap();
        fs::write(parent.join(STAGING_DIR).join("old/DRSKit_full.xml"), "").unwrap();

        let fetcher = FakeFetcher::drskit();
        let installer = Installer::new(&settings(root.path()), &fetcher);

        assert_eq!(
            installer.install(&mock::System::new()).unwrap(),
            Outcome::Applied
        );
        assert!(installer.kit().is_installed());
        assert!(!kit.join("stale.wav").exists());
        assert_eq!(fetcher.downloads.get(), 1);
    }

    #[test]
    fn test_find_kit_root_prefers_shallow_and_sorted() {
        let root = tempdir().unwrap();
        for dir in ["b/kit", "a/kit", "c"] {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("b/kit/kit.xml"), "").unwrap();
        fs::write(root.path().join("a/kit/kit.xml"), "").unwrap();

        assert_eq!(
            find_kit_root(root.path(), "kit.xml", 2).unwrap(),
            Some(root.path().join("a/kit"))
        );

        fs::write(root.path().join("c/kit.xml"), "").unwrap();
        assert_eq!(
            find_kit_root(root.path(), "kit.xml", 2).unwrap(),
            Some(root.path().join("c"))
        );
        assert_eq!(find_kit_root(root.path(), "kit.xml", 0).unwrap(), None);
    }
}
