use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where a detection run puts its artifacts.
///
/// ```text
/// <root>/planes/plane_{i}.ply
/// <root>/meshes/mesh_{i}.ply
/// <root>/results/result-classified.ply
/// <root>/results/output.csv
/// <root>/recent.txt
/// ```
///
/// Plane and mesh indices are 1-based segment ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new("data")
    }
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn planes_dir(&self) -> PathBuf {
        self.root.join("planes")
    }

    pub fn meshes_dir(&self) -> PathBuf {
        self.root.join("meshes")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    pub fn plane_path(&self, segment: usize) -> PathBuf {
        self.planes_dir().join(format!("plane_{}.ply", segment))
    }

    pub fn mesh_path(&self, segment: usize) -> PathBuf {
        self.meshes_dir().join(format!("mesh_{}.ply", segment))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.results_dir().join("result-classified.ply")
    }

    pub fn report_path(&self) -> PathBuf {
        self.results_dir().join("output.csv")
    }

    pub fn recent_path(&self) -> PathBuf {
        self.root.join("recent.txt")
    }

    /// Creates the artifact directories.
    pub fn prepare(&self) -> io::Result<()> {
        for dir in [self.planes_dir(), self.meshes_dir(), self.results_dir()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Deletes artifacts of a previous run. Files the layout does not own
    /// are left alone.
    pub fn clean(&self) -> io::Result<()> {
        for (dir, prefix) in [(self.planes_dir(), "plane_"), (self.meshes_dir(), "mesh_")] {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            for entry in entries {
                let path = entry?.path();
                let owned = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".ply"));
                if owned {
                    fs::remove_file(&path)?;
                }
            }
        }

        for file in [self.combined_path(), self.report_path(), self.recent_path()] {
            match fs::remove_file(&file) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }

    /// Source file of the last completed run, if any.
    pub fn read_recent(&self) -> Option<PathBuf> {
        let text = fs::read_to_string(self.recent_path()).ok()?;
        let line = text.lines().next()?.trim();
        (!line.is_empty()).then(|| PathBuf::from(line))
    }

    pub fn write_recent(&self, source: &Path) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.recent_path(), format!("{}\n", source.display()))
    }
}
