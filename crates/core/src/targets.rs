use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::{Regex, RegexBuilder};

use crate::types::Template;

const MAP_PATTERN: &str = r"^orbit_picture.*\.png$";
const SUPPORT_PATTERN: &str = r"^friend_reisou.*\.png$";

const MAP_CONFIDENCE: f64 = 0.9;
const SUPPORT_CONFIDENCE: f64 = 0.85;

/// Regular files directly under `dir` whose name matches `pattern`,
/// sorted by file name. A missing directory is simply empty.
pub fn discover(dir: &Path, pattern: &Regex) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };
    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| pattern.is_match(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    found
}

fn pattern(src: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(src).case_insensitive(true).build()?)
}

/// Map-selection templates, in the order they are walked.
pub fn farming_targets(dir: &Path) -> Result<Vec<Template>> {
    let re = pattern(MAP_PATTERN)?;
    Ok(discover(dir, &re).into_iter().map(|p| Template::new(p, MAP_CONFIDENCE)).collect())
}

/// Desired support card templates.
pub fn support_targets(dir: &Path) -> Result<Vec<Template>> {
    let re = pattern(SUPPORT_PATTERN)?;
    Ok(discover(dir, &re).into_iter().map(|p| Template::new(p, SUPPORT_CONFIDENCE)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_matching_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["orbit_picture2.PNG", "orbit_picture1.png", "event_run.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("orbit_picture9.png")).unwrap();

        let targets = farming_targets(dir.path()).unwrap();
        let names: Vec<String> = targets.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["orbit_picture1", "orbit_picture2"]);
        assert!(targets.iter().all(|t| t.confidence == 0.9));
    }

    #[test]
    fn missing_dir_is_empty() {
        assert!(support_targets(Path::new("/definitely/not/here")).unwrap().is_empty());
    }
}
