//! Installed-distribution metadata (`*.dist-info`, `*.egg-info`).
//!
//! Maps distribution names to import names and reads declared
//! requirements, so `python-dateutil` on a requirement line resolves to
//! the `dateutil` module on disk.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One installed distribution's metadata directory.
#[derive(Debug, Clone)]
pub struct DistInfo {
    /// The `*.dist-info` / `*.egg-info` directory itself.
    pub info_dir: PathBuf,
    /// Import names from `top_level.txt`; empty when the file is absent.
    pub top_level: Vec<String>,
    /// Distribution name head of the directory name, as spelled on disk.
    pub dist_name: String,
}

impl DistInfo {
    /// Read one metadata directory. Returns `None` when the directory
    /// name yields no distribution name.
    pub fn read(info_dir: &Path) -> Option<Self> {
        static NAME_RE: OnceLock<Regex> = OnceLock::new();
        let name_re = NAME_RE.get_or_init(|| Regex::new(r"^([0-9A-Za-z_.]+)").unwrap());

        let dirname = info_dir.file_name()?.to_str()?;
        // strip the suffix first: the name head may itself contain dots
        // (ruamel.yaml) and egg-info names often carry no version part
        let stem = dirname
            .strip_suffix(".dist-info")
            .or_else(|| dirname.strip_suffix(".egg-info"))
            .unwrap_or(dirname);
        let dist_name = name_re.find(stem)?.as_str().to_string();

        let top_level = match std::fs::read_to_string(info_dir.join("top_level.txt")) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => Vec::new(),
        };

        Some(Self {
            info_dir: info_dir.to_path_buf(),
            top_level,
            dist_name,
        })
    }

    /// All names this distribution answers to: the import names from
    /// `top_level.txt` plus the distribution name in both underscore and
    /// hyphen spellings.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.top_level.clone();
        names.push(self.dist_name.clone());
        let hyphenated = self.dist_name.replace('_', "-");
        if hyphenated != self.dist_name {
            names.push(hyphenated);
        }
        names
    }

    /// Immediate requirements declared by the distribution: names from
    /// `metadata.json` `run_requires`, or from `Requires-Dist:` lines in
    /// `METADATA`. Version specifiers, extras, and environment markers
    /// are dropped.
    pub fn requires(&self) -> BTreeSet<String> {
        let mut ret = BTreeSet::new();

        let jsonpath = self.info_dir.join("metadata.json");
        if jsonpath.is_file() {
            if let Ok(content) = std::fs::read_to_string(&jsonpath)
                && let Ok(doc) = serde_json::from_str::<serde_json::Value>(&content)
                && let Some(blocks) = doc.get("run_requires").and_then(|v| v.as_array())
            {
                for block in blocks {
                    let Some(requires) = block.get("requires").and_then(|v| v.as_array()) else {
                        continue;
                    };
                    for name in requires.iter().filter_map(|v| v.as_str()) {
                        if let Some(head) = requirement_name(name) {
                            ret.insert(head);
                        }
                    }
                }
            }
            return ret;
        }

        if let Ok(content) = std::fs::read_to_string(self.info_dir.join("METADATA")) {
            for line in content.lines() {
                if let Some(rest) = line.strip_prefix("Requires-Dist:")
                    && let Some(head) = requirement_name(rest)
                {
                    ret.insert(head);
                }
            }
        }

        ret
    }
}

/// Leading distribution name of one requirement line.
fn requirement_name(line: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^([0-9A-Za-z_.-]+)").unwrap());
    re.find(line.trim()).map(|m| m.as_str().to_string())
}

/// Index of the distributions under one search-path entry.
#[derive(Debug, Default)]
pub struct DistIndex {
    dists: Vec<DistInfo>,
    by_name: HashMap<String, usize>,
}

impl DistIndex {
    /// Scan one directory for `*.dist-info` / `*.egg-info` entries.
    /// A missing or unreadable directory indexes as empty.
    pub fn scan(dir: &Path) -> Self {
        let mut index = Self::default();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return index;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || !is_info_dir(&path) {
                continue;
            }
            if let Some(dist) = DistInfo::read(&path) {
                let slot = index.dists.len();
                for name in dist.names() {
                    index.by_name.entry(name).or_insert(slot);
                }
                index.dists.push(dist);
            }
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<&DistInfo> {
        self.by_name.get(name).and_then(|&i| self.dists.get(i))
    }

    pub fn len(&self) -> usize {
        self.dists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dists.is_empty()
    }
}

fn is_info_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".dist-info") || n.ends_with(".egg-info"))
}
