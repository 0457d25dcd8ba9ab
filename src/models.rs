//! Domain types: applications, tags, cluster labels and grouped output.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Delimiter between labels in a tag string.
pub const TAG_DELIMITER: char = ',';

/// The answer the model gives when it cannot classify an application.
pub const INSUFFICIENT_INFO: &str = "insufficient information";

/// Sentinel written by earlier, Chinese-prompted runs; still honoured when read back.
pub const LEGACY_INSUFFICIENT_INFO: &str = "信息不足";

/// Upper bound on labels kept per application.
pub const MAX_TAGS: usize = 5;

/// Display name of the group holding outliers.
pub const OUTLIER_GROUP: &str = "Standalone apps / outliers";

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d{1,2}[.)、])\s*").expect("list marker pattern is valid")
});

/// One launcher entry as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationRecord {
    /// Display name shown in the launcher.
    pub name: String,
    /// Package identifier, e.g. `com.tencent.mm`.
    pub package: String,
    /// Set once the classification step has run.
    pub tags: Option<Tags>,
    /// Set once the embedding step has produced a vector.
    pub vector: Option<Vec<f32>>,
}

impl ApplicationRecord {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            tags: None,
            vector: None,
        }
    }
}

/// Classification outcome for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tags {
    /// One to [`MAX_TAGS`] category labels.
    Labels(Vec<String>),
    /// The model could not (or was not allowed to) classify the application.
    InsufficientInformation,
}

impl Tags {
    /// Normalize raw model output (or a cached value) into tags.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_sentinel(trimmed) {
            return Tags::InsufficientInformation;
        }

        let mut labels: Vec<String> = Vec::new();
        for piece in trimmed.split(|c: char| matches!(c, ',' | '，' | '、' | ';' | '\n')) {
            let piece = LIST_MARKER.replace(piece, "");
            let label = piece
                .trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”'))
                .trim();
            if label.is_empty() || labels.iter().any(|l| l == label) {
                continue;
            }
            labels.push(label.to_string());
            if labels.len() == MAX_TAGS {
                break;
            }
        }

        if labels.is_empty() {
            Tags::InsufficientInformation
        } else {
            Tags::Labels(labels)
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Tags::InsufficientInformation)
    }

    pub fn labels(&self) -> &[String] {
        match self {
            Tags::Labels(labels) => labels,
            Tags::InsufficientInformation => &[],
        }
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tags::Labels(labels) => {
                for (i, label) in labels.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{TAG_DELIMITER}")?;
                    }
                    f.write_str(label)?;
                }
                Ok(())
            }
            Tags::InsufficientInformation => f.write_str(INSUFFICIENT_INFO),
        }
    }
}

fn is_sentinel(text: &str) -> bool {
    let core =
        text.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace() || c == '。');
    core.eq_ignore_ascii_case(INSUFFICIENT_INFO) || core == LEGACY_INSUFFICIENT_INFO
}

/// Cluster membership of a single vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClusterLabel {
    Cluster(usize),
    /// Not density-reachable from any core point.
    Outlier,
}

impl ClusterLabel {
    /// Conventional integer form: cluster number, or -1 for outliers.
    pub fn as_i32(self) -> i32 {
        match self {
            ClusterLabel::Cluster(n) => n as i32,
            ClusterLabel::Outlier => -1,
        }
    }

    pub fn is_outlier(self) -> bool {
        matches!(self, ClusterLabel::Outlier)
    }

    pub fn group_name(self) -> String {
        match self {
            ClusterLabel::Cluster(n) => format!("Group {n}"),
            ClusterLabel::Outlier => OUTLIER_GROUP.to_string(),
        }
    }
}

/// A named group of application display names.
#[derive(Debug, Clone, PartialEq)]
pub struct AppGroup {
    pub name: String,
    pub label: ClusterLabel,
    pub members: Vec<String>,
}

/// Final output: numbered groups in label order, then the outlier group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedResult {
    groups: Vec<AppGroup>,
}

impl GroupedResult {
    /// Group application names by their label. `apps` and `labels` are parallel.
    pub fn from_assignment(apps: &[ApplicationRecord], labels: &[ClusterLabel]) -> Self {
        // Cluster(_) sorts before Outlier, which puts the outlier group last.
        let mut by_label: BTreeMap<ClusterLabel, Vec<String>> = BTreeMap::new();
        for (app, label) in apps.iter().zip(labels) {
            by_label.entry(*label).or_default().push(app.name.clone());
        }

        let groups = by_label
            .into_iter()
            .map(|(label, members)| AppGroup {
                name: label.group_name(),
                label,
                members,
            })
            .collect();

        Self { groups }
    }

    pub fn groups(&self) -> &[AppGroup] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.members.as_slice())
    }

    /// Members of the outlier group, empty if there is none.
    pub fn outliers(&self) -> &[String] {
        self.get(OUTLIER_GROUP).unwrap_or(&[])
    }

    /// Name of the group containing `app_name`, if any.
    pub fn group_of(&self, app_name: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.members.iter().any(|m| m == app_name))
            .map(|g| g.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for GroupedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.name, &group.members)?;
        }
        map.end()
    }
}
