use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::rule::Rule;

/// Ordered, disk-backed rule collection. Insertions append to the tail;
/// every matching rule fires, so order is only observable through decision
/// emission order.
///
/// Persistence follows the live catalog: `add` appends one JSON line,
/// `delete` rewrites the whole file. Persistence failures are logged and
/// the in-memory state stands; the file catches back up on the next
/// rewrite.
#[derive(Debug)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    path: PathBuf,
}

impl RuleCatalog {
    /// Read the rules file as JSON-lines. A missing file is an empty
    /// catalog; unparseable lines are rule-authoring errors, logged and
    /// skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut rules = Vec::new();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for (idx, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Rule>(line) {
                        Ok(rule) => rules.push(rule),
                        Err(err) => {
                            warn!(
                                file = %path.display(),
                                line = idx + 1,
                                error = %err,
                                "skipping unparseable rule line"
                            );
                        }
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(file = %path.display(), error = %err, "failed reading rules file");
            }
        }

        info!(file = %path.display(), count = rules.len(), "loaded rule catalog");
        Self { rules, path }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append to the in-memory sequence, then append one JSON line to the
    /// rules file.
    pub fn add(&mut self, rule: Rule) {
        self.rules.push(rule);

        let added = self.rules.last().expect("rule was just pushed");
        if let Err(err) = append_json_line(&self.path, added) {
            error!(file = %self.path.display(), error = %err, "failed appending rule to file");
        }
    }

    /// Remove the first rule structurally equal to `rule` across `Type`,
    /// `Message`, `Action` and every `Data` entry, then rewrite the rules
    /// file from the remaining catalog. Returns whether a rule was removed.
    pub fn delete(&mut self, rule: &Rule) -> bool {
        let Some(index) = self.rules.iter().position(|candidate| candidate == rule) else {
            return false;
        };

        let _ = self.rules.remove(index);
        if let Err(err) = rewrite_json_lines(&self.path, &self.rules) {
            error!(file = %self.path.display(), error = %err, "failed rewriting rules file");
        }
        true
    }
}

fn append_json_line(path: &Path, rule: &Rule) -> std::io::Result<()> {
    let mut line = serde_json::to_string(rule)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

fn rewrite_json_lines(path: &Path, rules: &[Rule]) -> std::io::Result<()> {
    let mut data = String::new();
    for rule in rules {
        data.push_str(&serde_json::to_string(rule)?);
        data.push('\n');
    }
    fs::write(path, data)
}
