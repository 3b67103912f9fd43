// src/tasks/files.rs

//! File-level tasks: copy, rename, remove, find-and-replace.
//!
//! Every path argument is rendered as a template against the config tree and
//! resolved relative to the directory the run started in.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobMatcher};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::{PackflowError, Result};
use crate::pipeline::{BuildContext, StepArgs, TaskOutput};

pub fn check_from_to(args: &StepArgs) -> Result<()> {
    args.require_str("copy_files/rename_files", "from")?;
    args.require_str("copy_files/rename_files", "to")?;
    Ok(())
}

pub fn check_find_replace(args: &StepArgs) -> Result<()> {
    args.require_str("find_and_replace", "find")?;
    args.require_str("find_and_replace", "replace")?;
    args.bool_kw("find_and_replace", "template", true)?;
    args.positional_strs("find_and_replace")?;
    Ok(())
}

pub fn check_find_replace_in_dir(args: &StepArgs) -> Result<()> {
    args.positional_str("find_and_replace_in_dir", 0)?;
    args.require_str("find_and_replace_in_dir", "find")?;
    args.require_str("find_and_replace_in_dir", "replace")?;
    args.str_list_kw("find_and_replace_in_dir", "file_suffixes")?;
    args.bool_kw("find_and_replace_in_dir", "template", false)?;
    Ok(())
}

/// `copy_files(from=, to=, ignore_patterns=[...])`
///
/// A directory source is copied recursively, skipping entries matched by the
/// gitignore-like `ignore_patterns`. A `*` in `to` makes its parent a glob
/// over existing directories; the source is copied into each match.
pub fn copy_files(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    let from = ctx.expand_path([ctx.render(args.require_str("copy_files", "from")?)?]);
    let to = ctx.render(args.require_str("copy_files", "to")?)?;
    let ignore_patterns = args.str_list_kw("copy_files", "ignore_patterns")?;

    let destinations = if to.contains('*') {
        glob_destinations(&ctx.expand_path([&to]))?
    } else {
        vec![ctx.expand_path([&to])]
    };

    if from.is_dir() {
        let rules = IgnoreRules::new(&from, &ignore_patterns)?;
        for dest in &destinations {
            debug!(from = %from.display(), to = %dest.display(), "copying directory");
            copy_tree(&from, dest, &rules)?;
        }
    } else {
        for dest in &destinations {
            debug!(from = %from.display(), to = %dest.display(), "copying file");
            copy_file(&from, dest)?;
        }
    }
    Ok(TaskOutput::Done)
}

/// `rename_files(from=, to=)`
pub fn rename_files(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    let from = ctx.expand_path([ctx.render(args.require_str("rename_files", "from")?)?]);
    let to = ctx.expand_path([ctx.render(args.require_str("rename_files", "to")?)?]);
    debug!(from = %from.display(), to = %to.display(), "renaming");
    fs::rename(&from, &to)
        .with_context(|| format!("renaming {} to {}", from.display(), to.display()))?;
    Ok(TaskOutput::Done)
}

/// `remove_files(path, ...)`: files are deleted, directories removed
/// recursively. Missing paths are ignored.
pub fn remove_files(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    let removes = args.positional_strs("remove_files")?;
    info!("deleting {} files", removes.len());
    for rem in removes {
        let real = ctx.expand_path([ctx.render(rem)?]);
        debug!(path = %real.display(), "deleting");
        if real.is_file() {
            fs::remove_file(&real).with_context(|| format!("deleting {}", real.display()))?;
        } else if real.is_dir() {
            if let Err(err) = fs::remove_dir_all(&real) {
                debug!(path = %real.display(), error = %err, "could not remove directory");
            }
        }
    }
    Ok(TaskOutput::Done)
}

/// `find_and_replace(glob, ..., find=, replace=, template=true)`
pub fn find_and_replace(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    let find = args.require_str("find_and_replace", "find")?;
    let mut replace = args.require_str("find_and_replace", "replace")?.to_string();
    if args.bool_kw("find_and_replace", "template", true)? {
        replace = ctx.render(&replace)?;
    }
    debug!("replacing {find} with {:?}", summarize(&replace));

    for pattern in args.positional_strs("find_and_replace")? {
        let expanded = ctx.expand_path([ctx.render(pattern)?]);
        let found = glob_paths(&expanded)?;
        if found.is_empty() {
            warn!("No files were found to match pattern \"{pattern}\"");
        }
        for file in found {
            replace_in_file(&file, find, &replace)?;
        }
    }
    Ok(TaskOutput::Done)
}

/// `find_and_replace_in_dir(root, find=, replace=, file_suffixes=["html"],
/// template=false)`
///
/// `%{back_to_parent}%` in `find` or `replace` becomes one `../` per level
/// between the file and `root`, plus one.
pub fn find_and_replace_in_dir(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    const TASK: &str = "find_and_replace_in_dir";
    let root = args.positional_str(TASK, 0)?;
    let find = args.require_str(TASK, "find")?;
    let mut replace = args.require_str(TASK, "replace")?.to_string();
    let mut suffixes = args.str_list_kw(TASK, "file_suffixes")?;
    if suffixes.is_empty() {
        suffixes.push("html".to_string());
    }
    if args.bool_kw(TASK, "template", false)? {
        replace = ctx.render(&replace)?;
    }

    debug!("replacing {find} with {:?} in {root}/**/*.{suffixes:?}", summarize(&replace));

    let roots = glob_paths(&ctx.expand_path([root]))?;
    if roots.is_empty() {
        warn!("No files were found to match pattern \"{root}\"");
    }
    for found_root in roots {
        for entry in WalkDir::new(&found_root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", found_root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let suffix = name.rsplit('.').next().unwrap_or_default();
            if !suffixes.iter().any(|s| s == suffix) {
                continue;
            }
            let back = "../".repeat(entry.depth());
            let find = find.replace("%{back_to_parent}%", &back);
            let replace = replace.replace("%{back_to_parent}%", &back);
            replace_in_file(entry.path(), &find, &replace)?;
        }
    }
    Ok(TaskOutput::Done)
}

fn summarize(text: &str) -> String {
    if text.chars().count() > 60 {
        format!("{}...", text.chars().take(60).collect::<String>())
    } else {
        text.to_string()
    }
}

fn replace_in_file(path: &Path, find: &str, replace: &str) -> Result<()> {
    debug!(file = %path.display(), "replacing {find}");
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    fs::write(path, contents.replace(find, replace))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn glob_paths(pattern: &Path) -> Result<Vec<PathBuf>> {
    let raw = pattern.to_string_lossy();
    let paths = glob::glob(&raw)
        .map_err(|e| PackflowError::config(format!("invalid glob pattern '{raw}': {e}")))?;
    let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    found.sort();
    Ok(found)
}

/// `dir/*/file` -> every existing `dir/<match>/file`.
fn glob_destinations(to: &Path) -> Result<Vec<PathBuf>> {
    let (Some(parent), Some(name)) = (to.parent(), to.file_name()) else {
        return Ok(vec![to.to_path_buf()]);
    };
    Ok(glob_paths(parent)?
        .into_iter()
        .map(|dir| dir.join(name))
        .collect())
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let target = if to.is_dir() {
        match from.file_name() {
            Some(name) => to.join(name),
            None => to.to_path_buf(),
        }
    } else {
        to.to_path_buf()
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, &target)
        .with_context(|| format!("copying {} to {}", from.display(), target.display()))?;
    Ok(())
}

fn copy_tree(from: &Path, to: &Path, rules: &IgnoreRules) -> Result<()> {
    let walker = WalkDir::new(from)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(from) {
            Ok(rel) if rel.as_os_str().is_empty() => true,
            Ok(rel) => !rules.is_ignored(rel, entry.file_type().is_dir()),
            Err(_) => true,
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", from.display()))?;
        let Ok(rel) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("copying {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

/// Gitignore-like rules used when copying a directory.
///
/// A pattern containing `/` before its last character names paths relative
/// to the copy root (globbed once, up front). Anything else is matched
/// against entry names; a trailing `/` restricts it to directories.
#[derive(Debug, Default)]
pub(crate) struct IgnoreRules {
    paths: HashSet<PathBuf>,
    names: Vec<(GlobMatcher, bool)>,
}

impl IgnoreRules {
    pub(crate) fn new(root: &Path, patterns: &[String]) -> Result<Self> {
        let mut rules = IgnoreRules::default();
        for pattern in patterns.iter().filter(|p| !p.is_empty()) {
            let head = pattern
                .char_indices()
                .last()
                .map_or("", |(last, _)| &pattern[..last]);
            if head.contains('/') {
                for hit in glob_paths(&root.join(pattern))? {
                    if let Ok(rel) = hit.strip_prefix(root) {
                        rules.paths.insert(rel.to_path_buf());
                    }
                }
            } else {
                let dirs_only = pattern.ends_with('/') || pattern.ends_with('\\');
                let name = pattern.trim_end_matches(['/', '\\']);
                let matcher = Glob::new(name)
                    .map_err(|e| {
                        PackflowError::config(format!("invalid ignore pattern '{pattern}': {e}"))
                    })?
                    .compile_matcher();
                rules.names.push((matcher, dirs_only));
            }
        }
        Ok(rules)
    }

    pub(crate) fn is_ignored(&self, rel: &Path, is_dir: bool) -> bool {
        if self.paths.contains(rel) {
            return true;
        }
        let Some(name) = rel.file_name() else {
            return false;
        };
        self.names
            .iter()
            .any(|(matcher, dirs_only)| (!dirs_only || is_dir) && matcher.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_rules_distinguish_names_dirs_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("js/vendor")).unwrap();
        fs::write(dir.path().join("js/vendor/x.js"), "").unwrap();

        let rules = IgnoreRules::new(
            dir.path(),
            &["*.bak".into(), "build/".into(), "js/vendor".into(), "".into()],
        )
        .unwrap();

        assert!(rules.is_ignored(Path::new("a/b.bak"), false));
        assert!(rules.is_ignored(Path::new("build"), true));
        assert!(!rules.is_ignored(Path::new("build"), false));
        assert!(rules.is_ignored(Path::new("js/vendor"), true));
        assert!(!rules.is_ignored(Path::new("js/app.js"), false));
    }

    #[test]
    fn summarize_truncates_long_text() {
        assert_eq!(summarize("short"), "short");
        assert_eq!(summarize(&"x".repeat(70)).len(), 63);
    }
}
