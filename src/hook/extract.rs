//! Extract strategy - structural summary of a unified diff, no provider needed
//!
//! Looks for three kinds of signal:
//! - files added or removed (`+++ b/<path>` without a matching `--- a/<path>`
//!   and the reverse)
//! - configuration files touched (`.yaml`, `.yml`, `.json`, `.toml`)
//! - declarations added or removed (`func <name>` / `type <name>` on `+`/`-` lines)
//!
//! Output is one line, `[<hash7>] <message> — <clause>; <clause>`, or an empty
//! string when the diff carries none of the above.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::context::CommitContext;
use crate::core::history::short_hash;

const DEV_NULL: &str = "/dev/null";

struct Patterns {
    new_path: Regex,
    old_path: Regex,
    func_added: Regex,
    type_added: Regex,
    func_removed: Regex,
    type_removed: Regex,
    config_file: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("extract pattern is a valid regex");
        Patterns {
            new_path: re(r"(?m)^\+\+\+ b/(.+)$"),
            old_path: re(r"(?m)^--- a/(.+)$"),
            func_added: re(r"(?m)^\+.*func\s+(\w+)"),
            type_added: re(r"(?m)^\+.*type\s+(\w+)"),
            func_removed: re(r"(?m)^-.*func\s+(\w+)"),
            type_removed: re(r"(?m)^-.*type\s+(\w+)"),
            config_file: re(r"\.(yaml|yml|json|toml)$"),
        }
    })
}

/// Build the one-line structural summary of `ctx.diff`
pub fn extract(ctx: &CommitContext) -> String {
    if ctx.diff.is_empty() {
        return String::new();
    }

    let p = patterns();
    let diff = ctx.diff.as_str();

    let new_paths = captures(&p.new_path, diff);
    let old_paths = captures(&p.old_path, diff);

    let old_set: HashSet<&str> = old_paths.iter().copied().collect();
    let new_set: HashSet<&str> = new_paths.iter().copied().collect();

    let added: Vec<&str> = new_paths
        .iter()
        .copied()
        .filter(|path| !old_set.contains(path))
        .collect();
    let removed: Vec<&str> = old_paths
        .iter()
        .copied()
        .filter(|path| !new_set.contains(path))
        .collect();
    let config: Vec<&str> = new_paths
        .iter()
        .copied()
        .filter(|path| p.config_file.is_match(path))
        .collect();

    let mut clauses = Vec::new();
    push_clause(&mut clauses, "added files", &added);
    push_clause(&mut clauses, "removed files", &removed);
    push_clause(&mut clauses, "config changes", &config);
    push_clause(&mut clauses, "new funcs", &unique(captures(&p.func_added, diff)));
    push_clause(&mut clauses, "new types", &unique(captures(&p.type_added, diff)));
    push_clause(&mut clauses, "removed funcs", &unique(captures(&p.func_removed, diff)));
    push_clause(&mut clauses, "removed types", &unique(captures(&p.type_removed, diff)));

    if clauses.is_empty() {
        return String::new();
    }

    format!(
        "[{}] {} — {}",
        short_hash(&ctx.hash),
        ctx.message,
        clauses.join("; ")
    )
}

/// First capture group of every match, skipping `/dev/null`
fn captures<'d>(re: &Regex, diff: &'d str) -> Vec<&'d str> {
    re.captures_iter(diff)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches('\r'))
        .filter(|s| *s != DEV_NULL)
        .collect()
}

/// Deduplicate, keeping first-seen order
fn unique(items: Vec<&str>) -> Vec<&str> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(*i)).collect()
}

fn push_clause(clauses: &mut Vec<String>, label: &str, items: &[&str]) {
    if !items.is_empty() {
        clauses.push(format!("{}: {}", label, items.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(diff: &str) -> CommitContext {
        CommitContext {
            hash: "abcdef0123456".to_string(),
            message: "feat: things".to_string(),
            author: "dev".to_string(),
            diff: diff.to_string(),
        }
    }

    #[test]
    fn test_empty_diff() {
        assert_eq!(extract(&ctx("")), "");
    }

    #[test]
    fn test_no_signal() {
        let diff = "diff --git a/README b/README\n@@ -1 +1 @@\n-hello\n+hello world\n";
        assert_eq!(extract(&ctx(diff)), "");
    }

    #[test]
    fn test_added_file() {
        let diff = "--- /dev/null\n+++ b/new.go\n@@ -0,0 +1 @@\n+package main\n";
        let out = extract(&ctx(diff));
        assert_eq!(out, "[abcdef0] feat: things — added files: new.go");
    }

    #[test]
    fn test_removed_file() {
        let diff = "--- a/old.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-bye\n";
        let out = extract(&ctx(diff));
        assert_eq!(out, "[abcdef0] feat: things — removed files: old.txt");
    }

    #[test]
    fn test_modified_file_is_neither_added_nor_removed() {
        let diff = "--- a/main.go\n+++ b/main.go\n@@ -1 +1 @@\n-x\n+y\n";
        assert_eq!(extract(&ctx(diff)), "");
    }

    #[test]
    fn test_config_change_on_modified_file() {
        let diff = "--- a/app.yaml\n+++ b/app.yaml\n@@ -1 +1 @@\n-a: 1\n+a: 2\n";
        let out = extract(&ctx(diff));
        assert_eq!(out, "[abcdef0] feat: things — config changes: app.yaml");
    }

    #[test]
    fn test_declarations_deduplicated_in_order() {
        let diff = concat!(
            "--- a/svc.go\n+++ b/svc.go\n",
            "+func Start() {}\n",
            "+type Server struct{}\n",
            "+func Stop() {}\n",
            "+func Start() {}\n",
            "-func Legacy() {}\n",
            "-type Old int\n",
        );
        let out = extract(&ctx(diff));
        assert_eq!(
            out,
            "[abcdef0] feat: things — new funcs: Start, Stop; new types: Server; \
             removed funcs: Legacy; removed types: Old"
        );
    }

    #[test]
    fn test_clause_order() {
        let diff = concat!(
            "--- /dev/null\n+++ b/conf.toml\n+key = 1\n",
            "--- a/gone.rs\n+++ /dev/null\n-fn x() {}\n",
            "--- /dev/null\n+++ b/lib.go\n+func New() {}\n",
        );
        let out = extract(&ctx(diff));
        assert_eq!(
            out,
            "[abcdef0] feat: things — added files: conf.toml, lib.go; removed files: gone.rs; \
             config changes: conf.toml; new funcs: New"
        );
    }

    #[test]
    fn test_short_hash_kept_when_already_short() {
        let mut c = ctx("--- /dev/null\n+++ b/a.go\n");
        c.hash = "abc".to_string();
        assert!(extract(&c).starts_with("[abc] "));
    }
}
