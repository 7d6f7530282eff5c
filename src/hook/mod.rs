//! Hook module - commit intelligence
//!
//! A managed `post-commit` shim calls back into `mem hook run`, which turns
//! the commit's diff into derived memories.
//!
//! # Pipeline
//! ```text
//! post-commit ─► CommitContext::gather ─► HookPipeline::run_hook
//!                                           ├─ extract   ─► <prefix>/<hash7>
//!                                           ├─ summarize ─► <prefix>/<hash7>[/summary]
//!                                           ├─ script    (stdin = diff)
//!                                           └─ reindex request (fire and forget)
//! ```
//!
//! Every strategy is best effort: a failure becomes a warning and never
//! stops its siblings or the commit that triggered the hook.

pub mod context;
pub mod extract;
pub mod install;
pub mod strategy;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collab::{Collaborator, Provider};
use crate::config::{HookConfig, DEFAULT_HOOK_PREFIX};
use crate::core::history::short_hash;
use crate::core::key::Key;
use crate::core::store::VersionedStore;
use crate::error::{MemError, Result};

pub use context::CommitContext;
pub use extract::extract;
pub use install::{hook_script, install, is_managed_hook, uninstall, InstallOptions, HOOK_MARKER, POST_COMMIT};

/// How a commit diff becomes a derived memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Extract,
    Summarize,
    Script,
    All,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Extract => write!(f, "extract"),
            Strategy::Summarize => write!(f, "summarize"),
            Strategy::Script => write!(f, "script"),
            Strategy::All => write!(f, "all"),
        }
    }
}

impl FromStr for Strategy {
    type Err = MemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" | "extract" => Ok(Strategy::Extract),
            "summarize" => Ok(Strategy::Summarize),
            "script" => Ok(Strategy::Script),
            "all" => Ok(Strategy::All),
            _ => Err(MemError::Config(format!(
                "unknown hook strategy: {} (expected extract, summarize, script or all)",
                s
            ))),
        }
    }
}

/// Where derived memories are written
pub trait MemorySink {
    fn store(&self, key: &Key, content: &str) -> Result<()>;
}

impl MemorySink for VersionedStore {
    /// Stage the derived memory; the user commits it with the rest
    fn store(&self, key: &Key, content: &str) -> Result<()> {
        if self.is_ignored(key) {
            return Err(MemError::Ignored(key.to_string()));
        }
        self.save(key, content.as_bytes())
    }
}

/// What one hook invocation did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HookReport {
    /// Keys written, in strategy order
    pub stored: Vec<Key>,
    pub warnings: Vec<String>,
    pub script_ran: bool,
    pub reindex_requested: bool,
}

/// Runs the configured strategies for one commit
pub struct HookPipeline<'a> {
    config: &'a HookConfig,
    sink: &'a dyn MemorySink,
    provider: Option<&'a Collaborator<Box<dyn Provider>>>,
    reindex: Option<&'a (dyn Fn() -> bool + Send + Sync)>,
}

impl<'a> HookPipeline<'a> {
    pub fn new(config: &'a HookConfig, sink: &'a dyn MemorySink) -> Self {
        Self {
            config,
            sink,
            provider: None,
            reindex: None,
        }
    }

    pub fn with_provider(mut self, provider: &'a Collaborator<Box<dyn Provider>>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Callback requesting a background reindex; returns whether one was started
    pub fn on_reindex(mut self, reindex: &'a (dyn Fn() -> bool + Send + Sync)) -> Self {
        self.reindex = Some(reindex);
        self
    }

    /// Run the pipeline; never fails
    ///
    /// No-op unless `hook_type` is `post-commit`, the hook is enabled and the
    /// diff is non-empty.
    pub async fn run_hook(
        &self,
        hook_type: &str,
        ctx: &CommitContext,
        cancel: &CancellationToken,
    ) -> HookReport {
        let mut report = HookReport::default();

        if hook_type != POST_COMMIT || !self.config.enabled || ctx.diff.is_empty() {
            debug!(hook_type, enabled = self.config.enabled, "hook skipped");
            return report;
        }

        let base = self.base_key(ctx);

        match self.config.strategy {
            Strategy::Extract => self.run_extract(ctx, &base, &mut report),
            Strategy::Summarize => self.run_summarize(ctx, &base, &mut report).await,
            Strategy::Script => self.run_script(ctx, cancel, &mut report).await,
            Strategy::All => {
                self.run_extract(ctx, &base, &mut report);
                if !cancel.is_cancelled() {
                    let summary_key = format!("{}/summary", base);
                    self.run_summarize(ctx, &summary_key, &mut report).await;
                }
                if self.config.script.is_some() {
                    self.run_script(ctx, cancel, &mut report).await;
                }
            }
        }

        if let Some(reindex) = self.reindex {
            report.reindex_requested = reindex();
        }

        report
    }

    fn base_key(&self, ctx: &CommitContext) -> String {
        let prefix = self.config.key_prefix.trim_end_matches('/');
        let prefix = if prefix.is_empty() {
            DEFAULT_HOOK_PREFIX
        } else {
            prefix
        };
        format!("{}/{}", prefix, short_hash(&ctx.hash))
    }

    fn run_extract(&self, ctx: &CommitContext, key: &str, report: &mut HookReport) {
        let summary = extract(ctx);
        if summary.is_empty() {
            debug!("extract found no signal");
            return;
        }
        self.store(key, &summary, "extract store", report);
    }

    async fn run_summarize(&self, ctx: &CommitContext, key: &str, report: &mut HookReport) {
        let provider = match self.provider {
            Some(Collaborator::Available(p)) => p,
            Some(Collaborator::Unavailable(reason)) => {
                self.warn(report, format!("summarize: skipped, {}", reason));
                return;
            }
            None => {
                self.warn(report, "summarize: skipped, no provider configured".to_string());
                return;
            }
        };

        match strategy::summarize(ctx, provider.as_ref()).await {
            Ok(summary) if summary.is_empty() => {
                self.warn(report, "summarize: provider returned nothing".to_string())
            }
            Ok(summary) => self.store(key, &summary, "summarize store", report),
            Err(e) => self.warn(report, format!("summarize: {}", e)),
        }
    }

    async fn run_script(&self, ctx: &CommitContext, cancel: &CancellationToken, report: &mut HookReport) {
        let Some(script) = &self.config.script else {
            self.warn(report, "script: no script configured".to_string());
            return;
        };
        if cancel.is_cancelled() {
            self.warn(report, "script: cancelled".to_string());
            return;
        }

        match strategy::run_script(ctx, script).await {
            Ok(()) => report.script_ran = true,
            Err(e) => self.warn(report, format!("script: {}", e)),
        }
    }

    fn store(&self, key: &str, content: &str, label: &str, report: &mut HookReport) {
        let result = Key::parse(key).and_then(|k| self.sink.store(&k, content).map(|()| k));
        match result {
            Ok(k) => {
                debug!(key = %k, "stored derived memory");
                report.stored.push(k);
            }
            Err(e) => self.warn(report, format!("{}: {}", label, e)),
        }
    }

    fn warn(&self, report: &mut HookReport, msg: String) {
        warn!(target: "mem::hook", "{}", msg);
        if !self.config.quiet {
            eprintln!("mem hook: {}", msg);
        }
        report.warnings.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        entries: RefCell<BTreeMap<String, String>>,
        fail: bool,
    }

    impl MemorySink for RecordingSink {
        fn store(&self, key: &Key, content: &str) -> Result<()> {
            if self.fail {
                return Err(MemError::Collaborator("disk full".into()));
            }
            self.entries
                .borrow_mut()
                .insert(key.to_string(), content.to_string());
            Ok(())
        }
    }

    struct CannedProvider(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl Provider for CannedProvider {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|e| MemError::Collaborator(e.to_string()))
        }

        async fn generate_object(
            &self,
            _prompt: &str,
            _schema: &serde_json::Value,
        ) -> Result<serde_json::Value> {
            Err(MemError::Collaborator("unused".into()))
        }
    }

    fn config(strategy: Strategy) -> HookConfig {
        HookConfig {
            enabled: true,
            strategy,
            quiet: true,
            ..HookConfig::default()
        }
    }

    fn ctx() -> CommitContext {
        CommitContext {
            hash: "abcdef0123".into(),
            message: "add service".into(),
            author: "dev".into(),
            diff: "--- /dev/null\n+++ b/svc.go\n+func Serve() {}\n".into(),
        }
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("".parse::<Strategy>().unwrap(), Strategy::Extract);
        assert_eq!("ALL".parse::<Strategy>().unwrap(), Strategy::All);
        assert_eq!(Strategy::Summarize.to_string(), "summarize");
        assert!("magic".parse::<Strategy>().is_err());
    }

    #[tokio::test]
    async fn test_noop_conditions() {
        let sink = RecordingSink::default();
        let cancel = CancellationToken::new();

        let cfg = config(Strategy::Extract);
        let pipeline = HookPipeline::new(&cfg, &sink);
        assert_eq!(pipeline.run_hook("pre-commit", &ctx(), &cancel).await, HookReport::default());

        let empty = CommitContext {
            diff: String::new(),
            ..ctx()
        };
        assert_eq!(pipeline.run_hook(POST_COMMIT, &empty, &cancel).await, HookReport::default());

        let disabled = HookConfig {
            enabled: false,
            ..config(Strategy::Extract)
        };
        let pipeline = HookPipeline::new(&disabled, &sink);
        assert_eq!(pipeline.run_hook(POST_COMMIT, &ctx(), &cancel).await, HookReport::default());

        assert!(sink.entries.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_extract_stores_under_short_hash() {
        let sink = RecordingSink::default();
        let cfg = config(Strategy::Extract);
        let report = HookPipeline::new(&cfg, &sink)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;

        assert!(report.warnings.is_empty());
        let entries = sink.entries.borrow();
        let stored = entries.get("hooks/commits/abcdef0").unwrap();
        assert!(stored.contains("added files: svc.go"));
        assert!(stored.contains("new funcs: Serve"));
    }

    #[tokio::test]
    async fn test_custom_prefix_trailing_slash() {
        let sink = RecordingSink::default();
        let cfg = HookConfig {
            key_prefix: "log/".into(),
            ..config(Strategy::Extract)
        };
        let report = HookPipeline::new(&cfg, &sink)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;
        assert_eq!(report.stored, vec![Key::parse("log/abcdef0").unwrap()]);
    }

    #[tokio::test]
    async fn test_summarize_without_provider_warns() {
        let sink = RecordingSink::default();
        let cfg = config(Strategy::Summarize);
        let provider: Collaborator<Box<dyn Provider>> =
            Collaborator::Unavailable("no default provider".into());

        let report = HookPipeline::new(&cfg, &sink)
            .with_provider(&provider)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;

        assert!(report.stored.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("summarize:"));
    }

    #[tokio::test]
    async fn test_all_runs_siblings_despite_failure() {
        let sink = RecordingSink::default();
        let cfg = config(Strategy::All);
        let provider: Collaborator<Box<dyn Provider>> =
            Collaborator::Available(Box::new(CannedProvider(Err("rate limited"))));
        let calls = AtomicUsize::new(0);
        let reindex = || {
            calls.fetch_add(1, Ordering::SeqCst);
            true
        };

        let report = HookPipeline::new(&cfg, &sink)
            .with_provider(&provider)
            .on_reindex(&reindex)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;

        assert_eq!(report.stored, vec![Key::parse("hooks/commits/abcdef0").unwrap()]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("rate limited"));
        assert!(!report.script_ran);
        assert!(report.reindex_requested);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_stores_summary_key() {
        let sink = RecordingSink::default();
        let cfg = config(Strategy::All);
        let provider: Collaborator<Box<dyn Provider>> =
            Collaborator::Available(Box::new(CannedProvider(Ok("  Adds a service.  "))));

        let report = HookPipeline::new(&cfg, &sink)
            .with_provider(&provider)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;

        assert!(report.warnings.is_empty());
        let entries = sink.entries.borrow();
        assert_eq!(
            entries.get("hooks/commits/abcdef0/summary").map(String::as_str),
            Some("Adds a service.")
        );
        assert!(entries.contains_key("hooks/commits/abcdef0"));
    }

    #[tokio::test]
    async fn test_sink_failure_is_warning() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let cfg = config(Strategy::Extract);
        let calls = AtomicUsize::new(0);
        let reindex = || {
            calls.fetch_add(1, Ordering::SeqCst);
            false
        };

        let report = HookPipeline::new(&cfg, &sink)
            .on_reindex(&reindex)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;

        assert!(report.stored.is_empty());
        assert!(report.warnings[0].starts_with("extract store:"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_script_strategy_without_script_warns() {
        let sink = RecordingSink::default();
        let cfg = config(Strategy::Script);
        let report = HookPipeline::new(&cfg, &sink)
            .run_hook(POST_COMMIT, &ctx(), &CancellationToken::new())
            .await;
        assert_eq!(report.warnings, vec!["script: no script configured".to_string()]);
    }

    #[test]
    fn test_versioned_store_sink_respects_ignore() {
        use crate::core::scope::Scope;

        let tmp = tempfile::TempDir::new().unwrap();
        let scope = Scope::project(tmp.path().join("p"));
        VersionedStore::init(&scope).unwrap();
        std::fs::write(scope.ignore_path(), "hooks/\n").unwrap();
        let store = VersionedStore::open(&scope).unwrap();

        let key = Key::parse("hooks/commits/abc").unwrap();
        assert!(matches!(store.store(&key, "x"), Err(MemError::Ignored(_))));

        let other = Key::parse("notes/abc").unwrap();
        store.store(&other, "x").unwrap();
        assert_eq!(store.get(&other).unwrap().content, b"x");
    }
}
