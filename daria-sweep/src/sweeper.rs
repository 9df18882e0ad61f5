//! Integrity sweeper
//!
//! Removes zero-byte session files, then rewrites every discussion guide so
//! its `sessions` list only names sessions that still exist. All deletions
//! complete before the first guide is read.

use std::collections::BTreeSet;

use daria_common::guide_store::GuideSessions;
use daria_common::{Error, GuideHandle, GuideStore, PipelineEvent, Result, SessionStore};
use serde::Serialize;

/// Sweep behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    /// Report what would change without touching the filesystem
    pub dry_run: bool,
}

/// Counters for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub sessions_scanned: usize,
    pub sessions_deleted: usize,
    pub guides_scanned: usize,
    pub guides_updated: usize,
    pub guides_skipped: usize,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Ids of sessions backed by a non-empty file
    pub valid_ids: BTreeSet<String>,
    /// Events in emission order
    pub events: Vec<PipelineEvent>,
    pub stats: SweepStats,
    pub dry_run: bool,
}

impl SweepReport {
    fn record(&mut self, event: PipelineEvent) {
        event.log();
        self.events.push(event);
    }
}

/// Enforces referential integrity between session files and guides
pub struct IntegritySweeper {
    sessions: SessionStore,
    guides: GuideStore,
    options: SweepOptions,
}

impl IntegritySweeper {
    pub fn new(sessions: SessionStore, guides: GuideStore) -> Self {
        Self {
            sessions,
            guides,
            options: SweepOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.sessions
    }

    /// Both directories must exist before anything is modified
    pub fn check_directories(&self) -> Result<()> {
        self.sessions.ensure_exists()?;
        self.guides.ensure_exists()
    }

    /// Run one sweep
    ///
    /// Only a missing sessions or guides directory is an error; per-file
    /// failures are recorded as events and the sweep carries on.
    pub fn sweep(&self) -> Result<SweepReport> {
        self.check_directories()?;

        let mut report = SweepReport {
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        if self.options.dry_run {
            tracing::info!("Dry run: no sessions will be deleted and no guides written");
        }

        self.sweep_sessions(&mut report)?;
        self.sweep_guides(&mut report)?;

        tracing::info!(
            sessions_scanned = report.stats.sessions_scanned,
            sessions_deleted = report.stats.sessions_deleted,
            guides_scanned = report.stats.guides_scanned,
            guides_updated = report.stats.guides_updated,
            guides_skipped = report.stats.guides_skipped,
            "Sweep complete"
        );

        Ok(report)
    }

    /// Phase 1: delete empty session files and collect the valid id set
    fn sweep_sessions(&self, report: &mut SweepReport) -> Result<()> {
        let ids = self.sessions.list_session_ids()?;
        report.stats.sessions_scanned = ids.len();

        for id in ids {
            match self.sessions.size(&id) {
                Ok(0) => self.remove_empty(&id, report),
                Ok(_) => {
                    report.valid_ids.insert(id);
                }
                Err(Error::MissingSession(_)) => {
                    tracing::debug!("Session {} disappeared during sweep", id);
                }
                Err(e) => {
                    report.record(PipelineEvent::SessionIoFailure {
                        session_id: id.clone(),
                        reason: e.to_string(),
                    });
                    report.valid_ids.insert(id);
                }
            }
        }

        Ok(())
    }

    fn remove_empty(&self, id: &str, report: &mut SweepReport) {
        if !self.options.dry_run {
            match self.sessions.delete(id) {
                Ok(()) | Err(Error::MissingSession(_)) => {}
                Err(e) => {
                    report.record(PipelineEvent::SessionIoFailure {
                        session_id: id.to_string(),
                        reason: format!("delete failed: {}", e),
                    });
                    return;
                }
            }
        }

        report.stats.sessions_deleted += 1;
        report.record(PipelineEvent::DeletedEmptySession {
            session_id: id.to_string(),
        });
    }

    /// Phase 2: drop dangling references from every guide
    fn sweep_guides(&self, report: &mut SweepReport) -> Result<()> {
        let guides = self.guides.list_guides()?;
        report.stats.guides_scanned = guides.len();

        for handle in guides {
            self.sweep_guide(&handle, report);
        }

        Ok(())
    }

    fn sweep_guide(&self, handle: &GuideHandle, report: &mut SweepReport) {
        let mut doc = match self.guides.load(handle) {
            Ok(doc) => doc,
            Err(e) => {
                report.stats.guides_skipped += 1;
                report.record(PipelineEvent::SkippedGuide {
                    guide: handle.to_string(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        let before = match doc.sessions() {
            GuideSessions::Ids(ids) => ids,
            GuideSessions::Absent | GuideSessions::NotAList => {
                tracing::debug!("Guide {} has no session list", handle);
                return;
            }
            GuideSessions::NonStringEntries => {
                report.stats.guides_skipped += 1;
                report.record(PipelineEvent::SkippedGuide {
                    guide: handle.to_string(),
                    reason: "sessions list contains non-string entries".to_string(),
                });
                return;
            }
        };

        let cleaned = retain_valid(&before, &report.valid_ids);
        if cleaned.len() == before.len() {
            return;
        }

        let kept: BTreeSet<&String> = cleaned.iter().collect();
        let removed_ids: Vec<String> = before
            .iter()
            .filter(|id| !kept.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        if !self.options.dry_run {
            doc.set_sessions(cleaned);
            if let Err(e) = self.guides.save(handle, &doc) {
                report.stats.guides_skipped += 1;
                report.record(PipelineEvent::SkippedGuide {
                    guide: handle.to_string(),
                    reason: format!("save failed: {}", e),
                });
                return;
            }
        }

        report.stats.guides_updated += 1;
        report.record(PipelineEvent::UpdatedGuide {
            guide: handle.to_string(),
            removed_ids,
        });
    }
}

/// Stable filter of `ids` to members of `valid`, duplicates preserved
pub fn retain_valid(ids: &[String], valid: &BTreeSet<String>) -> Vec<String> {
    ids.iter().filter(|id| valid.contains(*id)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn list(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_retain_valid_is_stable_and_keeps_duplicates() {
        let valid = set(&["a", "c"]);
        assert_eq!(
            retain_valid(&list(&["c", "b", "a", "c", "d"]), &valid),
            list(&["c", "a", "c"])
        );
    }

    #[test]
    fn test_retain_valid_empty_list() {
        assert!(retain_valid(&[], &set(&["a"])).is_empty());
    }
}
