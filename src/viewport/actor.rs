//! A tokio task owning a [`ViewportTracker`].
//!
//! Visibility callbacks, scroll samples, navigation calls and timer expiry
//! arrive from independent sources; the task serializes them through one
//! command channel so the state machine needs no locking.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::book::Anchor;
use crate::config::ViewportConfig;

use super::tracker::{AnchorBounds, PositionReport, ViewportTracker};

#[derive(Debug, Clone)]
pub enum TrackerCommand {
    SetAnchors(Vec<Anchor>),
    Visibility {
        index: usize,
        visible: bool,
        bounds: AnchorBounds,
    },
    Scroll(f64),
    BeginNavigation,
    EndNavigation,
}

/// Sending side of a running tracker. Dropping every handle stops the task.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<TrackerCommand>,
}

impl TrackerHandle {
    /// Queue a command. Returns false once the task has stopped.
    pub fn send(&self, command: TrackerCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn set_anchors(&self, anchors: Vec<Anchor>) -> bool {
        self.send(TrackerCommand::SetAnchors(anchors))
    }

    pub fn visibility(&self, index: usize, visible: bool, bounds: AnchorBounds) -> bool {
        self.send(TrackerCommand::Visibility {
            index,
            visible,
            bounds,
        })
    }

    pub fn scroll(&self, fraction: f64) -> bool {
        self.send(TrackerCommand::Scroll(fraction))
    }

    pub fn begin_navigation(&self) -> bool {
        self.send(TrackerCommand::BeginNavigation)
    }

    pub fn end_navigation(&self) -> bool {
        self.send(TrackerCommand::EndNavigation)
    }
}

/// Spawn the tracker task on the current runtime. Reports arrive on the
/// returned receiver; the task ends when all handles are dropped or the
/// receiver is closed.
pub fn spawn_tracker(
    config: &ViewportConfig,
) -> (TrackerHandle, mpsc::UnboundedReceiver<PositionReport>, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (report_tx, report_rx) = mpsc::unbounded_channel();
    let tracker = ViewportTracker::new(config);
    let task = tokio::spawn(run(tracker, command_rx, report_tx));
    (TrackerHandle { commands: command_tx }, report_rx, task)
}

async fn run(
    mut tracker: ViewportTracker,
    mut commands: mpsc::UnboundedReceiver<TrackerCommand>,
    reports: mpsc::UnboundedSender<PositionReport>,
) {
    loop {
        let deadline = tracker.next_deadline().map(Instant::from_std);
        let report = tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                apply(&mut tracker, command, Instant::now().into_std())
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracker.poll(Instant::now().into_std())
            }
        };

        if let Some(report) = report
            && reports.send(report).is_err()
        {
            break;
        }
    }
    tracing::trace!("Viewport tracker stopped");
}

fn apply(
    tracker: &mut ViewportTracker,
    command: TrackerCommand,
    now: std::time::Instant,
) -> Option<PositionReport> {
    match command {
        TrackerCommand::SetAnchors(anchors) => {
            tracker.set_anchors(anchors);
            None
        }
        TrackerCommand::Visibility {
            index,
            visible,
            bounds,
        } => {
            tracker.on_visibility(index, visible, bounds, now);
            None
        }
        TrackerCommand::Scroll(fraction) => tracker.on_scroll(fraction, now),
        TrackerCommand::BeginNavigation => {
            tracker.begin_programmatic_navigation();
            None
        }
        TrackerCommand::EndNavigation => {
            tracker.end_programmatic_navigation(now);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::book::AnchorId;
    use crate::viewport::ReportKind;

    fn anchors() -> Vec<Anchor> {
        vec![
            Anchor {
                id: AnchorId::FileStart,
                chapter_index: 0,
            },
            Anchor {
                id: AnchorId::Fragment("s1".into()),
                chapter_index: 1,
            },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_debounces_reports() {
        let (handle, mut reports, _task) = spawn_tracker(&ViewportConfig::default());
        handle.set_anchors(anchors());
        handle.visibility(0, true, AnchorBounds::new(0.0, 100.0));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.visibility(1, true, AnchorBounds::new(-20.0, 80.0));

        let report = reports.recv().await.unwrap();
        assert_eq!(report.kind, ReportKind::Anchor);
        assert_eq!(report.chapter_index(), 1);

        handle.scroll(0.25);
        let progress = reports.recv().await.unwrap();
        assert_eq!(progress.kind, ReportKind::Progress);
        assert_eq!(progress.fraction, 0.25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_silent_while_suppressed() {
        let (handle, mut reports, _task) = spawn_tracker(&ViewportConfig::default());
        handle.set_anchors(anchors());
        handle.begin_navigation();
        handle.visibility(1, true, AnchorBounds::new(0.0, 100.0));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(reports.try_recv().is_err());

        handle.end_navigation();
        let start = Instant::now();
        let report = reports.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(report.chapter_index(), 1);
    }

    #[tokio::test]
    async fn test_actor_stops_when_handles_dropped() {
        let (handle, _reports, task) = spawn_tracker(&ViewportConfig::default());
        drop(handle);
        task.await.unwrap();
    }
}
