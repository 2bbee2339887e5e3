//! Progress events and their per-tournament broadcast channel.
//!
//! Delivery is best effort: publishing never blocks, and a subscriber that
//! falls behind loses the oldest events instead of stalling the search.

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

use super::evolution::Phase;
use super::model::TournamentId;

/// Kind of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    /// A run was accepted.
    Started,
    /// A phase began.
    PhaseStarted,
    /// Periodic best-score update.
    Progress,
    /// A phase finished.
    PhaseCompleted,
    /// A result is available.
    Completed,
    /// The run failed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl ProgressKind {
    /// Wire name, as used for the `type` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::PhaseStarted => "phase_started",
            Self::Progress => "progress",
            Self::PhaseCompleted => "phase_completed",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further events follow for this run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Event kind, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: ProgressKind,
    /// Phase the event belongs to, if any.
    pub phase: Option<Phase>,
    /// Global generation counter of the phase.
    pub iteration: Option<u64>,
    /// Best objective value so far.
    pub best_score: Option<f64>,
    /// Human readable detail.
    pub message: Option<String>,
    /// Tournament the run belongs to.
    pub tournament_id: TournamentId,
}

impl ProgressEvent {
    fn bare(kind: ProgressKind, tournament_id: TournamentId) -> Self {
        Self { kind, phase: None, iteration: None, best_score: None, message: None, tournament_id }
    }

    /// A run was accepted.
    #[must_use]
    pub fn started(tournament_id: TournamentId) -> Self {
        Self::bare(ProgressKind::Started, tournament_id)
    }

    /// A phase began.
    #[must_use]
    pub fn phase_started(tournament_id: TournamentId, phase: Phase) -> Self {
        Self { phase: Some(phase), ..Self::bare(ProgressKind::PhaseStarted, tournament_id) }
    }

    /// Periodic update.
    #[must_use]
    pub fn progress(tournament_id: TournamentId, phase: Phase, iteration: u64, best_score: f64) -> Self {
        Self {
            phase: Some(phase),
            iteration: Some(iteration),
            best_score: Some(best_score),
            ..Self::bare(ProgressKind::Progress, tournament_id)
        }
    }

    /// A phase finished.
    #[must_use]
    pub fn phase_completed(tournament_id: TournamentId, phase: Phase, best_score: f64) -> Self {
        Self {
            phase: Some(phase),
            best_score: Some(best_score),
            ..Self::bare(ProgressKind::PhaseCompleted, tournament_id)
        }
    }

    /// A result is available.
    #[must_use]
    pub fn completed(tournament_id: TournamentId, final_score: f64, message: impl Into<String>) -> Self {
        Self {
            best_score: Some(final_score),
            message: Some(message.into()),
            ..Self::bare(ProgressKind::Completed, tournament_id)
        }
    }

    /// The run failed.
    #[must_use]
    pub fn failed(tournament_id: TournamentId, message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), ..Self::bare(ProgressKind::Failed, tournament_id) }
    }

    /// The run was cancelled.
    #[must_use]
    pub fn cancelled(tournament_id: TournamentId) -> Self {
        Self::bare(ProgressKind::Cancelled, tournament_id)
    }
}

/// Bounded broadcast channel of one tournament's progress.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressChannel {
    /// Channel buffering at most `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers; returns how many received it.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// New subscription starting with the next published event.
    #[must_use]
    pub fn subscribe(&self) -> ProgressSubscription {
        ProgressSubscription { receiver: self.sender.subscribe(), finished: false }
    }

    /// Live subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end of a [`ProgressChannel`]; ends after a terminal event.
#[derive(Debug)]
pub struct ProgressSubscription {
    receiver: broadcast::Receiver<ProgressEvent>,
    finished: bool,
}

impl ProgressSubscription {
    /// Next event, skipping over events lost to lag.
    ///
    /// Returns `None` once a terminal event was delivered or the channel closed.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(self.mark(event)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "progress subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Non-blocking variant of [`ProgressSubscription::next`].
    pub fn try_next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(self.mark(event)),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "progress subscriber lagged");
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    fn mark(&mut self, event: ProgressEvent) -> ProgressEvent {
        self.finished = event.kind.is_terminal();
        event
    }

    /// Adapt into a stream that ends after the terminal event.
    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        stream::unfold(self, |mut sub| async move { sub.next().await.map(|event| (event, sub)) })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = ProgressEvent::progress(7, Phase::BoatSchedule, 1_000, 12.5);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["phase"], "boat_schedule");
        assert_eq!(json["bestScore"], 12.5);
        assert_eq!(json["tournamentId"], 7);
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let channel = ProgressChannel::new(4);
        assert_eq!(channel.publish(ProgressEvent::started(1)), 0);
    }

    #[test]
    fn lagging_subscriber_keeps_newest_events() {
        let channel = ProgressChannel::new(2);
        let mut sub = channel.subscribe();
        for i in 0..5 {
            channel.publish(ProgressEvent::progress(1, Phase::MatchMatrix, i, 0.0));
        }
        let first = sub.try_next().unwrap();
        assert_eq!(first.iteration, Some(3));
        assert_eq!(sub.try_next().unwrap().iteration, Some(4));
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn stream_ends_after_terminal_event() {
        let channel = ProgressChannel::new(8);
        let sub = channel.subscribe();
        channel.publish(ProgressEvent::started(3));
        channel.publish(ProgressEvent::cancelled(3));
        channel.publish(ProgressEvent::started(3));
        let kinds: Vec<ProgressKind> = sub.into_stream().map(|e| e.kind).collect().await;
        assert_eq!(kinds, vec![ProgressKind::Started, ProgressKind::Cancelled]);
    }
}
