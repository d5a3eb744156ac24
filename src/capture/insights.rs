//! Analysis results attached to a stream
//!
//! Analysis runs on tokio tasks that may finish in any order and may outlive
//! the frame that triggered them. Everything here is updated with a single
//! atomic swap, add or append so readers never see a half-applied result.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::runtime::Handle;

use super::shared::StreamShared;
use crate::analysis::{AnalysisError, AnalysisHook, Annotation, Highlight, RewardPolicy};
use crate::frame::EncodedFrame;

#[derive(Debug, Default)]
struct Annotated {
    sequence: Option<u64>,
    annotations: Vec<Annotation>,
}

/// Latest annotations, highlight history and reward score
#[derive(Debug, Default)]
pub(crate) struct Insights {
    latest: ArcSwap<Annotated>,
    highlights: Mutex<Vec<Highlight>>,
    reward: AtomicU64,
    inflight: AtomicUsize,
}

/// Counts one in-flight analysis until dropped
pub(crate) struct InflightPermit(Arc<Insights>);

impl Drop for InflightPermit {
    fn drop(&mut self) {
        self.0.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Insights {
    /// Reserve an analysis slot if fewer than `max` are running
    pub(crate) fn try_acquire(self: &Arc<Self>, max: usize) -> Option<InflightPermit> {
        self.inflight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .ok()
            .map(|_| InflightPermit(Arc::clone(self)))
    }

    pub(crate) fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Apply one analysis result for the frame numbered `sequence`
    ///
    /// Reward and highlights always accumulate. The stored annotation list is
    /// only replaced if no result for a newer frame has landed already.
    /// Returns the reward added and the highlights recorded.
    pub(crate) fn apply(
        &self,
        sequence: u64,
        annotations: Vec<Annotation>,
        policy: &RewardPolicy,
    ) -> (u64, Vec<Highlight>) {
        let eval = policy.evaluate(&annotations, Utc::now());

        self.reward.fetch_add(eval.reward, Ordering::AcqRel);
        if !eval.highlights.is_empty() {
            self.highlights
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(eval.highlights.iter().cloned());
        }

        let fresh = Arc::new(Annotated {
            sequence: Some(sequence),
            annotations,
        });
        self.latest.rcu(|current| {
            if current.sequence.map_or(false, |stored| stored > sequence) {
                Arc::clone(current)
            } else {
                Arc::clone(&fresh)
            }
        });

        (eval.reward, eval.highlights)
    }

    pub(crate) fn annotations(&self) -> Vec<Annotation> {
        self.latest.load().annotations.clone()
    }

    pub(crate) fn annotation_count(&self) -> usize {
        self.latest.load().annotations.len()
    }

    /// The last `count` highlights, oldest first
    pub(crate) fn recent_highlights(&self, count: usize) -> Vec<Highlight> {
        let highlights = self.highlights.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = highlights.len().saturating_sub(count);
        highlights[skip..].to_vec()
    }

    pub(crate) fn highlight_count(&self) -> usize {
        self.highlights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn reward_score(&self) -> u64 {
        self.reward.load(Ordering::Acquire)
    }
}

/// Run `hook` on `frame` in the background, bounded by the stream's
/// in-flight cap and analysis timeout
pub(crate) fn dispatch(
    shared: &Arc<StreamShared>,
    hook: &Arc<dyn AnalysisHook>,
    frame: Arc<EncodedFrame>,
    runtime: &Handle,
) {
    let config = &shared.config;
    let Some(permit) = shared.insights.try_acquire(config.max_inflight_analyses) else {
        tracing::debug!(
            stream = %shared.descriptor.id,
            sequence = frame.sequence,
            "Analysis backlog full, skipping frame"
        );
        return;
    };

    let shared = Arc::clone(shared);
    let hook = Arc::clone(hook);
    runtime.spawn(async move {
        let _permit = permit;
        let timeout = shared.config.analysis_timeout;

        let result = match tokio::time::timeout(timeout, hook.analyze(&frame)).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout),
        };

        match result {
            Ok(annotations) => {
                let count = annotations.len();
                let (reward, highlights) =
                    shared
                        .insights
                        .apply(frame.sequence, annotations, &shared.config.reward);

                tracing::debug!(
                    stream = %shared.descriptor.id,
                    sequence = frame.sequence,
                    annotations = count,
                    reward = reward,
                    "Analysis applied"
                );
                for highlight in highlights {
                    tracing::info!(
                        stream = %shared.descriptor.id,
                        kind = %highlight.kind,
                        confidence = highlight.confidence,
                        "Highlight recorded"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    stream = %shared.descriptor.id,
                    sequence = frame.sequence,
                    error = %e,
                    "Analysis failed"
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_accumulates_reward() {
        let insights = Insights::default();
        let policy = RewardPolicy::default();

        insights.apply(0, vec![Annotation::new("dog", 0.95)], &policy);
        insights.apply(5, vec![Annotation::new("dog", 0.5)], &policy);
        insights.apply(10, vec![Annotation::new("cat", 0.9)], &policy);

        // 9 + 0 + floor(7.2)
        assert_eq!(insights.reward_score(), 16);
    }

    #[test]
    fn test_older_result_does_not_replace_newer() {
        let insights = Insights::default();
        let policy = RewardPolicy::default();

        insights.apply(10, vec![Annotation::new("cat", 0.9)], &policy);
        insights.apply(5, vec![Annotation::new("dog", 0.95)], &policy);

        assert_eq!(insights.annotations(), vec![Annotation::new("cat", 0.9)]);
        // Reward from the late result still counts
        assert_eq!(insights.reward_score(), 7 + 9);
    }

    #[test]
    fn test_empty_result_clears_annotations() {
        let insights = Insights::default();
        let policy = RewardPolicy::default();

        insights.apply(0, vec![Annotation::new("dog", 0.95)], &policy);
        insights.apply(5, Vec::new(), &policy);

        assert_eq!(insights.annotation_count(), 0);
    }

    #[test]
    fn test_recent_highlights_keeps_order() {
        let insights = Insights::default();
        let policy = RewardPolicy::default();

        for (seq, tag) in [(0, "playing"), (5, "trick"), (10, "playing")] {
            insights.apply(seq, vec![Annotation::new(tag, 0.95)], &policy);
        }

        let recent = insights.recent_highlights(2);
        assert_eq!(insights.highlight_count(), 3);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, "trick");
        assert_eq!(recent[1].kind, "playing");
        assert_eq!(insights.recent_highlights(10).len(), 3);
    }

    #[test]
    fn test_inflight_cap() {
        let insights = Arc::new(Insights::default());

        let first = insights.try_acquire(2).unwrap();
        let _second = insights.try_acquire(2).unwrap();
        assert!(insights.try_acquire(2).is_none());
        assert_eq!(insights.inflight(), 2);

        drop(first);
        assert_eq!(insights.inflight(), 1);
        assert!(insights.try_acquire(2).is_some());
    }
}
