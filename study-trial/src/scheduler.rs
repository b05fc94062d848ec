use std::collections::BTreeSet;
use study_core::{Frame, TimelineEntry, TimestampMode, TrialConfig, TrialResult, TrialState};
use tracing::{debug, info, warn};

/// Events on the agenda. At equal due times a gap fires before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Event {
    Blank,
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    due_ms: u64,
    event: Event,
}

/// Side effect requested by a state transition, applied by the trial driver
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Show(Frame),
    Hide,
    Finish(TrialResult),
}

/// Timing state machine of a study-items trial.
///
/// The scheduler never reads a clock: callers pass the current time to
/// [`start`](Self::start) and [`advance`](Self::advance), and ask
/// [`next_due`](Self::next_due) when to call again. Frame onsets are spaced by
/// `frame_time + isi` from the trial start, independent of when `advance`
/// actually runs.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    config: TrialConfig,
    state: TrialState,
    start_ms: u64,
    next_index: usize,
    timeline: Vec<TimelineEntry>,
    agenda: BTreeSet<Scheduled>,
}

impl FrameScheduler {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            config,
            state: TrialState::Idle,
            start_ms: 0,
            next_index: 0,
            timeline: Vec::new(),
            agenda: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    /// Entries recorded so far; moved into the result when the trial finishes
    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Absolute time of the earliest pending event
    pub fn next_due(&self) -> Option<u64> {
        self.agenda.first().map(|s| s.due_ms)
    }

    /// Starts the trial and shows the first frame at offset 0
    pub fn start(&mut self, now_ms: u64) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.state != TrialState::Idle {
            warn!(state = ?self.state, "start ignored; trial already started");
            return actions;
        }
        self.start_ms = now_ms;
        self.next_index = 0;
        info!(
            frames = self.config.stimuli.len(),
            period_ms = self.config.period_ms(),
            "study sequence started"
        );
        self.agenda.insert(Scheduled {
            due_ms: now_ms.saturating_add(self.config.period_ms()),
            event: Event::Tick,
        });
        self.on_tick(now_ms, now_ms, &mut actions);
        actions
    }

    /// Fires every event due at or before `now_ms`, in due order
    pub fn advance(&mut self, now_ms: u64) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Some(&next) = self.agenda.first() {
            if next.due_ms > now_ms {
                break;
            }
            self.agenda.pop_first();
            match next.event {
                Event::Tick => {
                    self.agenda.insert(Scheduled {
                        due_ms: next.due_ms.saturating_add(self.config.period_ms()),
                        event: Event::Tick,
                    });
                    self.on_tick(next.due_ms, now_ms, &mut actions);
                }
                Event::Blank => self.on_blank(next.due_ms, now_ms, &mut actions),
            }
        }
        actions
    }

    /// Disarms all pending events without producing a result
    pub fn cancel(&mut self) {
        if self.state.is_running() {
            info!(recorded = self.timeline.len(), "study sequence cancelled");
        }
        self.agenda.clear();
        self.state = TrialState::Finished;
    }

    fn offset(&self, due_ms: u64, now_ms: u64) -> u64 {
        let at = match self.config.timestamps {
            TimestampMode::Observed => now_ms,
            TimestampMode::Scheduled => due_ms,
        };
        at.saturating_sub(self.start_ms)
    }

    fn on_tick(&mut self, due_ms: u64, now_ms: u64, actions: &mut Vec<Action>) {
        let index = self.next_index;
        let Some(frame) = self.config.stimuli.get(index).cloned() else {
            self.finish(actions);
            return;
        };
        self.next_index += 1;
        self.state = TrialState::Running { index };

        let offset_ms = self.offset(due_ms, now_ms);
        debug!(index, offset_ms, "frame shown");
        self.timeline.push(TimelineEntry::frame(frame.clone(), offset_ms));
        actions.push(Action::Show(frame));

        // Relative to the scheduled onset so the gap always precedes the next tick
        if self.config.has_gap() {
            self.agenda.insert(Scheduled {
                due_ms: due_ms.saturating_add(self.config.frame_duration_ms),
                event: Event::Blank,
            });
        }
    }

    fn on_blank(&mut self, due_ms: u64, now_ms: u64, actions: &mut Vec<Action>) {
        let offset_ms = self.offset(due_ms, now_ms);
        debug!(offset_ms, "blank shown");
        self.timeline.push(TimelineEntry::blank(offset_ms));
        actions.push(Action::Hide);
    }

    fn finish(&mut self, actions: &mut Vec<Action>) {
        self.agenda.clear();
        self.state = TrialState::Finished;
        let result = TrialResult::new(std::mem::take(&mut self.timeline));
        info!(entries = result.timeline().len(), "study sequence finished");
        actions.push(Action::Finish(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::Shown;

    fn config(stimuli: &[&str]) -> TrialConfig {
        TrialConfig::new(stimuli.iter().map(|s| Frame::from(*s)).collect())
    }

    /// Advances to each due time in turn, like an exact clock would
    fn run(scheduler: &mut FrameScheduler) -> TrialResult {
        let mut actions = scheduler.start(0);
        loop {
            if let Some(Action::Finish(result)) = actions.pop() {
                return result;
            }
            let due = scheduler.next_due().expect("running trial has a pending event");
            actions = scheduler.advance(due);
        }
    }

    #[test]
    fn first_frame_shows_synchronously() {
        let mut s = FrameScheduler::new(config(&["a", "b"]));
        assert_eq!(s.state(), TrialState::Idle);
        let actions = s.start(1_000);
        assert_eq!(actions, vec![Action::Show(Frame::from("a"))]);
        assert_eq!(s.state(), TrialState::Running { index: 0 });
        assert_eq!(s.timeline(), [TimelineEntry::frame(Frame::from("a"), 0)]);
        assert_eq!(s.next_due(), Some(1_250));
    }

    #[test]
    fn no_gap_spaces_frames_by_duration() {
        let mut s = FrameScheduler::new(config(&["a", "b", "c"]).with_frame_duration(100));
        let result = run(&mut s);
        let offsets: Vec<u64> = result.timeline().iter().map(|e| e.offset_ms).collect();
        assert_eq!(offsets, vec![0, 100, 200]);
        assert!(result.timeline().iter().all(|e| !e.shown.is_blank()));
        assert_eq!(s.state(), TrialState::Finished);
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn gaps_alternate_with_frames() {
        let mut s = FrameScheduler::new(config(&["hello", "dog.png"]).with_isi(50));
        let result = run(&mut s);
        let expected = vec![
            TimelineEntry::frame(Frame::from("hello"), 0),
            TimelineEntry::blank(250),
            TimelineEntry::frame(Frame::from("dog.png"), 300),
            TimelineEntry::blank(550),
        ];
        assert_eq!(result.timeline(), expected.as_slice());
    }

    #[test]
    fn empty_sequence_finishes_on_start() {
        let mut s = FrameScheduler::new(config(&[]));
        let actions = s.start(5);
        assert_eq!(actions, vec![Action::Finish(TrialResult::new(Vec::new()))]);
        assert!(s.state().is_finished());
        assert_eq!(s.next_due(), None);
    }

    #[test]
    fn late_advance_fires_pending_events_in_order() {
        let mut s = FrameScheduler::new(config(&["a", "b"]).with_isi(50));
        s.start(0);
        // Overdue past the gap and the next onset
        let actions = s.advance(320);
        assert_eq!(actions, vec![Action::Hide, Action::Show(Frame::from("b"))]);
        let offsets: Vec<u64> = s.timeline().iter().map(|e| e.offset_ms).collect();
        assert_eq!(offsets, vec![0, 320, 320]);
        // Onsets stay on the start-relative grid
        assert_eq!(s.next_due(), Some(550));
    }

    #[test]
    fn scheduled_mode_records_nominal_offsets() {
        let cfg = config(&["a", "b"])
            .with_isi(50)
            .with_timestamps(TimestampMode::Scheduled);
        let mut s = FrameScheduler::new(cfg);
        s.start(10);
        s.advance(275);
        s.advance(333);
        let offsets: Vec<u64> = s.timeline().iter().map(|e| e.offset_ms).collect();
        assert_eq!(offsets, vec![0, 250, 300]);
    }

    #[test]
    fn zero_durations_still_terminate() {
        let cfg = config(&["a", "b", "c"]).with_frame_duration(0);
        let mut s = FrameScheduler::new(cfg);
        s.start(0);
        let actions = s.advance(0);
        assert_eq!(actions.len(), 3);
        assert!(matches!(actions.last(), Some(Action::Finish(r)) if r.timeline().len() == 3));
    }

    #[test]
    fn zero_frame_time_with_gap_hides_before_next_frame() {
        let cfg = config(&["a", "b"]).with_frame_duration(0).with_isi(30);
        let mut s = FrameScheduler::new(cfg);
        let result = run(&mut s);
        let shown: Vec<(bool, u64)> = result
            .timeline()
            .iter()
            .map(|e| (e.shown.is_blank(), e.offset_ms))
            .collect();
        assert_eq!(shown, vec![(false, 0), (true, 0), (false, 30), (true, 30)]);
    }

    #[test]
    fn huge_durations_saturate_instead_of_overflowing() {
        let cfg = config(&["a", "b"])
            .with_frame_duration(u64::MAX)
            .with_isi(1);
        let mut s = FrameScheduler::new(cfg);
        assert_eq!(s.start(0), vec![Action::Show(Frame::from("a"))]);
        assert_eq!(s.next_due(), Some(u64::MAX));
        assert!(s.advance(u64::MAX - 1).is_empty());
        // every remaining event collapses onto the end of the clock
        let actions = s.advance(u64::MAX);
        assert!(matches!(actions.last(), Some(Action::Finish(_))));
        assert!(s.state().is_finished());
    }

    #[test]
    fn cancel_disarms_without_result() {
        let mut s = FrameScheduler::new(config(&["a", "b"]));
        s.start(0);
        s.cancel();
        assert_eq!(s.next_due(), None);
        assert!(s.advance(10_000).is_empty());
        assert!(s.state().is_finished());
    }

    #[test]
    fn restart_is_ignored() {
        let mut s = FrameScheduler::new(config(&["a"]));
        s.start(0);
        assert!(s.start(100).is_empty());
        assert_eq!(s.timeline().len(), 1);
    }

    #[test]
    fn grouped_frames_are_logged_whole() {
        let cfg = TrialConfig::new(vec![Frame::from(vec!["cat.jpg", "dog"])]);
        let result = run(&mut FrameScheduler::new(cfg));
        assert_eq!(
            result.timeline()[0].shown,
            Shown::Frame(Frame::from(vec!["cat.jpg", "dog"]))
        );
    }
}
