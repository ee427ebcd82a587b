//! Per-actor, per-ability cooldown and rate-window bookkeeping
//!
//! Every query takes the current time explicitly. Missing actors or
//! abilities are treated as "never activated"; nothing here returns an error.

use ahash::AHashMap;

use crate::core::types::{ActorId, EpochMillis};

/// Length of the rolling rate-limit window
pub const RATE_WINDOW_MS: u64 = 1_000;

/// Activation counter for the current one-second window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateWindow {
    pub window_start: EpochMillis,
    pub count: u32,
}

impl RateWindow {
    fn is_expired(&self, now: EpochMillis) -> bool {
        now.saturating_sub(self.window_start) >= RATE_WINDOW_MS
    }
}

/// Cooldown state for one (actor, ability) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownRecord {
    /// Last activation; `None` until the ability first fires
    pub last_activation: Option<EpochMillis>,
    /// `None` until the first increment
    pub rate: Option<RateWindow>,
}

/// Tracks cooldowns and activation rates for every online actor
#[derive(Debug, Default)]
pub struct CooldownTracker {
    records: AHashMap<ActorId, AHashMap<String, CooldownRecord>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, actor: ActorId, ability: &str) -> Option<&CooldownRecord> {
        self.records.get(&actor).and_then(|m| m.get(ability))
    }

    fn entry(&mut self, actor: ActorId, ability: &str) -> &mut CooldownRecord {
        self.records
            .entry(actor)
            .or_default()
            .entry(ability.to_string())
            .or_default()
    }

    /// True while `cooldown_ms` has not elapsed since the last activation.
    /// A non-positive cooldown disables the check.
    pub fn is_on_cooldown(
        &self,
        actor: ActorId,
        ability: &str,
        cooldown_ms: i64,
        now: EpochMillis,
    ) -> bool {
        self.remaining(actor, ability, cooldown_ms, now) > 0
    }

    /// Milliseconds until the ability is usable again, never negative
    pub fn remaining(
        &self,
        actor: ActorId,
        ability: &str,
        cooldown_ms: i64,
        now: EpochMillis,
    ) -> u64 {
        if cooldown_ms <= 0 {
            return 0;
        }
        let Some(last) = self.get(actor, ability).and_then(|r| r.last_activation) else {
            return 0;
        };
        // `last` may sit ahead of `now` after a clock step back; widen so any
        // pair of timestamps and cooldown stays in range.
        let elapsed = now as i128 - last as i128;
        (cooldown_ms as i128 - elapsed).clamp(0, u64::MAX as i128) as u64
    }

    /// Mark the ability as activated at `now`
    pub fn record(&mut self, actor: ActorId, ability: &str, now: EpochMillis) {
        self.entry(actor, ability).last_activation = Some(now);
    }

    /// Move the last activation `ms` earlier. No-op without a record.
    pub fn reduce_cooldown(&mut self, actor: ActorId, ability: &str, ms: u64) {
        if let Some(record) = self
            .records
            .get_mut(&actor)
            .and_then(|m| m.get_mut(ability))
        {
            if let Some(last) = record.last_activation.as_mut() {
                *last = last.saturating_sub(ms);
            }
        }
    }

    /// Apply [`reduce_cooldown`](Self::reduce_cooldown) to every ability the actor has used
    pub fn reduce_all(&mut self, actor: ActorId, ms: u64) {
        if let Some(abilities) = self.records.get_mut(&actor) {
            for record in abilities.values_mut() {
                if let Some(last) = record.last_activation.as_mut() {
                    *last = last.saturating_sub(ms);
                }
            }
        }
    }

    /// True when the current window already holds `cap` activations.
    ///
    /// An expired window reports false; it is restarted by the next
    /// [`increment`](Self::increment).
    pub fn exceeded_rate_limit(
        &self,
        actor: ActorId,
        ability: &str,
        cap_per_second: i64,
        now: EpochMillis,
    ) -> bool {
        if cap_per_second <= 0 {
            return false;
        }
        match self.get(actor, ability).and_then(|r| r.rate) {
            Some(window) if !window.is_expired(now) => window.count as i64 >= cap_per_second,
            _ => false,
        }
    }

    /// Count one activation. An expired (or missing) window restarts at 1.
    pub fn increment(&mut self, actor: ActorId, ability: &str, now: EpochMillis) {
        let record = self.entry(actor, ability);
        match record.rate.as_mut() {
            Some(window) if !window.is_expired(now) => window.count += 1,
            _ => {
                record.rate = Some(RateWindow {
                    window_start: now,
                    count: 1,
                })
            }
        }
    }

    /// Activations counted in the live window (0 once it has expired)
    pub fn window_count(&self, actor: ActorId, ability: &str, now: EpochMillis) -> u32 {
        match self.get(actor, ability).and_then(|r| r.rate) {
            Some(window) if !window.is_expired(now) => window.count,
            _ => 0,
        }
    }

    /// Drop everything known about an actor
    pub fn clear(&mut self, actor: ActorId) {
        self.records.remove(&actor);
    }

    /// Actors with any state
    pub fn actors(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.records.keys().copied()
    }

    /// Number of actors with any state
    pub fn tracked_actors(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_record_is_not_on_cooldown() {
        let tracker = CooldownTracker::new();
        assert!(!tracker.is_on_cooldown(ActorId::new(), "laser", 5_000, 1_000));
    }

    #[test]
    fn test_cooldown_window() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        tracker.record(actor, "laser", 10_000);

        assert!(tracker.is_on_cooldown(actor, "laser", 1_000, 10_000));
        assert!(tracker.is_on_cooldown(actor, "laser", 1_000, 10_500));
        assert_eq!(tracker.remaining(actor, "laser", 1_000, 10_500), 500);
        assert!(!tracker.is_on_cooldown(actor, "laser", 1_000, 11_000));
        assert_eq!(tracker.remaining(actor, "laser", 1_000, 20_000), 0);
    }

    #[test]
    fn test_cooldowns_are_per_ability_and_actor() {
        let mut tracker = CooldownTracker::new();
        let a = ActorId::new();
        let b = ActorId::new();
        tracker.record(a, "laser", 0);

        assert!(tracker.is_on_cooldown(a, "laser", 1_000, 10));
        assert!(!tracker.is_on_cooldown(a, "explosive", 1_000, 10));
        assert!(!tracker.is_on_cooldown(b, "laser", 1_000, 10));
    }

    #[test]
    fn test_reduce_cooldown_shifts_last_activation() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        tracker.record(actor, "laser", 5_000);
        tracker.reduce_cooldown(actor, "laser", 400);

        assert_eq!(tracker.remaining(actor, "laser", 1_000, 5_000), 600);
    }

    #[test]
    fn test_reduce_cooldown_without_record_is_noop() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        tracker.reduce_cooldown(actor, "laser", 400);
        assert_eq!(tracker.tracked_actors(), 0);
    }

    #[test]
    fn test_reduce_all_touches_every_ability() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        tracker.record(actor, "laser", 1_000);
        tracker.record(actor, "explosive", 1_000);
        tracker.reduce_all(actor, 1_000);

        assert!(!tracker.is_on_cooldown(actor, "laser", 1_000, 1_000));
        assert!(!tracker.is_on_cooldown(actor, "explosive", 1_000, 1_000));
    }

    #[test]
    fn test_rate_limit_counts_within_window() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();

        for t in [0, 100, 200] {
            assert!(!tracker.exceeded_rate_limit(actor, "pillar", 3, t));
            tracker.increment(actor, "pillar", t);
        }
        assert!(tracker.exceeded_rate_limit(actor, "pillar", 3, 300));
        assert_eq!(tracker.window_count(actor, "pillar", 300), 3);
    }

    #[test]
    fn test_expired_window_reports_false_and_restarts_at_one() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        for _ in 0..5 {
            tracker.increment(actor, "pillar", 0);
        }
        assert!(tracker.exceeded_rate_limit(actor, "pillar", 3, 999));
        assert!(!tracker.exceeded_rate_limit(actor, "pillar", 3, 1_000));

        tracker.increment(actor, "pillar", 1_000);
        assert_eq!(tracker.window_count(actor, "pillar", 1_000), 1);
    }

    #[test]
    fn test_rate_cap_disabled_when_non_positive() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        for _ in 0..50 {
            tracker.increment(actor, "pillar", 0);
        }
        assert!(!tracker.exceeded_rate_limit(actor, "pillar", 0, 1));
        assert!(!tracker.exceeded_rate_limit(actor, "pillar", -1, 1));
    }

    #[test]
    fn test_clear_forgets_actor() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        tracker.record(actor, "laser", 0);
        tracker.increment(actor, "laser", 0);
        tracker.clear(actor);

        assert!(!tracker.is_on_cooldown(actor, "laser", 1_000, 1));
        assert_eq!(tracker.window_count(actor, "laser", 1), 0);
        assert_eq!(tracker.tracked_actors(), 0);
    }

    #[test]
    fn test_clock_step_back_keeps_huge_cooldown_active() {
        let mut tracker = CooldownTracker::new();
        let actor = ActorId::new();
        tracker.record(actor, "perma", 10_000);

        assert!(tracker.is_on_cooldown(actor, "perma", i64::MAX, 9_999));
        assert_eq!(
            tracker.remaining(actor, "perma", i64::MAX, 9_999),
            i64::MAX as u64 + 1
        );
    }

    #[test]
    fn test_actors_lists_everyone_with_records() {
        let mut tracker = CooldownTracker::new();
        let a = ActorId::new();
        let b = ActorId::new();
        tracker.record(a, "laser", 0);
        tracker.increment(b, "pillar", 0);

        let mut actors: Vec<ActorId> = tracker.actors().collect();
        actors.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(actors, expected);
    }

    proptest! {
        #[test]
        fn prop_non_positive_cooldown_never_gates(cooldown in i64::MIN..=0, last in 0u64..1_000_000, offset in 0u64..1_000_000) {
            let mut tracker = CooldownTracker::new();
            let actor = ActorId::new();
            tracker.record(actor, "any", last);
            prop_assert!(!tracker.is_on_cooldown(actor, "any", cooldown, last + offset));
        }

        #[test]
        fn prop_remaining_never_panics(cooldown in any::<i64>(), last in any::<u64>(), now in any::<u64>()) {
            let mut tracker = CooldownTracker::new();
            let actor = ActorId::new();
            tracker.record(actor, "any", last);
            let remaining = tracker.remaining(actor, "any", cooldown, now);
            if cooldown <= 0 {
                prop_assert_eq!(remaining, 0);
            }
        }

        #[test]
        fn prop_remaining_never_exceeds_cooldown(cooldown in 1i64..100_000, last in 0u64..1_000_000, offset in 0u64..200_000) {
            let mut tracker = CooldownTracker::new();
            let actor = ActorId::new();
            tracker.record(actor, "any", last);
            prop_assert!(tracker.remaining(actor, "any", cooldown, last + offset) <= cooldown as u64);
        }
    }
}
