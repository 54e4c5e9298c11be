//! Segment builder.
//!
//! Turns a trim range and a sparse set of speed ramps into the ordered,
//! gapless segment list both export paths consume. Gaps between ramps are
//! filled with unity-speed segments, so the union of the output is always
//! exactly the trim range.

use rampcut_project_model::{Segment, SpeedEffect, TrimRange};

/// Build the segment timeline for `trim`.
///
/// Effects are sorted by start and clamped to the trim range; empty
/// intervals are discarded. An effect starting before the running cursor
/// (an overlap) is clipped to start at the cursor, so the earlier effect
/// owns the shared span. Never returns an empty list for a non-empty trim.
pub fn build_segments(trim: TrimRange, effects: &[SpeedEffect]) -> Vec<Segment> {
    if trim.start.is_nan() || trim.end.is_nan() || trim.end <= trim.start {
        return Vec::new();
    }

    let mut sorted: Vec<&SpeedEffect> = effects.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut segments = Vec::with_capacity(sorted.len() * 2 + 1);
    let mut cursor = trim.start;

    for effect in sorted {
        let Some((start, end)) = trim.clamp_interval(effect.start, effect.end) else {
            continue;
        };
        let start = start.max(cursor);
        if end <= start {
            tracing::debug!(id = %effect.id, "Dropping speed effect covered by an earlier one");
            continue;
        }

        if start > cursor {
            segments.push(Segment::new(cursor, start, 1.0));
        }
        segments.push(Segment::new(start, end, effect.factor));
        cursor = end;
    }

    if cursor < trim.end {
        segments.push(Segment::new(cursor, trim.end, 1.0));
    }

    segments
}

/// Real-time runtime of the modulated timeline: `Σ (end - start) / factor`.
pub fn estimated_duration(segments: &[Segment]) -> f64 {
    segments.iter().map(Segment::output_duration).sum()
}

/// The segment containing timeline position `t`.
///
/// Linear scan; the list is short. Positions at or past the last end map to
/// the last segment so the final rate stays applied until the stop fires.
pub fn active_segment(segments: &[Segment], t: f64) -> Option<&Segment> {
    segments
        .iter()
        .find(|seg| seg.contains(t))
        .or_else(|| segments.last().filter(|last| t >= last.end))
}

/// Map a timeline position to time elapsed in the output.
///
/// Positions before the first segment map to `0`; positions past the end
/// map to the full output duration.
pub fn output_time_at(segments: &[Segment], t: f64) -> f64 {
    segments
        .iter()
        .take_while(|seg| seg.start < t)
        .map(|seg| (t.min(seg.end) - seg.start) / seg.factor)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn effect(start: f64, end: f64, factor: f64) -> SpeedEffect {
        SpeedEffect::new(format!("fx-{start}"), start, end, factor)
    }

    fn assert_contiguous(segments: &[Segment], trim: TrimRange) {
        assert!(!segments.is_empty());
        assert_eq!(segments[0].start, trim.start);
        assert_eq!(segments[segments.len() - 1].end, trim.end);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for seg in segments {
            assert!(seg.end > seg.start, "empty segment {seg:?}");
        }
    }

    #[test]
    fn no_effects_yields_single_unity_segment() {
        let segments = build_segments(TrimRange::new(2.0, 7.0), &[]);
        assert_eq!(segments, vec![Segment::new(2.0, 7.0, 1.0)]);
        assert!((estimated_duration(&segments) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn unsorted_effects_are_ordered() {
        let trim = TrimRange::new(0.0, 10.0);
        let segments = build_segments(trim, &[effect(7.0, 8.0, 2.0), effect(1.0, 2.0, 0.5)]);
        assert_eq!(
            segments,
            vec![
                Segment::new(0.0, 1.0, 1.0),
                Segment::new(1.0, 2.0, 0.5),
                Segment::new(2.0, 7.0, 1.0),
                Segment::new(7.0, 8.0, 2.0),
                Segment::new(8.0, 10.0, 1.0),
            ]
        );
    }

    #[test]
    fn effects_are_clamped_to_trim() {
        let trim = TrimRange::new(3.0, 6.0);
        let segments = build_segments(
            trim,
            &[effect(0.0, 4.0, 2.0), effect(5.0, 20.0, 0.5), effect(7.0, 9.0, 3.0)],
        );
        assert_eq!(
            segments,
            vec![
                Segment::new(3.0, 4.0, 2.0),
                Segment::new(4.0, 5.0, 1.0),
                Segment::new(5.0, 6.0, 0.5),
            ]
        );
    }

    #[test]
    fn effects_outside_trim_fall_back_to_unity() {
        let trim = TrimRange::new(3.0, 6.0);
        let segments = build_segments(trim, &[effect(0.0, 2.0, 2.0), effect(6.0, 8.0, 2.0)]);
        assert_eq!(segments, vec![Segment::new(3.0, 6.0, 1.0)]);
    }

    #[test]
    fn overlapping_effect_is_clipped_to_cursor() {
        let trim = TrimRange::new(0.0, 10.0);
        let segments = build_segments(trim, &[effect(2.0, 6.0, 0.5), effect(4.0, 8.0, 2.0)]);
        assert_eq!(
            segments,
            vec![
                Segment::new(0.0, 2.0, 1.0),
                Segment::new(2.0, 6.0, 0.5),
                Segment::new(6.0, 8.0, 2.0),
                Segment::new(8.0, 10.0, 1.0),
            ]
        );
    }

    #[test]
    fn fully_covered_effect_is_dropped() {
        let trim = TrimRange::new(0.0, 10.0);
        let segments = build_segments(trim, &[effect(2.0, 8.0, 0.5), effect(3.0, 5.0, 2.0)]);
        assert_eq!(segments.len(), 3);
        assert_contiguous(&segments, trim);
        assert_eq!(segments[1], Segment::new(2.0, 8.0, 0.5));
    }

    #[test]
    fn empty_trim_yields_nothing() {
        assert!(build_segments(TrimRange::new(4.0, 4.0), &[]).is_empty());
    }

    #[test]
    fn active_segment_scans_linearly() {
        let segments = vec![
            Segment::new(0.0, 4.0, 1.0),
            Segment::new(4.0, 6.0, 0.5),
            Segment::new(6.0, 10.0, 1.0),
        ];
        assert_eq!(active_segment(&segments, 0.0).map(|s| s.factor), Some(1.0));
        assert_eq!(active_segment(&segments, 4.0).map(|s| s.factor), Some(0.5));
        assert_eq!(active_segment(&segments, 5.99).map(|s| s.factor), Some(0.5));
        assert_eq!(active_segment(&segments, 10.5).map(|s| s.start), Some(6.0));
        assert!(active_segment(&segments, -1.0).is_none());
    }

    #[test]
    fn output_time_accounts_for_factors() {
        let segments = vec![
            Segment::new(0.0, 4.0, 1.0),
            Segment::new(4.0, 6.0, 0.5),
            Segment::new(6.0, 10.0, 1.0),
        ];
        assert!((output_time_at(&segments, 2.0) - 2.0).abs() < 1e-12);
        assert!((output_time_at(&segments, 5.0) - 6.0).abs() < 1e-12);
        assert!((output_time_at(&segments, 7.0) - 9.0).abs() < 1e-12);
        assert!((output_time_at(&segments, 50.0) - 12.0).abs() < 1e-12);
        assert_eq!(output_time_at(&segments, -3.0), 0.0);
    }

    fn effect_strategy() -> impl Strategy<Value = SpeedEffect> {
        (0.0f64..20.0, 0.01f64..8.0, 0.05f64..16.0)
            .prop_map(|(start, len, factor)| SpeedEffect::new("p", start, start + len, factor))
    }

    proptest! {
        #[test]
        fn segments_cover_trim_exactly(
            start in 0.0f64..10.0,
            len in 0.01f64..10.0,
            effects in proptest::collection::vec(effect_strategy(), 0..5),
        ) {
            let trim = TrimRange::new(start, start + len);
            let segments = build_segments(trim, &effects);

            prop_assert!(!segments.is_empty());
            prop_assert_eq!(segments[0].start, trim.start);
            prop_assert_eq!(segments[segments.len() - 1].end, trim.end);
            for pair in segments.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            for seg in &segments {
                prop_assert!(seg.end > seg.start);
                prop_assert!(seg.factor > 0.0);
            }
        }

        #[test]
        fn empty_effects_yield_one_unity_segment(start in 0.0f64..100.0, len in 0.001f64..100.0) {
            let segments = build_segments(TrimRange::new(start, start + len), &[]);
            prop_assert_eq!(segments.len(), 1);
            prop_assert_eq!(segments[0].factor, 1.0);
        }

        #[test]
        fn output_time_reaches_estimate_at_trim_end(
            effects in proptest::collection::vec(effect_strategy(), 0..4),
        ) {
            let trim = TrimRange::new(1.0, 15.0);
            let segments = build_segments(trim, &effects);
            let total = estimated_duration(&segments);
            prop_assert!((output_time_at(&segments, trim.end) - total).abs() < 1e-9 * total.max(1.0));
        }
    }
}
