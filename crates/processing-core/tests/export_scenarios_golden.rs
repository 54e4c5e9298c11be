use rampcut_processing_core::{
    build_segments, decompose, estimated_duration, is_audible, offset_in_overlay, plan_export,
    schedule_start, ExportPathKind, ExportRequest, OverlayStart,
};
use rampcut_project_model::{AudioOverlay, Segment, SourceMedia, SpeedEffect, TrimRange};

fn source(duration_secs: f64) -> SourceMedia {
    SourceMedia {
        path: "fixtures/clip.mp4".into(),
        duration_secs,
        width: 3840,
        height: 2160,
        has_audio: true,
    }
}

fn signature(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| format!("{:.3}|{:.3}|{:.3}", seg.start, seg.end, seg.factor))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn simple_trim_without_effects() {
    let segments = build_segments(TrimRange::new(2.0, 7.0), &[]);
    assert_eq!(signature(&segments), "2.000|7.000|1.000");
    assert!((estimated_duration(&segments) - 5.0).abs() < 1e-12);
}

#[test]
fn single_slow_motion_ramp() {
    let segments = build_segments(
        TrimRange::new(0.0, 10.0),
        &[SpeedEffect::new("slowmo", 4.0, 6.0, 0.5)],
    );
    assert_eq!(
        signature(&segments),
        "0.000|4.000|1.000\n4.000|6.000|0.500\n6.000|10.000|1.000"
    );
    assert!((estimated_duration(&segments) - 12.0).abs() < 1e-12);
}

#[test]
fn fast_factor_decomposition() {
    let chain = decompose(5.0);
    assert_eq!(chain, vec![2.0, 2.0, 1.25]);
    assert!((chain.iter().product::<f64>() - 5.0).abs() < 1e-12);
}

#[test]
fn overlay_starting_late() {
    assert_eq!(offset_in_overlay(1.0, 3.0), -2.0);
    assert_eq!(
        schedule_start(1.0, 3.0, 60.0),
        OverlayStart::Delayed { delay: 2.0 }
    );
    assert!(!is_audible(1.0, 3.0, 60.0));
}

#[test]
fn two_ramp_edit_plans_end_to_end() {
    let request = ExportRequest {
        source: source(30.0),
        trim: TrimRange::new(1.0, 21.0),
        effects: vec![
            SpeedEffect::new("fast", 12.0, 18.0, 3.0),
            SpeedEffect::new("slow", 3.0, 5.0, 0.25),
        ],
        overlay: Some(AudioOverlay::new("fixtures/music.mp3", 45.0, 4.0, 0.6)),
        video_volume: 0.5,
    };

    let job = plan_export(request, ExportPathKind::Capture).unwrap();
    assert_eq!(
        signature(&job.segments),
        "1.000|3.000|1.000\n3.000|5.000|0.250\n5.000|12.000|1.000\n12.000|18.000|3.000\n18.000|21.000|1.000"
    );
    // 2 + 8 + 7 + 2 + 3
    assert!((job.estimated_duration_secs - 22.0).abs() < 1e-9);
    assert_eq!(
        job.tempo_chains(),
        vec![vec![], vec![0.5, 0.5], vec![], vec![2.0, 1.5], vec![]]
    );

    // Overlay starts at timeline 4.0, which is 2 + 1/0.25 = 6s into the output.
    let placement = job.overlay_placement.unwrap();
    assert_eq!(placement.read_from_secs, 0.0);
    assert!((placement.output_delay_secs - 6.0).abs() < 1e-9);
    assert_eq!(placement.volume, 0.6);
}
