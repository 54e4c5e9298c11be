//! GStreamer launch descriptions for the capture graph.

use std::path::Path;

use crate::graph::GraphSpec;

/// Sample rate of the mixed audio bus.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

pub const SOURCE_ELEMENT: &str = "src";
pub const OVERLAY_ELEMENT: &str = "ovl";
pub const OVERLAY_GAIN_ELEMENT: &str = "ovlgain";
pub const VIDEO_GATE_ELEMENT: &str = "vgate";
pub const AUDIO_GATE_ELEMENT: &str = "agate";

/// Element factories the capture graph needs.
pub const REQUIRED_ELEMENTS: &[&str] = &[
    "uridecodebin",
    "videoconvert",
    "videoscale",
    "videorate",
    "identity",
    "valve",
    "x264enc",
    "h264parse",
    "matroskamux",
    "filesink",
    "audioconvert",
    "audioresample",
    "scaletempo",
    "volume",
    "audiomixer",
    "audiotestsrc",
    "opusenc",
];

/// Capture surface size: sources taller than `max_height` are scaled down
/// preserving aspect ratio. Both sides are rounded to even for the encoder.
pub fn capture_dimensions(width: u32, height: u32, max_height: u32) -> (u32, u32) {
    let (w, h) = if height > max_height && height > 0 {
        let scaled_w = (width as f64 * max_height as f64 / height as f64).round() as u32;
        (scaled_w, max_height)
    } else {
        (width, height)
    };
    (even(w), even(h))
}

fn even(v: u32) -> u32 {
    (v & !1).max(2)
}

/// Build the `gst-launch` description for `spec`.
///
/// The recorder branches sit behind valves that start closed, so nothing
/// reaches the muxer until the recorder is started.
pub fn build_launch(spec: &GraphSpec) -> String {
    let src_uri = file_uri(&spec.source);
    let out = escape_path(&spec.output);
    let fps = spec.fps.max(1);
    let keyint = fps.saturating_mul(2).max(2);

    let mut parts = vec![
        format!("uridecodebin name={SOURCE_ELEMENT} uri=\"{src_uri}\""),
        format!(
            "matroskamux name=mux streamable=true ! filesink location=\"{out}\" async=false"
        ),
        format!(
            "audiomixer name=mix ! audioconvert ! audioresample ! audio/x-raw,rate={MIX_SAMPLE_RATE},channels=2 ! valve name={AUDIO_GATE_ELEMENT} drop=true ! queue ! opusenc bitrate={} ! queue ! mux.",
            spec.audio_bitrate_kbps.saturating_mul(1000)
        ),
        format!(
            "{SOURCE_ELEMENT}. ! queue ! videoconvert ! videoscale ! video/x-raw,width={},height={} ! videorate ! video/x-raw,framerate={fps}/1 ! identity sync=true ! valve name={VIDEO_GATE_ELEMENT} drop=true ! queue ! x264enc tune=zerolatency speed-preset=veryfast bitrate={} key-int-max={keyint} ! h264parse ! queue ! mux.",
            spec.width, spec.height, spec.video_bitrate_kbps
        ),
    ];

    if spec.source_has_audio {
        parts.push(format!(
            "{SOURCE_ELEMENT}. ! queue ! audioconvert ! audioresample ! scaletempo ! volume name=srcgain volume={:.3} ! mix.",
            spec.video_volume
        ));
    } else {
        parts.push(format!(
            "audiotestsrc wave=silence ! audio/x-raw,rate={MIX_SAMPLE_RATE},channels=2 ! mix."
        ));
    }

    if let Some(overlay) = &spec.overlay {
        parts.push(format!(
            "uridecodebin name={OVERLAY_ELEMENT} uri=\"{}\" ! queue ! audioconvert ! audioresample ! scaletempo ! volume name={OVERLAY_GAIN_ELEMENT} volume={:.3} ! mix.",
            file_uri(overlay),
            spec.overlay_volume
        ));
    }

    parts.join(" ")
}

fn file_uri(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let encoded = absolute
        .to_string_lossy()
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace('#', "%23")
        .replace('"', "%22");
    format!("file://{encoded}")
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec() -> GraphSpec {
        GraphSpec {
            source: PathBuf::from("/clips/skate run.mp4"),
            source_has_audio: true,
            overlay: None,
            output: PathBuf::from("/tmp/out.mkv"),
            width: 1920,
            height: 1080,
            fps: 30,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            video_volume: 0.5,
            overlay_volume: 1.0,
        }
    }

    #[test]
    fn dimensions_are_capped_and_even() {
        assert_eq!(capture_dimensions(3840, 2160, 1080), (1920, 1080));
        assert_eq!(capture_dimensions(1280, 720, 1080), (1280, 720));
        assert_eq!(capture_dimensions(1081, 1441, 1080), (810, 1080));
        assert_eq!(capture_dimensions(721, 481, 1080), (720, 480));
    }

    #[test]
    fn launch_gates_recorder_and_encodes_uri() {
        let launch = build_launch(&spec());
        assert!(launch.contains("uri=\"file:///clips/skate%20run.mp4\""));
        assert!(launch.contains("valve name=vgate drop=true"));
        assert!(launch.contains("valve name=agate drop=true"));
        assert!(launch.contains("framerate=30/1"));
        assert!(launch.contains("volume name=srcgain volume=0.500"));
        assert!(launch.contains("opusenc bitrate=192000"));
        assert!(!launch.contains("audiotestsrc"));
        assert!(!launch.contains("name=ovl "));
    }

    #[test]
    fn silent_source_feeds_mixer() {
        let mut spec = spec();
        spec.source_has_audio = false;
        let launch = build_launch(&spec);
        assert!(launch.contains("audiotestsrc wave=silence"));
        assert!(!launch.contains("srcgain"));
    }

    #[test]
    fn overlay_branch_has_its_own_gain() {
        let mut spec = spec();
        spec.overlay = Some(PathBuf::from("/music/track.mp3"));
        spec.overlay_volume = 0.25;
        let launch = build_launch(&spec);
        assert!(launch.contains("uridecodebin name=ovl uri=\"file:///music/track.mp3\""));
        assert!(launch.contains("volume name=ovlgain volume=0.250 ! mix."));
    }
}
