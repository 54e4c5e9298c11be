//! Static ffmpeg filter graph for a segmented export.
//!
//! Each segment gets its own video operation (trim, reset, rescale
//! timestamps by `1/factor`) and audio operation (trim, reset, tempo
//! chain). Video and audio are concatenated separately, then the overlay
//! is mixed in with the primary audio deciding the output length.

use rampcut_processing_core::{decompose, ExportJob};

/// Input index of the source clip.
pub const SOURCE_INPUT: usize = 0;

/// Input index of the overlay track, when one is mixed in.
pub const OVERLAY_INPUT: usize = 1;

/// A `-filter_complex` description and the labels to map.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub filter: String,
    pub video_label: String,
    /// `None` produces a video-only output.
    pub audio_label: Option<String>,
    /// Whether input [`OVERLAY_INPUT`] is consumed.
    pub uses_overlay: bool,
}

/// Render a float without trailing zeros (`2`, `1.25`, `0.333333`).
///
/// Values too small for six decimals keep their full digits so a tiny
/// factor never renders as a zero divisor.
pub fn num(value: f64) -> String {
    let s = format!("{value:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "" | "0" | "-0" if value != 0.0 => value.to_string(),
        "" | "-0" => "0".to_string(),
        _ => s.to_string(),
    }
}

/// `atempo=…` steps for `factor`, or `None` at unity speed.
pub fn atempo_chain(factor: f64) -> Option<String> {
    let steps = decompose(factor);
    if steps.is_empty() {
        return None;
    }
    Some(
        steps
            .iter()
            .map(|step| format!("atempo={}", num(*step)))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Build the filter graph for `job`.
pub fn build_filter_graph(job: &ExportJob) -> FilterGraph {
    let mut chains = Vec::new();
    let count = job.segments.len();

    let mut video_inputs = String::new();
    for (i, seg) in job.segments.iter().enumerate() {
        let setpts = if seg.is_unity() {
            "setpts=PTS-STARTPTS".to_string()
        } else {
            format!("setpts=(PTS-STARTPTS)/{}", num(seg.factor))
        };
        chains.push(format!(
            "[{SOURCE_INPUT}:v]trim=start={}:end={},{setpts}[v{i}]",
            num(seg.start),
            num(seg.end)
        ));
        video_inputs.push_str(&format!("[v{i}]"));
    }
    let video_label = if count > 1 {
        chains.push(format!("{video_inputs}concat=n={count}:v=1:a=0[vconcat]"));
        "vconcat".to_string()
    } else {
        "v0".to_string()
    };

    let primary_audio = if job.source.has_audio {
        let mut audio_inputs = String::new();
        for (i, seg) in job.segments.iter().enumerate() {
            let mut chain = format!(
                "[{SOURCE_INPUT}:a]atrim=start={}:end={},asetpts=PTS-STARTPTS",
                num(seg.start),
                num(seg.end)
            );
            if let Some(tempo) = atempo_chain(seg.factor) {
                chain.push(',');
                chain.push_str(&tempo);
            }
            chains.push(format!("{chain}[a{i}]"));
            audio_inputs.push_str(&format!("[a{i}]"));
        }
        let concat = if count > 1 {
            chains.push(format!("{audio_inputs}concat=n={count}:v=0:a=1[aconcat]"));
            "aconcat".to_string()
        } else {
            "a0".to_string()
        };
        if (job.video_volume - 1.0).abs() > f64::EPSILON {
            chains.push(format!("[{concat}]volume={}[asrc]", num(job.video_volume)));
            Some("asrc".to_string())
        } else {
            Some(concat)
        }
    } else {
        None
    };

    let overlay = job.overlay_placement.as_ref().map(|placement| {
        let mut chain = format!("[{OVERLAY_INPUT}:a]");
        if placement.read_from_secs > 0.0 {
            chain.push_str(&format!(
                "atrim=start={},asetpts=PTS-STARTPTS,",
                num(placement.read_from_secs)
            ));
        }
        let delay_ms = (placement.output_delay_secs * 1000.0).round() as u64;
        if delay_ms > 0 {
            chain.push_str(&format!("adelay={delay_ms}:all=1,"));
        }
        chain.push_str(&format!("volume={}", num(placement.volume)));
        chain
    });

    let audio_label = match (primary_audio, overlay) {
        (Some(primary), Some(overlay)) => {
            chains.push(format!("{overlay}[aovl]"));
            chains.push(format!(
                "[{primary}][aovl]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]"
            ));
            Some("aout".to_string())
        }
        (None, Some(overlay)) => {
            // The overlay is the only audio; fit it to the video length.
            chains.push(format!(
                "{overlay},apad,atrim=end={}[aout]",
                num(job.estimated_duration_secs)
            ));
            Some("aout".to_string())
        }
        (primary, None) => primary,
    };

    FilterGraph {
        filter: chains.join(";"),
        video_label,
        audio_label,
        uses_overlay: job.overlay_placement.is_some(),
    }
}
