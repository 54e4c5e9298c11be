//! Print the export plan without running anything.

use rampcut_capture_engine::{launch::build_launch, CaptureBackend, CaptureSettings};
use rampcut_common::AppConfig;
use rampcut_processing_core::{plan_export, ExportPathKind};
use rampcut_render_engine::{build_plan, EngineHandle, TranscodeSettings};

use super::edit::{build_request, EditArgs};

pub async fn run(edit: EditArgs, config: AppConfig) -> anyhow::Result<()> {
    let engine = EngineHandle::default();
    let request = build_request(&edit, &engine, &config).await?;
    let job = plan_export(request, ExportPathKind::Transcode)?;

    println!("Export plan for {}", job.source.path.display());
    println!("{}", "=".repeat(50));
    println!(
        "Source: {}x{}, {:.3}s, audio: {}",
        job.source.width,
        job.source.height,
        job.source.duration_secs,
        if job.source.has_audio { "yes" } else { "no" }
    );
    println!("Trim: {:.3}s - {:.3}s", job.trim.start, job.trim.end);
    println!();
    println!("Segments:");
    for (seg, chain) in job.segments.iter().zip(job.tempo_chains()) {
        let chain = if chain.is_empty() {
            "-".to_string()
        } else {
            chain
                .iter()
                .map(|step| format!("{step}"))
                .collect::<Vec<_>>()
                .join(" x ")
        };
        println!(
            "  {:>9.3} - {:<9.3} x{:<6} {:>8.3}s out   tempo: {}",
            seg.start,
            seg.end,
            seg.factor,
            seg.output_duration(),
            chain
        );
    }
    println!("Estimated duration: {:.3}s", job.estimated_duration_secs);

    match (&job.overlay, &job.overlay_placement) {
        (Some(overlay), Some(placement)) => println!(
            "Overlay: {} from {:.3}s after {:.3}s of silence, gain {}",
            overlay.path.display(),
            placement.read_from_secs,
            placement.output_delay_secs,
            placement.volume
        ),
        (Some(overlay), None) => println!(
            "Overlay: {} is not audible inside the trim",
            overlay.path.display()
        ),
        _ => {}
    }

    let stem = job
        .source
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());

    let transcode = build_plan(
        &job,
        &config.exports_dir.join(format!("{stem}.mp4")),
        &TranscodeSettings::from(&config.export),
    );
    println!();
    println!("Transcoding command:");
    println!("  ffmpeg {}", shell_join(&transcode.args));

    let capture = CaptureBackend::new(CaptureSettings::from(&config.export));
    let spec = capture.graph_spec(
        &job.with_path(ExportPathKind::Capture),
        &config.exports_dir.join(format!("{stem}.mkv")),
    );
    println!();
    println!("Capture pipeline:");
    println!("  {}", build_launch(&spec));

    Ok(())
}

fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || "[];'\"".contains(c)) {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
