//! Export a clip.

use std::io::Write;
use std::sync::Arc;

use rampcut_capture_engine::{CaptureBackend, CaptureSettings};
use rampcut_common::AppConfig;
use rampcut_export::{DeliverySink, DirectoryArchive, Exporter};
use rampcut_processing_core::{ExportProgress, LogCallback, ProgressCallback};
use rampcut_render_engine::{EngineHandle, FfmpegBackend, FfmpegThumbnailer, TranscodeSettings};

use super::edit::{build_request, EditArgs};

pub async fn run(edit: EditArgs, config: AppConfig) -> anyhow::Result<()> {
    let engine = Arc::new(EngineHandle::default());
    let request = build_request(&edit, &engine, &config).await?;

    println!("Exporting: {}", request.source.path.display());
    println!(
        "  Trim: {:.3}s - {:.3}s ({} ramp(s))",
        request.trim.start,
        request.trim.end,
        request.effects.len()
    );
    println!("  Path policy: {:?}", config.export.path_policy);

    let transcode = Arc::new(FfmpegBackend::new(
        Arc::clone(&engine),
        TranscodeSettings::from(&config.export),
    ));
    let capture = Arc::new(CaptureBackend::new(CaptureSettings::from(&config.export)));

    let mut exporter = Exporter::new(transcode, DeliverySink::new(config.exports_dir.clone()))
        .with_capture(capture)
        .with_policy(config.export.path_policy);
    if config.archive.enabled {
        let archive = DirectoryArchive::from_config(&config.archive)
            .with_thumbnailer(Arc::new(FfmpegThumbnailer::new(Arc::clone(&engine))));
        exporter = exporter.with_archive(Arc::new(archive));
    }

    let progress: ProgressCallback = Arc::new(|p: ExportProgress| {
        print!("\r  {:<24} {:>5.1}%  ", p.stage_label, p.ratio * 100.0);
        let _ = std::io::stdout().flush();
    });
    // Lines are already traced by the exporter's log tail.
    let log: LogCallback = Arc::new(|_: &str| {});

    let result = exporter.export(request, progress, log).await;
    engine.shutdown();

    match result {
        Ok(report) => {
            println!();
            println!("Export complete: {}", report.delivered.display());
            println!("  Path: {}", report.path.label());
            println!("  Duration: ~{:.2}s", report.estimated_duration_secs);
            if report.fell_back {
                println!("  Note: real-time capture failed; transcoded instead");
            }
            if report.truncated {
                println!("  Warning: capture hit its safety stop; the clip may be short");
            }
            if let Some(clip) = report.archived {
                println!("  Archived as {}", clip.id);
            }
            Ok(())
        }
        Err(e) => {
            println!();
            let tail = exporter.log_tail();
            if !tail.is_empty() {
                eprintln!("Recent log:\n{tail}");
            }
            Err(anyhow::anyhow!("Export failed: {e}"))
        }
    }
}
