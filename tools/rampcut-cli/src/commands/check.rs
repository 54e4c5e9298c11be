//! Check export capabilities.

use rampcut_capture_engine::capability_report;
use rampcut_common::AppConfig;
use rampcut_render_engine::EngineHandle;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Rampcut System Check");
    println!("{}", "=".repeat(50));

    let capture_ok = match capability_report().await {
        Ok(missing) if missing.is_empty() => {
            println!("[OK] Real-time capture: GStreamer elements available");
            true
        }
        Ok(missing) => {
            println!("[WARN] Real-time capture: missing elements");
            for name in &missing {
                println!("     - {name}");
            }
            false
        }
        Err(e) => {
            println!("[WARN] Real-time capture unavailable: {e}");
            false
        }
    };

    let engine = EngineHandle::default();
    let transcode_ok = match engine.load().await {
        Ok(binaries) => {
            println!("[OK] Transcoding: {}", binaries.version);
            println!("     ffprobe: {}", binaries.ffprobe.display());
            true
        }
        Err(e) => {
            println!("[FAIL] Transcoding: {e}");
            false
        }
    };
    engine.shutdown();

    println!();
    println!("Exports dir: {}", config.exports_dir.display());
    println!("Path policy: {:?}", config.export.path_policy);
    println!();
    match (capture_ok, transcode_ok) {
        (true, true) => println!("Both export paths are available. Rampcut is ready."),
        (false, true) => println!("Exports will use transcoding only."),
        (true, false) => {
            println!("Real-time capture works, but there is no transcoding fallback.")
        }
        (false, false) => println!("No export path is available. Install ffmpeg or GStreamer."),
    }

    Ok(())
}
