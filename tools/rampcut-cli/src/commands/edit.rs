//! Edit inputs shared by `export` and `plan`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use rampcut_common::AppConfig;
use rampcut_processing_core::ExportRequest;
use rampcut_project_model::{AudioOverlay, EditSession, SpeedEffect, TrimRange};
use rampcut_render_engine::{probe_audio_duration, probe_source, EngineHandle};

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Source video (optional with --session)
    pub source: Option<PathBuf>,

    /// Edit session file written by `rampcut init`
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Trim start in seconds
    #[arg(long)]
    pub start: Option<f64>,

    /// Trim end in seconds (defaults to the source duration)
    #[arg(long)]
    pub end: Option<f64>,

    /// Speed ramp as START:END:FACTOR, e.g. 4:6:0.5 (repeatable)
    #[arg(long = "ramp", value_parser = parse_ramp)]
    pub ramps: Vec<SpeedEffect>,

    /// Audio track mixed over the export
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Timeline position where the overlay starts (negative skips into it)
    #[arg(long, allow_hyphen_values = true)]
    pub overlay_offset: Option<f64>,

    /// Overlay gain [0.0, 1.0]
    #[arg(long)]
    pub overlay_volume: Option<f64>,

    /// Source audio gain [0.0, 1.0]
    #[arg(long)]
    pub video_volume: Option<f64>,
}

/// Parse `START:END:FACTOR`.
pub fn parse_ramp(raw: &str) -> Result<SpeedEffect, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [start, end, factor] = parts.as_slice() else {
        return Err(format!("expected START:END:FACTOR, got '{raw}'"));
    };
    let value = |s: &str, what: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid {what} '{s}'"))
    };
    let effect = SpeedEffect::new(
        format!("ramp-{raw}"),
        value(*start, "start")?,
        value(*end, "end")?,
        value(*factor, "factor")?,
    );
    effect.validate().map_err(|e| e.to_string())?;
    Ok(effect)
}

/// Merge the session (if any) with command-line overrides.
fn resolve_session(args: &EditArgs) -> anyhow::Result<EditSession> {
    let mut session = match &args.session {
        Some(path) => {
            let base = path.parent().unwrap_or(Path::new("."));
            EditSession::load(path)
                .with_context(|| format!("Failed to load session {}", path.display()))?
                .resolve_paths(base)
        }
        None => match &args.source {
            Some(source) => EditSession::new(source.clone()),
            None => bail!("Give a source video or --session"),
        },
    };

    if let (Some(source), Some(_)) = (&args.source, &args.session) {
        session.source = source.clone();
    }
    session.effects.extend(args.ramps.iter().cloned());
    if let Some(path) = &args.overlay {
        session.overlay = Some(rampcut_project_model::OverlayRef {
            path: path.clone(),
            offset_secs: 0.0,
            volume: 1.0,
        });
    }
    if let Some(overlay) = session.overlay.as_mut() {
        if let Some(offset) = args.overlay_offset {
            overlay.offset_secs = offset;
        }
        if let Some(volume) = args.overlay_volume {
            overlay.volume = volume;
        }
    }
    if let Some(volume) = args.video_volume {
        session.video_volume = volume;
    }

    let missing = session.validate_sources();
    if !missing.is_empty() {
        bail!("{}", missing.join("; "));
    }
    Ok(session)
}

/// Probe the media and build the export request.
pub async fn build_request(
    args: &EditArgs,
    engine: &EngineHandle,
    config: &AppConfig,
) -> anyhow::Result<ExportRequest> {
    let session = resolve_session(args)?;

    let source = probe_source(engine, &session.source).await?;
    let trim = TrimRange::new(
        args.start
            .or(session.trim.map(|t| t.start))
            .unwrap_or(0.0),
        args.end
            .or(session.trim.map(|t| t.end))
            .unwrap_or(source.duration_secs),
    );

    let overlay = match &session.overlay {
        Some(overlay) => {
            let duration = probe_audio_duration(engine, &overlay.path).await?;
            Some(AudioOverlay::new(
                overlay.path.clone(),
                duration,
                overlay.offset_secs,
                overlay.volume,
            ))
        }
        None => None,
    };

    let video_volume = if args.video_volume.is_some() || args.session.is_some() {
        session.video_volume
    } else {
        config.export.video_volume
    };

    tracing::debug!(
        source = %source.path.display(),
        duration = source.duration_secs,
        has_audio = source.has_audio,
        effects = session.effects.len(),
        "Edit resolved"
    );

    Ok(ExportRequest {
        source,
        trim,
        effects: session.effects,
        overlay,
        video_volume,
    })
}
