//! Export orchestration: path selection, fallback, delivery, archival.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rampcut_common::{LogTail, PathPolicy, RampcutError, RampcutResult};
use rampcut_processing_core::{
    plan_export, ExportArtifact, ExportBackend, ExportJob, ExportPathKind, ExportProgress,
    ExportRequest, LogCallback, ProgressCallback,
};

use crate::archive::{ArchivedClip, ClipArchive};
use crate::delivery::DeliverySink;
use crate::state::{ExportState, ExportStateMachine};

/// Live preview playback that must be silenced before an export starts.
pub trait PreviewControl: Send + Sync {
    fn pause(&self);
}

/// Outcome of a successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub delivered: PathBuf,
    pub path: ExportPathKind,
    /// The capture path hit its safety stop before the trim end.
    pub truncated: bool,
    /// Capture failed and the transcoding path produced the artifact.
    pub fell_back: bool,
    pub estimated_duration_secs: f64,
    pub archived: Option<ArchivedClip>,
    pub history: Vec<ExportState>,
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> RampcutResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RampcutError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Exporter {
    capture: Option<Arc<dyn ExportBackend>>,
    transcode: Arc<dyn ExportBackend>,
    delivery: DeliverySink,
    archive: Option<Arc<dyn ClipArchive>>,
    preview: Option<Arc<dyn PreviewControl>>,
    policy: PathPolicy,
    busy: AtomicBool,
    machine: Mutex<ExportStateMachine>,
    log_tail: Arc<Mutex<LogTail>>,
}

impl Exporter {
    pub fn new(transcode: Arc<dyn ExportBackend>, delivery: DeliverySink) -> Self {
        Self {
            capture: None,
            transcode,
            delivery,
            archive: None,
            preview: None,
            policy: PathPolicy::Auto,
            busy: AtomicBool::new(false),
            machine: Mutex::new(ExportStateMachine::default()),
            log_tail: Arc::new(Mutex::new(LogTail::default())),
        }
    }

    pub fn with_capture(mut self, capture: Arc<dyn ExportBackend>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn ClipArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_preview(mut self, preview: Arc<dyn PreviewControl>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ExportState {
        self.machine().current()
    }

    pub fn history(&self) -> Vec<ExportState> {
        self.machine().history().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Most recent diagnostic output, capped for display.
    pub fn log_tail(&self) -> String {
        lock(&self.log_tail).as_str().to_string()
    }

    /// Run one export to completion.
    ///
    /// Returns [`RampcutError::Busy`] while another export is in flight.
    pub async fn export(
        &self,
        request: ExportRequest,
        progress: ProgressCallback,
        log: LogCallback,
    ) -> RampcutResult<ExportReport> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        self.machine().reset();
        lock(&self.log_tail).clear();

        let log = self.tee_log(log);
        match self.run(request, &progress, &log).await {
            Ok(report) => Ok(report),
            Err(e) => {
                if !self.machine().current().is_terminal() {
                    let _ = self.set_state(ExportState::Failed);
                }
                tracing::error!(error = %e, "Export failed");
                log(&format!("Export failed: {e}"));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: ExportRequest,
        progress: &ProgressCallback,
        log: &LogCallback,
    ) -> RampcutResult<ExportReport> {
        self.set_state(ExportState::Preparing)?;
        if let Some(preview) = &self.preview {
            preview.pause();
        }
        progress(ExportProgress::new(0.0, ExportState::Preparing.label()));

        let job = plan_export(request, ExportPathKind::Transcode)?;
        let path = self.select_path().await?;
        let job = job.with_path(path);
        log(&format!(
            "Exporting {} segment(s), ~{:.2}s via {}",
            job.segments.len(),
            job.estimated_duration_secs,
            path.label()
        ));

        let work_dir = tempfile::Builder::new()
            .prefix("rampcut-export-")
            .tempdir()?;

        let (artifact, fell_back) = match (path, &self.capture) {
            (ExportPathKind::Capture, Some(capture)) => {
                self.set_state(ExportState::Capturing)?;
                match capture
                    .render(&job, work_dir.path(), progress.clone(), log.clone())
                    .await
                {
                    Ok(artifact) => (artifact, false),
                    Err(e) if e.is_input_error() || self.policy == PathPolicy::Capture => {
                        return Err(e)
                    }
                    Err(e) => {
                        tracing::warn!(
                            backend = capture.name(),
                            error = %e,
                            "Capture path failed, falling back to transcoding"
                        );
                        log(&format!("Capture failed ({e}); falling back to transcoding"));
                        (self.transcode(&job, work_dir.path(), progress, log).await?, true)
                    }
                }
            }
            _ => (self.transcode(&job, work_dir.path(), progress, log).await?, false),
        };

        self.set_state(ExportState::Finalizing)?;
        progress(ExportProgress::new(1.0, ExportState::Finalizing.label()));
        let delivered = self.delivery.deliver(&artifact, &job.source.path).await?;
        let archived = self.archive_source(&job, log).await;

        self.set_state(ExportState::Done)?;
        progress(ExportProgress::new(1.0, ExportState::Done.label()));
        tracing::info!(
            delivered = %delivered.display(),
            path = artifact.kind.label(),
            fell_back,
            truncated = artifact.truncated,
            "Export complete"
        );

        Ok(ExportReport {
            delivered,
            path: artifact.kind,
            truncated: artifact.truncated,
            fell_back,
            estimated_duration_secs: job.estimated_duration_secs,
            archived,
            history: self.history(),
        })
    }

    async fn transcode(
        &self,
        job: &ExportJob,
        work_dir: &std::path::Path,
        progress: &ProgressCallback,
        log: &LogCallback,
    ) -> RampcutResult<ExportArtifact> {
        self.set_state(ExportState::Transcoding)?;
        // Progress restarts from zero on the new path.
        progress(ExportProgress::new(0.0, ExportState::Transcoding.label()));
        let job = job.with_path(ExportPathKind::Transcode);
        self.transcode
            .render(&job, work_dir, progress.clone(), log.clone())
            .await
    }

    async fn select_path(&self) -> RampcutResult<ExportPathKind> {
        if self.policy == PathPolicy::Transcode {
            return Ok(ExportPathKind::Transcode);
        }

        let supported = match &self.capture {
            Some(capture) => capture.is_supported().await,
            None => false,
        };
        match (supported, self.policy) {
            (true, _) => Ok(ExportPathKind::Capture),
            (false, PathPolicy::Capture) => Err(RampcutError::unsupported(
                "Real-time capture is not available on this system",
            )),
            (false, _) => {
                tracing::info!("Real-time capture unavailable, using transcoding");
                Ok(ExportPathKind::Transcode)
            }
        }
    }

    async fn archive_source(&self, job: &ExportJob, log: &LogCallback) -> Option<ArchivedClip> {
        let archive = self.archive.as_ref()?;
        match archive.archive(&job.source.path).await {
            Ok(clip) => Some(clip),
            Err(e) => {
                tracing::warn!(error = %e, "Archiving source clip failed");
                log(&format!("Archive skipped: {e}"));
                None
            }
        }
    }

    fn set_state(&self, next: ExportState) -> RampcutResult<()> {
        self.machine().transition(next)
    }

    fn machine(&self) -> MutexGuard<'_, ExportStateMachine> {
        lock(&self.machine)
    }

    fn tee_log(&self, log: LogCallback) -> LogCallback {
        let tail = Arc::clone(&self.log_tail);
        Arc::new(move |line: &str| {
            lock(&tail).push_line(line);
            log(line);
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
