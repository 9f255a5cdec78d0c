//! End-to-end report run: topic → outline → content → polish → charts → export.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reportgen_charts::{ChartRenderer, SvgChartRenderer};
use reportgen_export::ExporterRegistry;
use reportgen_llm::{GenerationService, LlmClient};
use reportgen_shared::{
    AppConfig, ErrorKind, Outline, ReportError, ReportKind, ReportPayload, Result, RunId,
    StagesConfig, Topic,
};
use tracing::{error, info, instrument, warn};

use crate::stages::{ChartStage, ContentStage, OutlineStage, PolishStage};
use crate::workflow::{RECENT_LOG_ENTRIES, RunResult, RunStatus, Stage, SystemStatus, WorkflowState};

/// Subdirectory of the output directory that holds chart files.
pub const CHARTS_DIR: &str = "charts";

/// Parameters for one report run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub topic: String,
    pub kind: ReportKind,
    pub enable_polish: bool,
    pub enable_charts: bool,
    /// Export format identifiers (`markdown`, `md`, `json`, `richtext`, ...).
    pub formats: Vec<String>,
}

impl RunRequest {
    /// A request with every stage enabled and Markdown export.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            kind: ReportKind::default(),
            enable_polish: true,
            enable_charts: true,
            formats: vec!["markdown".to_string()],
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each section of a per-section stage.
    fn section_done(&self, stage: Stage, title: &str, current: usize, total: usize);
    /// Called when the run completes, successfully or not.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_done(&self, _stage: Stage, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// How a failed stage affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// The run ends with an error result.
    Fatal,
    /// Keep the previous data and continue.
    KeepPrevious,
    /// The stage's output is simply absent.
    Skip,
}

fn disposition(stage: Stage, kind: ErrorKind) -> Disposition {
    match (stage, kind) {
        (Stage::Outline | Stage::Content, _) => Disposition::Fatal,
        (_, ErrorKind::CapabilityUnavailable | ErrorKind::ConfigurationInvalid) => {
            Disposition::Skip
        }
        (
            _,
            ErrorKind::ServiceUnreachable
            | ErrorKind::MalformedResponse
            | ErrorKind::ValidationFailure
            | ErrorKind::Io,
        ) => Disposition::KeepPrevious,
    }
}

/// Runs the stages in order and owns the workflow state of the latest run.
pub struct ReportCoordinator {
    outline: OutlineStage,
    content: ContentStage,
    polish: PolishStage,
    charts: ChartStage,
    exporters: ExporterRegistry,
    output_dir: PathBuf,
    service_name: String,
    state: WorkflowState,
}

impl ReportCoordinator {
    pub fn new(
        service: Arc<dyn GenerationService>,
        renderer: Arc<dyn ChartRenderer>,
        exporters: ExporterRegistry,
        output_dir: impl Into<PathBuf>,
        limits: &StagesConfig,
    ) -> Self {
        Self {
            outline: OutlineStage::new(service.clone(), limits.outline_max_tokens),
            content: ContentStage::new(
                service.clone(),
                limits.content_max_tokens,
                limits.target_section_length,
            ),
            polish: PolishStage::new(service.clone(), limits.polish_max_tokens),
            charts: ChartStage::new(
                service.clone(),
                renderer,
                limits.chart_max_tokens,
                limits.max_charts,
            ),
            exporters,
            output_dir: output_dir.into(),
            service_name: service.describe(),
            state: WorkflowState::new(),
        }
    }

    /// Coordinator wired from the app config: configured backend, SVG charts,
    /// and every built-in exporter.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = LlmClient::from_config(&config.backend, &config.generation)?;
        Ok(Self::new(
            Arc::new(client),
            Arc::new(SvgChartRenderer::new()),
            ExporterRegistry::with_defaults(),
            &config.defaults.output_dir,
            &config.stages,
        ))
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Workflow state of the latest run.
    pub fn workflow(&self) -> &WorkflowState {
        &self.state
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            flags: self.state.flags(),
            recent_log: self.state.recent(RECENT_LOG_ENTRIES).to_vec(),
            stages: vec![
                OutlineStage::NAME,
                ContentStage::NAME,
                PolishStage::NAME,
                ChartStage::NAME,
                "export",
            ],
            service: self.service_name.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        info!("workflow state reset");
    }

    /// Generate an outline only, optionally refined with feedback.
    pub async fn preview_outline(
        &self,
        topic: &str,
        kind: ReportKind,
        feedback: Option<&str>,
    ) -> Result<Outline> {
        let topic = Topic::new(topic)?;
        let outline = self.outline.build_outline(&topic, kind).await?;
        Ok(match feedback.map(str::trim).filter(|f| !f.is_empty()) {
            Some(feedback) => self.outline.refine_outline(&topic, &outline, feedback).await,
            None => outline,
        })
    }

    /// Run the full pipeline.
    ///
    /// Never returns an error: failures end up in [`RunResult::status`] and
    /// [`RunResult::error`].
    #[instrument(skip_all, fields(topic = %request.topic, kind = %request.kind))]
    pub async fn run(&mut self, request: RunRequest, progress: &dyn ProgressReporter) -> RunResult {
        let start = Instant::now();
        let run_id = RunId::new();
        self.state = WorkflowState::new();
        self.state.record(format!("run {run_id} started"));

        info!(%run_id, "starting report run");

        let mut result = RunResult::started(run_id, &request.topic, request.kind);
        if let Err(e) = self.execute(&request, &mut result, progress, start).await {
            error!(kind = %e.kind(), error = %e, "report run failed");
            self.state.record(format!("run failed: {e}"));
            result.status = RunStatus::Error;
            result.error = Some(e.to_string());
        } else {
            self.state.record("run finished");
        }

        result.workflow = self.state.clone();
        result.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            status = ?result.status,
            sections = result.sections.len(),
            charts = result.chart_files.len(),
            files = result.exported.len(),
            elapsed_ms = result.elapsed_ms,
            "report run complete"
        );

        progress.done(&result);
        result
    }

    async fn execute(
        &mut self,
        request: &RunRequest,
        result: &mut RunResult,
        progress: &dyn ProgressReporter,
        start: Instant,
    ) -> Result<()> {
        let topic = Topic::new(&request.topic)?;
        result.topic = topic.to_string();
        let charts_dir = self.output_dir.join(CHARTS_DIR);
        for dir in [&self.output_dir, &charts_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
        }

        // --- Phase 1: Outline ---
        progress.phase("Generating outline");
        self.state.record("outline stage started");
        let outline = match self.outline.build_outline(&topic, request.kind).await {
            Ok(outline) => outline,
            Err(e) => return Err(self.stage_failed(Stage::Outline, e)),
        };
        self.state.record(format!("outline has {} sections", outline.len()));
        self.state.complete(Stage::Outline);
        result.outline = outline.clone();

        // --- Phase 2: Content ---
        progress.phase("Writing sections");
        self.state.record("content stage started");
        let mut sections = match self
            .content
            .build_sections(&outline, &topic, request.kind, progress)
            .await
        {
            Ok(sections) => sections,
            Err(e) => return Err(self.stage_failed(Stage::Content, e)),
        };
        self.state.complete(Stage::Content);
        result.sections = sections.clone();

        // --- Phase 3: Polish ---
        if request.enable_polish {
            progress.phase("Polishing sections");
            self.state.record("polish stage started");
            match self.polish.polish(&sections, progress).await {
                Ok(polished) => {
                    sections = polished;
                    self.state.complete(Stage::Polish);
                    result.sections = sections.clone();
                }
                Err(e) => self.recover(Stage::Polish, e)?,
            }
        } else {
            self.state.record("polish stage skipped (disabled)");
        }

        // --- Phase 4: Charts ---
        if request.enable_charts {
            progress.phase("Selecting charts");
            self.state.record("charts stage started");
            let requests = self.charts.select_charts(&sections, progress).await;
            result.charts = requests.clone();

            progress.phase("Rendering charts");
            match self.charts.render_charts(&requests, &charts_dir) {
                Ok(files) if files.is_empty() => {
                    warn!("no chart requirements found");
                    self.state.record("no chart requirements found");
                }
                Ok(files) => {
                    self.state.record(format!(
                        "{} of {} charts rendered",
                        files.len(),
                        requests.len()
                    ));
                    result.chart_files = files;
                    self.state.complete(Stage::Charts);
                }
                Err(e) => {
                    result.charts.clear();
                    self.recover(Stage::Charts, e)?;
                }
            }
        } else {
            self.state.record("charts stage skipped (disabled)");
        }

        // --- Phase 5: Export ---
        progress.phase("Exporting report");
        self.state.record("export stage started");
        let payload = ReportPayload {
            title: topic.to_string(),
            kind: request.kind,
            outline,
            sections,
            charts: result.chart_files.clone(),
            generated_at: Utc::now(),
            processing_time_secs: start.elapsed().as_secs_f64(),
        };

        let report = self.exporters.export(&payload, &request.formats, &self.output_dir);
        for skipped in &report.skipped {
            self.state.record(format!(
                "export {} skipped ({}): {}",
                skipped.id, skipped.kind, skipped.reason
            ));
        }
        for file in &report.files {
            result.exported.insert(file.format, file.path.clone());
        }
        result.export_files = report.files.clone();

        if report.all_failed() {
            warn!(requested = request.formats.len(), "every export format failed");
            self.state.record("export failed for every requested format");
        } else {
            self.state.complete(Stage::Export);
        }

        Ok(())
    }

    /// Record a fatal stage failure and hand the error back.
    fn stage_failed(&mut self, stage: Stage, err: ReportError) -> ReportError {
        self.state.record(format!("{stage} stage failed: {err}"));
        err
    }

    /// Apply the failure policy for `stage`: log and continue, or hand the
    /// error back when the failure ends the run.
    fn recover(&mut self, stage: Stage, err: ReportError) -> Result<()> {
        match disposition(stage, err.kind()) {
            Disposition::Fatal => return Err(self.stage_failed(stage, err)),
            Disposition::KeepPrevious => {
                warn!(%stage, kind = %err.kind(), error = %err, "stage failed, keeping previous output");
                self.state.record(format!("{stage} stage failed, previous output kept: {err}"));
            }
            Disposition::Skip => {
                warn!(%stage, kind = %err.kind(), error = %err, "stage skipped");
                self.state.record(format!("{stage} stage skipped: {err}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reportgen_llm::Generation;

    use super::*;
    use crate::workflow::StageFlags;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rg-core-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Answers every prompt through a closure.
    struct FnService<F>(F);

    #[async_trait]
    impl<F> GenerationService for FnService<F>
    where
        F: Fn(&str) -> Generation + Send + Sync,
    {
        async fn generate(&self, prompt: &str, _max_output: u32) -> Generation {
            (self.0)(prompt)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn coordinator(service: Arc<dyn GenerationService>, exporters: ExporterRegistry) -> ReportCoordinator {
        ReportCoordinator::new(
            service,
            Arc::new(SvgChartRenderer::new()),
            exporters,
            temp_dir(),
            &StagesConfig::default(),
        )
    }

    fn demo() -> ReportCoordinator {
        coordinator(Arc::new(LlmClient::demo()), ExporterRegistry::with_defaults())
    }

    fn request(topic: &str, formats: &[&str]) -> RunRequest {
        RunRequest {
            topic: topic.to_string(),
            kind: ReportKind::Business,
            enable_polish: false,
            enable_charts: false,
            formats: formats.iter().map(ToString::to_string).collect(),
        }
    }

    /// Counts completed runs.
    #[derive(Default)]
    struct Counting {
        done: Mutex<usize>,
    }

    impl ProgressReporter for Counting {
        fn phase(&self, _name: &str) {}

        fn section_done(&self, _stage: Stage, _title: &str, _current: usize, _total: usize) {}

        fn done(&self, _result: &RunResult) {
            *self.done.lock().unwrap() += 1;
        }
    }

    #[test]
    fn outline_and_content_failures_are_fatal() {
        for kind in [ErrorKind::ServiceUnreachable, ErrorKind::ValidationFailure] {
            assert_eq!(disposition(Stage::Outline, kind), Disposition::Fatal);
            assert_eq!(disposition(Stage::Content, kind), Disposition::Fatal);
        }
    }

    #[test]
    fn later_stage_failures_are_recoverable() {
        assert_eq!(
            disposition(Stage::Polish, ErrorKind::ServiceUnreachable),
            Disposition::KeepPrevious
        );
        assert_eq!(
            disposition(Stage::Charts, ErrorKind::CapabilityUnavailable),
            Disposition::Skip
        );
        assert_eq!(disposition(Stage::Export, ErrorKind::Io), Disposition::KeepPrevious);
    }

    #[test]
    fn run_request_defaults() {
        let request = RunRequest::new("Solar");
        assert!(request.enable_polish && request.enable_charts);
        assert_eq!(request.formats, vec!["markdown"]);
        assert_eq!(request.kind, ReportKind::Research);
    }

    #[test]
    fn recover_ends_the_run_only_for_fatal_stages() {
        let mut coordinator = demo();

        let err = coordinator
            .recover(Stage::Content, ReportError::validation("titles diverged"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        assert!(coordinator.workflow().log().last().unwrap().message.starts_with("content stage failed"));

        coordinator
            .recover(Stage::Polish, ReportError::ServiceUnreachable("down".into()))
            .unwrap();
        assert!(coordinator.workflow().log().last().unwrap().message.contains("previous output kept"));

        coordinator
            .recover(Stage::Charts, ReportError::unavailable("svg"))
            .unwrap();
        assert!(coordinator.workflow().log().last().unwrap().message.contains("charts stage skipped"));
    }

    #[tokio::test]
    async fn result_topic_is_trimmed() {
        let mut coordinator = demo();
        let result = coordinator
            .run(request("  Solar Farms \n", &["markdown"]), &SilentProgress)
            .await;

        assert!(result.is_success());
        assert_eq!(result.topic, "Solar Farms");
    }

    #[tokio::test]
    async fn failed_chart_analysis_leaves_charts_incomplete() {
        let service = Arc::new(FnService(|prompt: &str| {
            if prompt.contains("JSON array") {
                Generation::placeholder(ErrorKind::ServiceUnreachable, "timeout")
            } else if prompt.contains("numbered list") {
                Generation::model("1. Overview\n2. Market Data\n3. Conclusion")
            } else {
                Generation::model("Prices moved. Demand followed.")
            }
        }));
        let mut coordinator = coordinator(service, ExporterRegistry::with_defaults());
        let mut req = request("Freight Rates", &["markdown"]);
        req.enable_charts = true;
        let result = coordinator.run(req, &SilentProgress).await;

        assert!(result.is_success());
        assert!(result.charts.is_empty());
        assert!(!result.workflow.is_complete(Stage::Charts));
        assert!(
            result
                .workflow
                .log()
                .iter()
                .any(|e| e.message == "no chart requirements found")
        );
    }

    #[tokio::test]
    async fn full_run_polishes_charts_and_exports_every_format() {
        let mut coordinator = demo();
        let mut req = RunRequest::new("Battery Recycling");
        req.formats = vec!["markdown".into(), "json".into(), "rtf".into()];
        let result = coordinator.run(req, &SilentProgress).await;

        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.workflow.flags(), StageFlags {
            outline: true,
            content: true,
            polish: true,
            charts: true,
            export: true,
        });
        assert_eq!(result.charts.len(), StagesConfig::default().max_charts);
        assert_eq!(result.chart_files.len(), result.charts.len());
        for chart in &result.chart_files {
            assert!(chart.path.starts_with(coordinator.output_dir().join(CHARTS_DIR)));
            assert!(chart.path.exists());
        }
        assert_eq!(result.exported.len(), 3);
        assert!(result.export_files.iter().all(|f| f.size_bytes > 0));
    }

    /// Draws nothing.
    struct NoCharts;

    impl ChartRenderer for NoCharts {
        fn render(
            &self,
            _request: &reportgen_shared::ChartRequest,
            _dir: &Path,
        ) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unrenderable_charts_leave_an_empty_chart_set() {
        let mut coordinator = ReportCoordinator::new(
            Arc::new(LlmClient::demo()),
            Arc::new(NoCharts),
            ExporterRegistry::with_defaults(),
            temp_dir(),
            &StagesConfig::default(),
        );
        let mut req = request("Port Logistics", &["markdown"]);
        req.enable_charts = true;
        let result = coordinator.run(req, &SilentProgress).await;

        assert!(result.is_success());
        assert!(result.charts.is_empty());
        assert!(result.chart_files.is_empty());
        assert!(!result.workflow.is_complete(Stage::Charts));
        assert!(result.workflow.is_complete(Stage::Export));
    }

    #[tokio::test]
    async fn all_exports_failing_leaves_export_incomplete() {
        let mut coordinator = coordinator(Arc::new(LlmClient::demo()), ExporterRegistry::empty());
        let result = coordinator
            .run(request("Water Policy", &["json"]), &SilentProgress)
            .await;

        assert!(result.is_success());
        assert!(result.exported.is_empty());
        assert!(!result.workflow.is_complete(Stage::Export));
        assert!(result.workflow.is_complete(Stage::Content));
    }

    #[tokio::test]
    async fn blank_topic_is_an_error_result() {
        let mut coordinator = demo();
        let progress = Counting::default();
        let result = coordinator.run(request("   ", &["markdown"]), &progress).await;

        assert_eq!(result.status, RunStatus::Error);
        assert!(result.error.as_deref().unwrap().contains("topic"));
        assert_eq!(result.workflow.flags(), StageFlags::default());
        assert!(result.exported.is_empty());
        assert_eq!(*progress.done.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn each_run_starts_from_fresh_state() {
        let mut coordinator = demo();
        coordinator
            .run(request("First Topic", &["markdown"]), &SilentProgress)
            .await;
        let second = coordinator.run(request("  ", &["markdown"]), &SilentProgress).await;

        assert!(!second.is_success());
        assert!(!coordinator.workflow().is_complete(Stage::Outline));
    }

    #[tokio::test]
    async fn status_reflects_latest_run_and_reset() {
        let mut coordinator = demo();
        coordinator
            .run(request("Grid Storage", &["markdown"]), &SilentProgress)
            .await;

        let status = coordinator.status();
        assert!(status.flags.outline && status.flags.export);
        assert!(status.recent_log.len() <= RECENT_LOG_ENTRIES);
        assert_eq!(status.recent_log.last().unwrap().message, "run finished");
        assert_eq!(status.stages, vec!["outline", "content", "polish", "charts", "export"]);
        assert_eq!(status.service, "demo/demo");

        coordinator.reset();
        let status = coordinator.status();
        assert_eq!(status.flags, StageFlags::default());
        assert!(status.recent_log.is_empty());
    }

    #[tokio::test]
    async fn preview_outline_applies_feedback() {
        let service = Arc::new(FnService(|prompt: &str| {
            if prompt.contains("feedback") {
                Generation::model("1. Overview\n2. Costs\n3. Risks\n4. Conclusion")
            } else {
                Generation::model("1. Overview\n2. Costs\n3. Conclusion")
            }
        }));
        let coordinator = coordinator(service, ExporterRegistry::with_defaults());

        let plain = coordinator
            .preview_outline("Solar Farms", ReportKind::Technical, None)
            .await
            .unwrap();
        assert_eq!(plain.titles(), ["Overview", "Costs", "Conclusion"]);

        let refined = coordinator
            .preview_outline("Solar Farms", ReportKind::Technical, Some("add a risk section"))
            .await
            .unwrap();
        assert_eq!(refined.titles(), ["Overview", "Costs", "Risks", "Conclusion"]);

        let err = coordinator
            .preview_outline(" ", ReportKind::Technical, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }
}
