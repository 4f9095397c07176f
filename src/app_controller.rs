use anyhow::{Context, Result, anyhow};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::database::models::JobState;
use crate::database::{DatabaseConnection, Repository};
use crate::file_utils::{CAPTION_EXTENSION, FileManager};
use crate::jobs::{InMemoryPayloadStore, JobQueue, JobStore, WorkerPool, WorkerSettings, stop_signal};
use crate::providers::{TranslationEngine, build_engine};
use crate::translator_service::{LanguagesReply, SubmitRequest, TranslatorService};

// @module: Application controller for caption file translation

/// How often the controller polls job status while waiting
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Per-run translation options
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    // @field: Source language, empty for the configured default
    pub src_lang: String,
    pub target_langs: Vec<String>,
    // @field: Output directory, defaults to each input's directory
    pub output_dir: Option<PathBuf>,
    pub force_overwrite: bool,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub written: Vec<PathBuf>,
    pub interrupted: bool,
}

// @struct: A submitted file being tracked
struct PendingJob {
    input: PathBuf,
    output_dir: PathBuf,
    job_id: String,
    label: String,
    bar: ProgressBar,
}

/// Main application controller: wires the job service and a worker pool
pub struct Controller {
    // @field: App configuration
    config: Config,
    store: JobStore,
    service: TranslatorService,
    worker: Arc<WorkerPool>,
}

impl Controller {
    // @method: Create a controller backed by the configured database file and engine
    pub fn with_config(config: Config) -> Result<Self> {
        let db_path = config.storage.resolve_database_path()?;
        let db = DatabaseConnection::new(&db_path)
            .with_context(|| format!("Failed to open job database: {:?}", db_path))?;
        let engine = build_engine(&config)?;
        debug!("Using job database {:?}", db_path);

        Ok(Self::with_parts(config, Repository::new(db), engine))
    }

    /// Create a controller from explicit parts
    pub fn with_parts(config: Config, repo: Repository, engine: Arc<dyn TranslationEngine>) -> Self {
        let store = JobStore::new(repo.clone(), &config.storage);
        let queue = JobQueue::new(repo);
        let payloads = Arc::new(InMemoryPayloadStore::new());

        let service = TranslatorService::new(
            store.clone(),
            queue.clone(),
            payloads.clone(),
            Arc::clone(&engine),
            &config,
        );
        let worker = WorkerPool::new(
            store.clone(),
            queue,
            payloads,
            engine,
            WorkerSettings::from_config(&config),
        );

        Self {
            config,
            store,
            service,
            worker: Arc::new(worker),
        }
    }

    pub fn service(&self) -> &TranslatorService {
        &self.service
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Languages the engine can translate into
    pub async fn languages(&self) -> LanguagesReply {
        self.service.list_languages().await
    }

    /// Translate a caption file, or every caption file under a directory
    pub async fn run(&self, input: &Path, options: &TranslateOptions) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();
        let target_langs = self.resolve_targets(options)?;
        let inputs = self.collect_inputs(input, &target_langs)?;
        if inputs.is_empty() {
            return Err(anyhow!("No caption files found in: {:?}", input));
        }

        let mut summary = RunSummary::default();
        let (stop_tx, stop_rx) = stop_signal();
        let worker = Arc::clone(&self.worker);
        let handle = tokio::spawn(async move { worker.run(stop_rx).await });

        let multi_progress = MultiProgress::new();
        let mut jobs = Vec::new();

        for file in inputs {
            let output_dir = match &options.output_dir {
                Some(dir) => dir.clone(),
                None => file.parent().unwrap_or(Path::new(".")).to_path_buf(),
            };

            let all_exist = target_langs.iter().all(|lang| {
                FileManager::generate_output_path(&file, &output_dir, lang, CAPTION_EXTENSION)
                    .exists()
            });
            if all_exist && !options.force_overwrite {
                warn!(
                    "Skipping {:?}, translations already exist (use -f to force overwrite)",
                    file
                );
                summary.skipped += 1;
                continue;
            }

            match self.submit_file(&file, &target_langs, options).await {
                Ok(job_id) => {
                    let label = file
                        .file_name()
                        .map(|f| f.to_string_lossy().to_string())
                        .unwrap_or_else(|| job_id.clone());
                    let bar = multi_progress.add(ProgressBar::new(100));
                    bar.set_style(progress_style());
                    bar.set_message(label.clone());
                    jobs.push(PendingJob {
                        input: file,
                        output_dir,
                        job_id,
                        label,
                        bar,
                    });
                }
                Err(e) => {
                    error!("Error submitting file {:?}: {:#}", file, e);
                    summary.failed += 1;
                }
            }
        }

        summary.interrupted = self.wait_for_jobs(&jobs).await;

        let _ = stop_tx.send(true);
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Worker pool failed: {:#}", e),
            Err(e) => error!("Worker pool task failed: {}", e),
        }

        for job in &jobs {
            if let Err(e) = self.collect_output(job, options, &mut summary).await {
                error!("Error collecting {:?}: {:#}", job.input, e);
                summary.failed += 1;
            }
        }

        let summary_message = format!(
            "Translation completed: {} processed, {} skipped, {} errors in {}",
            summary.processed,
            summary.skipped,
            summary.failed,
            format_duration(start_time.elapsed())
        );
        info!("{}", summary_message);

        if input.is_dir() && summary.failed > 0 {
            let log_path = input.join("yttrans.issues.log");
            if let Err(e) = FileManager::append_to_log_file(&log_path, &summary_message) {
                warn!("Failed to write run log: {}", e);
            }
        }

        if summary.interrupted {
            warn!("Interrupted: unfinished jobs were stopped");
        }

        Ok(summary)
    }

    fn resolve_targets(&self, options: &TranslateOptions) -> Result<Vec<String>> {
        let targets: Vec<String> = if options.target_langs.is_empty() {
            self.config.langs.clone()
        } else {
            options.target_langs.clone()
        };
        let targets: Vec<String> = targets
            .into_iter()
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();

        if targets.is_empty() {
            return Err(anyhow!(
                "No target languages given (use --target or set `langs` in the config)"
            ));
        }
        Ok(targets)
    }

    fn collect_inputs(&self, input: &Path, target_langs: &[String]) -> Result<Vec<PathBuf>> {
        if input.is_file() {
            return Ok(vec![input.to_path_buf()]);
        }
        if !input.is_dir() {
            return Err(anyhow!("Input path does not exist: {:?}", input));
        }

        let files = FileManager::find_files(input, CAPTION_EXTENSION)?
            .into_iter()
            .filter(|path| !FileManager::is_translation_output(path, target_langs))
            .collect();
        Ok(files)
    }

    async fn submit_file(
        &self,
        file: &Path,
        target_langs: &[String],
        options: &TranslateOptions,
    ) -> Result<String> {
        let src_vtt = FileManager::read_to_string(file)?;
        let video_id = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut request_options = crate::database::models::Meta::new();
        request_options.insert(
            "source_file".to_string(),
            serde_json::json!(file.to_string_lossy()),
        );

        let job_id = self
            .service
            .submit(SubmitRequest {
                video_id,
                src_vtt,
                src_lang: options.src_lang.clone(),
                target_langs: target_langs.to_vec(),
                options: request_options,
            })
            .await?;
        Ok(job_id)
    }

    /// Poll until every job is terminal; `true` when interrupted by Ctrl-C
    async fn wait_for_jobs(&self, jobs: &[PendingJob]) -> bool {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ctrl_c_armed = true;

        loop {
            let statuses = join_all(jobs.iter().map(|job| self.service.get_status(&job.job_id))).await;

            let mut all_terminal = true;
            for (job, status) in jobs.iter().zip(statuses) {
                match status {
                    Ok(status) => {
                        job.bar.set_position(status.percent as u64);
                        if status.state.is_terminal() {
                            if !job.bar.is_finished() {
                                job.bar.finish_with_message(format!(
                                    "{} {}",
                                    job.label, status.message
                                ));
                            }
                        } else {
                            all_terminal = false;
                            job.bar
                                .set_message(format!("{} {}", job.label, status.message));
                        }
                    }
                    Err(e) => warn!("job={} status_read_failed err={}", job.job_id, e),
                }
            }

            if all_terminal {
                return false;
            }

            tokio::select! {
                res = &mut ctrl_c, if ctrl_c_armed => match res {
                    Ok(()) => {
                        warn!("Ctrl-C received, stopping workers");
                        return true;
                    }
                    Err(e) => {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                        ctrl_c_armed = false;
                    }
                },
                _ = tokio::time::sleep(STATUS_POLL_INTERVAL) => {}
            }
        }
    }

    async fn collect_output(
        &self,
        job: &PendingJob,
        options: &TranslateOptions,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let status = self.service.get_status(&job.job_id).await?;
        if !job.bar.is_finished() {
            job.bar
                .abandon_with_message(format!("{} {}", job.label, status.message));
        }

        match status.state {
            JobState::Done => {
                let result = self.service.get_result(&job.job_id).await?;
                for entry in &result.entries {
                    let path = FileManager::generate_output_path(
                        &job.input,
                        &job.output_dir,
                        &entry.lang,
                        CAPTION_EXTENSION,
                    );
                    if path.exists() && !options.force_overwrite {
                        warn!("Output file already exists: {:?}. Use -f to force overwrite.", path);
                        continue;
                    }
                    FileManager::write_to_file(&path, &entry.vtt)?;
                    info!("Success: {}", path.display());
                    summary.written.push(path);
                }

                let failed_langs: Vec<&str> = result
                    .meta
                    .get("failed_langs")
                    .and_then(|v| v.as_array())
                    .map(|langs| langs.iter().filter_map(|l| l.as_str()).collect())
                    .unwrap_or_default();
                if !failed_langs.is_empty() {
                    warn!("{}: failed languages: {}", job.label, failed_langs.join(", "));
                }
                summary.processed += 1;
            }
            JobState::Failed => {
                let err = status
                    .meta
                    .get("err")
                    .and_then(|v| v.as_str())
                    .unwrap_or(status.message.as_str())
                    .to_string();
                error!("{}: translation failed: {}", job.label, err);
                summary.failed += 1;
            }
            state => {
                warn!("{}: job {} left in state {}", job.label, job.job_id, state);
                summary.failed += 1;
            }
        }
        Ok(())
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {pos}% {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

// Format duration in a human-readable format
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
