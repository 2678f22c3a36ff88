use crate::driver::traits::AutomationDriver;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Per-run information shared by the runner and the report builder
pub struct RunContext {
    /// Suite name, used as artifact prefix ("api", "mobile", "web")
    suite: String,

    /// Distinct identifier of this run, embedded in every artifact name
    run_id: String,

    /// Wall-clock start of the run
    started_at: DateTime<Utc>,

    /// Output directory for reports and artifacts
    output_dir: PathBuf,

    screenshots: ScreenshotSink,
}

impl RunContext {
    pub fn new(suite: &str, output_dir: &Path) -> Result<Self> {
        let started_at = Utc::now();
        let run_id = new_run_id(started_at);

        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;

        let screenshots_dir = output_dir
            .join("screenshots")
            .join(format!("{}_{}", suite, run_id));

        Ok(Self {
            suite: suite.to_string(),
            run_id,
            started_at,
            output_dir: output_dir.to_path_buf(),
            screenshots: ScreenshotSink::new(screenshots_dir),
        })
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run-unique artifact path: `<output>/<suite>_<stem>_<run-id>.<ext>`
    pub fn artifact_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}_{}.{}", self.suite, stem, self.run_id, ext))
    }

    pub fn screenshots(&self) -> ScreenshotSink {
        self.screenshots.clone()
    }
}

/// Generate a run id: UTC timestamp with millis plus a short random suffix
pub fn new_run_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{}_{}", now.format("%Y%m%d_%H%M%S_%3f"), suffix)
}

/// Replace everything except ASCII alphanumerics with `_`
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    slug.trim_matches('_').to_string()
}

/// Writes numbered screenshots for one run.
///
/// Cheap to clone; all clones share the same sequence counter.
#[derive(Clone)]
pub struct ScreenshotSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    dir: PathBuf,
    counter: AtomicU32,
}

impl ScreenshotSink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                dir,
                counter: AtomicU32::new(0),
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Next screenshot path: `<dir>/<seq>_<test>_<step>.png`
    pub fn next_path(&self, test: &str, step: &str) -> PathBuf {
        let seq = self.inner.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .dir
            .join(format!("{:02}_{}_{}.png", seq, slugify(test), slugify(step)))
    }

    /// Capture the driver's current screen and write it to the next path.
    ///
    /// Returns the written path as a string for use as an attachment reference.
    pub async fn capture(
        &self,
        driver: &dyn AutomationDriver,
        test: &str,
        step: &str,
    ) -> Result<String> {
        let bytes = driver
            .capture_image()
            .await
            .context("Failed to capture screenshot")?;
        self.save(&bytes, test, step)
    }

    pub fn save(&self, png: &[u8], test: &str, step: &str) -> Result<String> {
        std::fs::create_dir_all(self.dir()).with_context(|| {
            format!("Failed to create screenshot directory {}", self.dir().display())
        })?;
        let path = self.next_path(test, step);
        std::fs::write(&path, png)
            .with_context(|| format!("Failed to write screenshot {}", path.display()))?;
        log::debug!("screenshot saved: {}", path.display());
        Ok(path.to_string_lossy().to_string())
    }
}
