use super::state::{RunSummary, TestStatus};
use tokio::sync::broadcast;

/// Run execution events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Run events
    RunStarted {
        suite: String,
        case_count: usize,
    },
    RunFinished {
        summary: RunSummary,
    },

    // Grouping ("Positive", "Negative", per-flow headers)
    GroupStarted {
        name: String,
    },

    // Case events
    CaseStarted {
        index: usize,
        name: String,
    },
    CaseFinished {
        index: usize,
        name: String,
        status: TestStatus,
        actual: String,
        duration_ms: u64,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting run events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates.
///
/// Runs until every sender of the channel is dropped, so awaiting the spawned
/// task after a run guarantees all progress lines have been printed.
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::RunStarted { suite, case_count } => {
                    println!(
                        "\n{} Running {} suite ({} cases)",
                        "▶".green().bold(),
                        suite.cyan(),
                        case_count
                    );
                }

                TestEvent::GroupStarted { name } => {
                    println!("\n{}", "=".repeat(60));
                    println!("  {} {}", "→".blue(), name.white().bold());
                    println!("{}", "=".repeat(60));
                }

                TestEvent::CaseStarted { index, name } => {
                    // Piped output gets no spinner escape codes
                    let pb = if interactive {
                        ProgressBar::new_spinner()
                    } else {
                        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
                    };
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    pb.set_message(format!("[{}] {}... ", index + 1, name.dimmed()));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                TestEvent::CaseFinished {
                    index,
                    name,
                    status,
                    actual,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let icon = match status {
                        TestStatus::Pass => "✓".green(),
                        TestStatus::Fail => "✗".red(),
                    };
                    println!("    {} [{}] {} ({}ms)", icon, index + 1, name, duration_ms);
                    let actual_line = match status {
                        TestStatus::Pass => actual.dimmed(),
                        TestStatus::Fail => actual.red(),
                    };
                    println!("        {}", actual_line);
                }

                TestEvent::Log { message } => match &spinner {
                    Some(pb) => pb.println(format!("        {}", message)),
                    None => println!("        {}", message),
                },

                TestEvent::RunFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "\n{} {} suite finished: {} passed, {} failed",
                        "■".blue().bold(),
                        summary.suite(),
                        summary.passed().to_string().green(),
                        summary.failed().to_string().red()
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_ends_when_emitter_dropped() {
        let (emitter, receiver) = EventEmitter::new();
        let handle = tokio::spawn(ConsoleEventListener::listen(receiver));

        emitter.emit(TestEvent::Log {
            message: "hello".to_string(),
        });
        drop(emitter);

        tokio::time::timeout(StdDuration::from_secs(5), handle)
            .await
            .expect("listener should stop once the channel closes")
            .expect("listener task panicked");
    }

    #[test]
    fn test_subscribers_receive_events_in_order() {
        let (emitter, mut receiver) = EventEmitter::new();
        emitter.emit(TestEvent::CaseStarted {
            index: 0,
            name: "first".to_string(),
        });
        emitter.emit(TestEvent::CaseStarted {
            index: 1,
            name: "second".to_string(),
        });

        match receiver.try_recv().unwrap() {
            TestEvent::CaseStarted { name, .. } => assert_eq!(name, "first"),
            other => panic!("unexpected event: {:?}", other),
        }
        match receiver.try_recv().unwrap() {
            TestEvent::CaseStarted { name, .. } => assert_eq!(name, "second"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
