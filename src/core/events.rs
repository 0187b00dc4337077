use tokio::sync::mpsc;

/// Incremental status emitted during a scan or clean run.
///
/// Percentages are monotonically non-decreasing within one operation and the
/// final event always carries exactly 100.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Scan {
        percent: f64,
        operation: String,
        category: Option<String>,
        files_found: usize,
        bytes_found: u64,
    },
    Clean {
        percent: f64,
        operation: String,
        files_processed: usize,
        bytes_processed: u64,
    },
}

impl ProgressEvent {
    pub fn percent(&self) -> f64 {
        match self {
            ProgressEvent::Scan { percent, .. } | ProgressEvent::Clean { percent, .. } => *percent,
        }
    }

    pub fn operation(&self) -> &str {
        match self {
            ProgressEvent::Scan { operation, .. } | ProgressEvent::Clean { operation, .. } => {
                operation
            }
        }
    }
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}
