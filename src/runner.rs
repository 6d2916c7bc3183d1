//! Batch run orchestration.
//!
//! One worker per run walks the address list strictly sequentially and
//! reports progress over a channel; the caller's task drains the channel
//! and renders. Network calls block only the worker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::amap::client::AmapClient;
use crate::config::AppConfig;
use crate::output::backup::{backup_file_name, BackupWriter};
use crate::output::summary::SummaryWriter;
use crate::scoring::profile::POI_PROFILE;
use crate::scoring::scorer::{self, EvaluationResult};

/// Progress events emitted by the run worker.
#[derive(Debug)]
pub enum RunEvent {
    AddressStarted {
        index: usize,
        total: usize,
        address: String,
    },
    GeocodeFailed {
        address: String,
    },
    Evaluated(Box<EvaluationResult>),
    Finished {
        evaluated: usize,
        skipped: usize,
    },
}

pub struct Runner {
    client: Arc<AmapClient>,
    config: AppConfig,
}

impl Runner {
    pub fn new(client: Arc<AmapClient>, config: AppConfig) -> Self {
        Self { client, config }
    }

    /// Spawn the run worker. Addresses are processed in order; the
    /// returned receiver yields progress until `Finished`.
    pub fn spawn(
        self,
        addresses: Vec<String>,
        radius_m: u32,
    ) -> (mpsc::UnboundedReceiver<RunEvent>, JoinHandle<Result<()>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move { self.run(addresses, radius_m, tx).await });
        (rx, handle)
    }

    async fn run(
        self,
        addresses: Vec<String>,
        radius_m: u32,
        events: mpsc::UnboundedSender<RunEvent>,
    ) -> Result<()> {
        let run_stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let summary = SummaryWriter::dated(&self.config.output.summary_prefix, POI_PROFILE);
        let total = addresses.len();
        let mut evaluated = 0usize;
        let mut skipped = 0usize;

        for (i, address) in addresses.iter().enumerate() {
            let index = i + 1;
            let _ = events.send(RunEvent::AddressStarted {
                index,
                total,
                address: address.clone(),
            });

            let backup_path = PathBuf::from(&self.config.output.backup_dir)
                .join(backup_file_name(address, &run_stamp, index));
            match BackupWriter::create(&backup_path) {
                Ok(writer) => {
                    info!(path = %backup_path.display(), "Raw responses will be backed up");
                    self.client.install_backup(Some(writer)).await;
                }
                Err(e) => {
                    warn!(error = %e, "Backup file unavailable; continuing without raw backup");
                    self.client.install_backup(None).await;
                }
            }

            match scorer::evaluate_location(self.client.as_ref(), POI_PROFILE, address, radius_m)
                .await?
            {
                Some(result) => {
                    summary.append(&result)?;
                    info!(path = %summary.path().display(), "Summary row appended");
                    evaluated += 1;
                    let _ = events.send(RunEvent::Evaluated(Box::new(result)));
                }
                None => {
                    warn!(address = %address, "Geocoding failed; skipping address");
                    skipped += 1;
                    let _ = events.send(RunEvent::GeocodeFailed {
                        address: address.clone(),
                    });
                }
            }
        }

        self.client.install_backup(None).await;
        let _ = events.send(RunEvent::Finished { evaluated, skipped });
        Ok(())
    }
}
