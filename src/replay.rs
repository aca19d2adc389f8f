//! Scripted match replay
//!
//! Drives a `MatchService` through a JSON script of player registrations and
//! match operations. Matches are referred to by script-local labels so a
//! script can edit or delete a match it recorded earlier. A failing step is
//! reported and the replay carries on with the next one.

use crate::service::MatchService;
use crate::types::{MatchId, PlayerId, RatingChange};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// A replay script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Registered before any step runs
    #[serde(default)]
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

/// One lifecycle operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    Record {
        label: String,
        player1: PlayerId,
        player2: PlayerId,
        goals1: i64,
        goals2: i64,
    },
    Edit {
        label: String,
        goals1: i64,
        goals2: i64,
    },
    Delete {
        label: String,
    },
}

impl ReplayStep {
    pub fn op(&self) -> &'static str {
        match self {
            ReplayStep::Record { .. } => "record",
            ReplayStep::Edit { .. } => "edit",
            ReplayStep::Delete { .. } => "delete",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ReplayStep::Record { label, .. }
            | ReplayStep::Edit { label, .. }
            | ReplayStep::Delete { label } => label,
        }
    }
}

/// How a single step ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Applied { rating_changes: Vec<RatingChange> },
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub op: String,
    pub label: String,
    pub status: StepStatus,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, StepStatus::Applied { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
}

impl ReplayReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|step| !step.succeeded()).count()
    }
}

impl ReplayScript {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid replay script")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        Self::from_json(&contents)
    }
}

/// Run every step of `script` against `service`
pub async fn replay(service: &MatchService, script: &ReplayScript) -> Result<ReplayReport> {
    for player_id in &script.players {
        service
            .register_player(player_id.clone())
            .await
            .with_context(|| format!("Failed to register player {}", player_id))?;
    }

    let mut labels: HashMap<String, MatchId> = HashMap::new();
    let mut report = ReplayReport::default();

    for (index, step) in script.steps.iter().enumerate() {
        let status = match run_step(service, &mut labels, step).await {
            Ok(rating_changes) => StepStatus::Applied { rating_changes },
            Err((kind, message)) => {
                warn!(
                    "Step {} ({} {}) failed: {}",
                    index,
                    step.op(),
                    step.label(),
                    message
                );
                StepStatus::Failed { kind, message }
            }
        };

        report.steps.push(StepReport {
            index,
            op: step.op().to_string(),
            label: step.label().to_string(),
            status,
        });
    }

    info!(
        "Replayed {} steps, {} failed",
        report.steps.len(),
        report.failures()
    );
    Ok(report)
}

type StepResult = std::result::Result<Vec<RatingChange>, (String, String)>;

async fn run_step(
    service: &MatchService,
    labels: &mut HashMap<String, MatchId>,
    step: &ReplayStep,
) -> StepResult {
    let failed = |e: crate::error::LedgerError| (e.kind().to_string(), e.to_string());

    match step {
        ReplayStep::Record {
            label,
            player1,
            player2,
            goals1,
            goals2,
        } => {
            if labels.contains_key(label) {
                return Err(duplicate_label(label));
            }
            let receipt = service
                .record_match(player1.clone(), player2.clone(), *goals1, *goals2)
                .await
                .map_err(failed)?;
            labels.insert(label.clone(), receipt.record.id);
            Ok(receipt.rating_changes)
        }
        ReplayStep::Edit {
            label,
            goals1,
            goals2,
        } => {
            let match_id = *labels.get(label).ok_or_else(|| unknown_label(label))?;
            let receipt = service
                .edit_match(match_id, *goals1, *goals2)
                .await
                .map_err(failed)?;
            Ok(receipt.rating_changes)
        }
        ReplayStep::Delete { label } => {
            let match_id = *labels.get(label).ok_or_else(|| unknown_label(label))?;
            let receipt = service.delete_match(match_id).await.map_err(failed)?;
            labels.remove(label);
            Ok(receipt.rating_changes)
        }
    }
}

fn unknown_label(label: &str) -> (String, String) {
    (
        "unknown_label".to_string(),
        format!("no recorded match labelled '{}'", label),
    )
}

fn duplicate_label(label: &str) -> (String, String) {
    (
        "duplicate_label".to_string(),
        format!("label '{}' is already in use", label),
    )
}
