//! Parallel branch results and their merge.

use serde::{Deserialize, Serialize};

/// Outcome of one target of a parallel handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchResult {
    pub agent_name: String,
    pub success: bool,
    /// Final answer text; empty when the branch failed.
    pub output: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BranchResult {
    pub fn succeeded(agent_name: impl Into<String>, output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            agent_name: agent_name.into(),
            success: true,
            output: output.into(),
            duration_ms,
            error: None,
        }
    }

    pub fn failed(agent_name: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            agent_name: agent_name.into(),
            success: false,
            output: String::new(),
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// Merge branch results, already in completion order, into the text handed
/// to the aggregation target.
pub fn merge_results(from_agent: &str, message: &str, results: &[BranchResult]) -> String {
    let succeeded = results.iter().filter(|r| r.success).count();
    let mut summary = format!(
        "Parallel handoff from {} completed: {}/{} branch(es) succeeded.\nTask: {}\n",
        from_agent,
        succeeded,
        results.len(),
        message
    );
    for result in results {
        let status = if result.success { "success" } else { "failed" };
        summary.push_str(&format!(
            "\n## {} ({}, {} ms)\n",
            result.agent_name, status, result.duration_ms
        ));
        match result.error {
            Some(ref err) => summary.push_str(&format!("Error: {}\n", err)),
            None => {
                summary.push_str(result.output.trim_end());
                summary.push('\n');
            }
        }
    }
    summary
}
