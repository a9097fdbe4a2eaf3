//! Status icons for CLI output

use crate::domain::workflow::{StepStatus, WorkflowStatus};

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    pub const SUCCESS: &'static str = "✓";

    /// Aborted workflows
    pub const WARNING: &'static str = "⚠";

    pub const ERROR: &'static str = "✗";

    pub const PENDING: &'static str = "⏳";

    pub const RUNNING: &'static str = "▶";

    /// Skipped steps
    pub const SKIPPED: &'static str = "–";

    pub fn get_workflow_icon(status: WorkflowStatus) -> &'static str {
        match status {
            WorkflowStatus::Pending => Self::PENDING,
            WorkflowStatus::Running => Self::RUNNING,
            WorkflowStatus::Succeeded => Self::SUCCESS,
            WorkflowStatus::Failed => Self::ERROR,
            WorkflowStatus::Aborted => Self::WARNING,
        }
    }

    pub fn get_step_icon(status: StepStatus) -> &'static str {
        match status {
            StepStatus::Pending => Self::PENDING,
            StepStatus::Running => Self::RUNNING,
            StepStatus::Succeeded => Self::SUCCESS,
            StepStatus::Failed => Self::ERROR,
            StepStatus::Skipped => Self::SKIPPED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_icons() {
        assert_eq!(
            StatusIcon::get_workflow_icon(WorkflowStatus::Succeeded),
            StatusIcon::SUCCESS
        );
        assert_eq!(
            StatusIcon::get_workflow_icon(WorkflowStatus::Aborted),
            StatusIcon::WARNING
        );
        assert_eq!(
            StatusIcon::get_workflow_icon(WorkflowStatus::Failed),
            StatusIcon::ERROR
        );
    }

    #[test]
    fn test_step_icons() {
        assert_eq!(StatusIcon::get_step_icon(StepStatus::Skipped), StatusIcon::SKIPPED);
        assert_eq!(StatusIcon::get_step_icon(StepStatus::Pending), StatusIcon::PENDING);
    }
}
