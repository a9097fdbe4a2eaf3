//! Color theme for CLI output

use crate::domain::workflow::{StepStatus, WorkflowStatus};
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    pub fn get_workflow_color(&self, status: WorkflowStatus) -> TableColor {
        match status {
            WorkflowStatus::Pending => self.muted,
            WorkflowStatus::Running => self.info,
            WorkflowStatus::Succeeded => self.success,
            WorkflowStatus::Failed => self.error,
            WorkflowStatus::Aborted => self.warning,
        }
    }

    pub fn get_step_color(&self, status: StepStatus) -> TableColor {
        match status {
            StepStatus::Pending | StepStatus::Skipped => self.muted,
            StepStatus::Running => self.info,
            StepStatus::Succeeded => self.success,
            StepStatus::Failed => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_theme() {
        let theme = ColorTheme::default();
        assert_eq!(theme.success, TableColor::Green);
        assert_eq!(theme.warning, TableColor::Yellow);
        assert_eq!(theme.error, TableColor::Red);
    }

    #[test]
    fn test_status_colors() {
        let theme = ColorTheme::default();
        assert_eq!(theme.get_workflow_color(WorkflowStatus::Succeeded), TableColor::Green);
        assert_eq!(theme.get_workflow_color(WorkflowStatus::Aborted), TableColor::Yellow);
        assert_eq!(theme.get_step_color(StepStatus::Failed), TableColor::Red);
        assert_eq!(theme.get_step_color(StepStatus::Skipped), TableColor::DarkGrey);
    }
}
