//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::catalog::{Location, NodePoolConfiguration};
use crate::domain::workflow::{StepStatus, WorkflowStatus};
use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// Workflow summary for list and status display
#[derive(Debug, Clone)]
pub struct WorkflowInfo {
    pub id: String,
    pub subject: String,
    pub strategy: Option<String>,
    pub status: WorkflowStatus,
    pub dry_run: bool,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct StepInfo {
    pub name: String,
    pub status: StepStatus,
    pub depends_on: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub logs: String,
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    fn status_cell(&self, status: WorkflowStatus) -> Cell {
        Cell::new(format!(
            "{} {}",
            StatusIcon::get_workflow_icon(status),
            status
        ))
        .fg(self.theme.get_workflow_color(status))
    }

    pub fn render_workflows_list(&self, workflows: &[WorkflowInfo]) -> String {
        if workflows.is_empty() {
            return "No workflows found".to_string();
        }

        let mut table = self.table();
        table.set_header(vec![
            Cell::new("WORKFLOW").set_alignment(CellAlignment::Left),
            Cell::new("SUBJECT").set_alignment(CellAlignment::Left),
            Cell::new("STRATEGY").set_alignment(CellAlignment::Center),
            Cell::new("STATUS").set_alignment(CellAlignment::Center),
            Cell::new("CREATED").set_alignment(CellAlignment::Left),
        ]);

        for workflow in workflows {
            let subject = if workflow.dry_run {
                format!("{} (dry run)", workflow.subject)
            } else {
                workflow.subject.clone()
            };
            table.add_row(vec![
                Cell::new(&workflow.id),
                Cell::new(subject),
                Cell::new(workflow.strategy.as_deref().unwrap_or("-"))
                    .set_alignment(CellAlignment::Center),
                self.status_cell(workflow.status),
                Cell::new(format_time(Some(workflow.created_at))),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Workflows {} ─╮\n",
            format!("[{} workflows]", workflows.len()).bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Succeeded  {} Running  {} Aborted  {} Failed\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::RUNNING.cyan(),
            StatusIcon::WARNING.yellow(),
            StatusIcon::ERROR.red()
        ));

        output
    }

    pub fn render_workflow_status(
        &self,
        workflow: &WorkflowInfo,
        last_error: Option<&str>,
        abort_reason: Option<&str>,
        retried_from: Option<&str>,
    ) -> String {
        let mut table = self.table();
        table.add_row(vec![
            Cell::new("📋 Workflow Status").set_alignment(CellAlignment::Center)
        ]);
        table.add_row(vec![Cell::new(format!(
            "Workflow: {} | Subject: {}",
            workflow.id, workflow.subject
        ))]);
        table.add_row(vec![self.status_cell(workflow.status)]);

        let mut details = format!(
            "Strategy: {}\nDry run: {}\nCreated: {}\nFinished: {}",
            workflow.strategy.as_deref().unwrap_or("-"),
            workflow.dry_run,
            format_time(Some(workflow.created_at)),
            format_time(workflow.finished_at)
        );
        if let Some(from) = retried_from {
            details.push_str(&format!("\nRetry of: {}", from));
        }
        table.add_row(vec![Cell::new(details)]);

        if let Some(error) = last_error {
            table.add_row(vec![
                Cell::new(format!("Error: {}", error)).fg(self.theme.error)
            ]);
        }
        if let Some(reason) = abort_reason {
            table.add_row(vec![
                Cell::new(format!("Abort reason: {}", reason)).fg(self.theme.warning)
            ]);
        }

        table.to_string()
    }

    pub fn render_steps(&self, steps: &[StepInfo], with_logs: bool) -> String {
        let mut table = self.table();
        let mut header = vec![
            Cell::new("STEP").set_alignment(CellAlignment::Left),
            Cell::new("STATUS").set_alignment(CellAlignment::Center),
            Cell::new("DEPENDS ON").set_alignment(CellAlignment::Left),
            Cell::new("STARTED").set_alignment(CellAlignment::Left),
            Cell::new("FINISHED").set_alignment(CellAlignment::Left),
        ];
        if with_logs {
            header.push(Cell::new("LOGS").set_alignment(CellAlignment::Left));
        }
        table.set_header(header);

        for step in steps {
            let mut row = vec![
                Cell::new(&step.name),
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::get_step_icon(step.status),
                    step.status
                ))
                .fg(self.theme.get_step_color(step.status)),
                Cell::new(if step.depends_on.is_empty() {
                    "-".to_string()
                } else {
                    step.depends_on.join(", ")
                }),
                Cell::new(format_time(step.started_at)),
                Cell::new(format_time(step.finished_at)),
            ];
            if with_logs {
                row.push(Cell::new(&step.logs).fg(self.theme.muted));
            }
            table.add_row(row);
        }

        table.to_string()
    }

    pub fn render_pools(&self, pools: &[NodePoolConfiguration]) -> String {
        let mut table = self.table();
        table.set_header(vec![
            Cell::new("POOL TYPE"),
            Cell::new("INSTANCE SIZES"),
            Cell::new("FAMILY").set_alignment(CellAlignment::Center),
            Cell::new("MAX CPU").set_alignment(CellAlignment::Right),
            Cell::new("MAX MEMORY").set_alignment(CellAlignment::Right),
            Cell::new("WORKLOADS"),
        ]);

        for pool in pools {
            table.add_row(vec![
                Cell::new(format!("{}\n{}", pool.name, pool.description.bright_black())),
                Cell::new(pool.instance_sizes.join(", ")),
                Cell::new(pool.instance_family).set_alignment(CellAlignment::Center),
                Cell::new(pool.max_cpu).set_alignment(CellAlignment::Right),
                Cell::new(pool.max_memory).set_alignment(CellAlignment::Right),
                Cell::new(pool.workloads.join(", ")).fg(self.theme.info),
            ]);
        }

        table.to_string()
    }

    pub fn render_locations(&self, locations: &[Location]) -> String {
        let mut table = self.table();
        table.set_header(vec![Cell::new("LOCATION"), Cell::new("DISPLAY NAME")]);
        for location in locations {
            table.add_row(vec![
                Cell::new(location.name),
                Cell::new(location.display_name),
            ]);
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{list_locations, list_pool_types};

    fn workflow(status: WorkflowStatus) -> WorkflowInfo {
        WorkflowInfo {
            id: "3f2c".to_string(),
            subject: "Namespace/team-a".to_string(),
            strategy: None,
            status,
            dry_run: true,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    #[test]
    fn test_render_empty_workflows() {
        let renderer = TableRenderer::new();
        let output = renderer.render_workflows_list(&[]);
        assert!(output.contains("No workflows found"));
    }

    #[test]
    fn test_render_workflow_row() {
        let renderer = TableRenderer::new();
        let output = renderer.render_workflows_list(&[workflow(WorkflowStatus::Running)]);
        assert!(output.contains("Namespace/team-a (dry run)"));
        assert!(output.contains("Running"));
    }

    #[test]
    fn test_render_status_with_error() {
        let renderer = TableRenderer::new();
        let output = renderer.render_workflow_status(
            &workflow(WorkflowStatus::Failed),
            Some("step 'apply-namespace' failed"),
            None,
            None,
        );
        assert!(output.contains("apply-namespace"));
        assert!(!output.contains("Abort reason"));
    }

    #[test]
    fn test_render_steps_with_logs() {
        let renderer = TableRenderer::new();
        let steps = vec![StepInfo {
            name: "verify-namespace".to_string(),
            status: StepStatus::Skipped,
            depends_on: vec!["apply-namespace".to_string()],
            started_at: None,
            finished_at: None,
            logs: "nothing ran".to_string(),
        }];
        let output = renderer.render_steps(&steps, true);
        assert!(output.contains("verify-namespace"));
        assert!(output.contains("nothing ran"));
        assert!(!renderer.render_steps(&steps, false).contains("nothing ran"));
    }

    #[test]
    fn test_render_catalog() {
        let renderer = TableRenderer::new();
        assert!(renderer
            .render_pools(list_pool_types())
            .contains("general-purpose"));
        assert!(renderer
            .render_locations(list_locations())
            .contains("West Europe"));
    }
}
