//! Workflow commands

use crate::cli::display::{
    table::{StepInfo, WorkflowInfo},
    TableRenderer,
};
use crate::domain::catalog::{list_locations, list_pool_types};
use crate::domain::config::{
    apply_dynamic_configs, parse_dynamic_configs, ProvisionerConfig, StoreBackend,
};
use crate::domain::provisioner::Provisioner;
use crate::domain::request::ProvisioningRequest;
use crate::domain::workflow::{StepRecord, WorkflowId, WorkflowRecord, WorkflowStatus};
use crate::infrastructure::runtime;
use crate::shared::ErrorKind;
use clap::{Args, Parser};

const INTERRUPT_REASON: &str = "interrupted from the command line";

/// Options shared by every command that talks to a cluster.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the provisioner configuration file (TOML)
    /// If not provided, KUBE_PROVISIONER_CONFIG is used, then built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Path to kubeconfig file (overrides kubernetes.kubeconfig)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubernetes context to use (overrides kubernetes.context)
    #[arg(long)]
    pub context: Option<String>,

    /// Dynamic configuration properties (-D key=value)
    ///
    /// Kubernetes: kubernetes.kubeconfig, kubernetes.context, kubernetes.engine-namespace,
    ///   kubernetes.state-namespace, kubernetes.service-account
    /// Observation: observation.poll-interval-ms, observation.window-secs,
    ///   observation.retry-attempts, observation.min-backoff-ms, observation.max-backoff-ms
    /// Strategy: strategy.use-composition
    /// Store: store.backend (memory | configmap)
    ///
    /// Example: -Dstrategy.use-composition=true -Dobservation.window-secs=1800
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

impl ConfigArgs {
    /// Priority: command line > -D properties > config file > defaults
    pub fn load(&self) -> anyhow::Result<ProvisionerConfig> {
        let mut config = ProvisionerConfig::load(self.config.as_deref())?;

        if !self.properties.is_empty() {
            let dynamic = parse_dynamic_configs(&self.properties)
                .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))?;
            apply_dynamic_configs(&dynamic, &mut config)?;
        }
        if self.kubeconfig.is_some() {
            config.kubernetes.kubeconfig = self.kubeconfig.clone();
        }
        if self.context.is_some() {
            config.kubernetes.context = self.context.clone();
        }
        Ok(config)
    }

    async fn connect(&self) -> anyhow::Result<Provisioner> {
        let config = self.load()?;
        runtime::connect(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Kubernetes: {}", e))
    }
}

fn parse_id(id: &str) -> anyhow::Result<WorkflowId> {
    id.parse::<WorkflowId>()
        .map_err(|e| anyhow::anyhow!("Invalid workflow id: {}", e))
}

fn workflow_info(record: &WorkflowRecord) -> WorkflowInfo {
    WorkflowInfo {
        id: record.id.to_string(),
        subject: record.subject.to_string(),
        strategy: record.strategy.map(|s| s.to_string()),
        status: record.status,
        dry_run: record.dry_run,
        created_at: record.created_at,
        finished_at: record.finished_at,
    }
}

fn step_info(step: &StepRecord) -> StepInfo {
    StepInfo {
        name: step.name.clone(),
        status: step.status,
        depends_on: step.depends_on.clone(),
        started_at: step.started_at,
        finished_at: step.finished_at,
        logs: step.logs.clone(),
    }
}

fn print_record(record: &WorkflowRecord, with_logs: bool) {
    let renderer = TableRenderer::new();
    let steps: Vec<StepInfo> = record.steps.iter().map(step_info).collect();
    println!(
        "{}",
        renderer.render_workflow_status(
            &workflow_info(record),
            record.last_error.as_ref().map(|e| e.message.as_str()),
            record.abort_reason.as_deref(),
            record.retried_from.map(|id| id.to_string()).as_deref(),
        )
    );
    println!("{}", renderer.render_steps(&steps, with_logs));
}

/// Workflows execute inside this process, so leaving early aborts them
/// rather than leaving a record nobody drives.
async fn follow(provisioner: &Provisioner, id: WorkflowId) -> anyhow::Result<()> {
    println!("Following workflow {} (Ctrl-C aborts it)", id);
    let orchestrator = provisioner.orchestrator();
    let record = tokio::select! {
        record = orchestrator.wait(&id) => record?,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted, aborting workflow {}", id);
            match orchestrator.abort(&id, INTERRUPT_REASON).await {
                Ok(_) => orchestrator.wait(&id).await?,
                // finished in the meantime
                Err(err) if err.kind() == ErrorKind::InvalidState => {
                    orchestrator.get_status(&id).await?
                }
                Err(err) => return Err(err.into()),
            }
        }
    };
    print_record(&record, false);

    match record.status {
        WorkflowStatus::Succeeded => Ok(()),
        status => Err(anyhow::anyhow!("Workflow {} finished {}", id, status)),
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ProvisionCommand {
    /// Request file (YAML, JSON or TOML, chosen by extension)
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: String,

    /// Run as a dry run regardless of the request file
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ProvisionCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let mut request = ProvisioningRequest::from_file(&self.file)
            .map_err(|e| anyhow::anyhow!("Failed to read request {}: {}", self.file, e))?;
        if self.dry_run {
            request.dry_run = true;
        }

        let config = self.config.load()?;
        // A dry run against the in-memory store needs no cluster at all.
        let provisioner = if request.dry_run && config.store.backend == StoreBackend::Memory {
            runtime::offline(&config)
        } else {
            runtime::connect(&config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to Kubernetes: {}", e))?
        };

        let id = provisioner.provision(&request).await?;
        println!(
            "Workflow {} started for {} {}{}",
            id,
            request.kind,
            request.name,
            if request.dry_run { " (dry run)" } else { "" }
        );
        follow(&provisioner, id).await
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RenderCommand {
    /// Request file (YAML, JSON or TOML, chosen by extension)
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: String,

    /// Render with the composition strategy regardless of configuration
    #[arg(long)]
    pub composition: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl RenderCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let request = ProvisioningRequest::from_file(&self.file)
            .map_err(|e| anyhow::anyhow!("Failed to read request {}: {}", self.file, e))?;
        let provisioner = runtime::offline(&self.config.load()?);
        if self.composition {
            provisioner.flag().set(true);
        }

        let rendered = provisioner.render(&request)?;
        if let Some(parameters) = &rendered.parameters {
            println!("# strategy: {}", parameters.strategy());
            for field in parameters.ignored_fields() {
                println!("# ignored: {}", field);
            }
        }
        print!("{}", rendered.manifests.to_yaml()?);
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct StatusCommand {
    /// Workflow id
    pub id: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl StatusCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let id = parse_id(&self.id)?;
        let provisioner = self.config.connect().await?;
        let record = provisioner.orchestrator().get_status(&id).await?;
        print_record(&record, false);
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct StepsCommand {
    /// Workflow id
    pub id: String,

    /// Print each step's log excerpt
    #[arg(long)]
    pub logs: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl StepsCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let id = parse_id(&self.id)?;
        let provisioner = self.config.connect().await?;
        let steps = provisioner.orchestrator().get_steps(&id).await?;
        let infos: Vec<StepInfo> = steps.iter().map(step_info).collect();
        println!("{}", TableRenderer::new().render_steps(&infos, self.logs));
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct ListCommand {
    /// Only show workflows in this status
    #[arg(long, short = 's')]
    pub status: Option<WorkflowStatus>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ListCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let provisioner = self.config.connect().await?;
        let records = provisioner.orchestrator().list(self.status).await?;
        let infos: Vec<WorkflowInfo> = records.iter().map(workflow_info).collect();
        println!("{}", TableRenderer::new().render_workflows_list(&infos));
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct AbortCommand {
    /// Workflow id
    pub id: String,

    /// Reason recorded on the workflow
    #[arg(long, default_value = "aborted by operator")]
    pub reason: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl AbortCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let id = parse_id(&self.id)?;
        let provisioner = self.config.connect().await?;
        let record = provisioner.orchestrator().abort(&id, &self.reason).await?;
        println!("Workflow {} aborted", record.id);
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct RetryCommand {
    /// Id of the failed or aborted workflow
    pub id: String,

    /// First step to run again (default: the first failed or skipped step)
    #[arg(long)]
    pub from_step: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl RetryCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let id = parse_id(&self.id)?;
        let provisioner = self.config.connect().await?;
        let new_id = provisioner
            .orchestrator()
            .retry(&id, self.from_step.as_deref())
            .await?;
        println!("Workflow {} started as a retry of {}", new_id, id);
        follow(&provisioner, new_id).await
    }
}

#[derive(Parser, Debug)]
pub struct PoolsCommand {}

impl PoolsCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        println!("{}", TableRenderer::new().render_pools(list_pool_types()));
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct LocationsCommand {}

impl LocationsCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        println!("{}", TableRenderer::new().render_locations(list_locations()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(properties: &[&str]) -> ConfigArgs {
        ConfigArgs {
            config: None,
            kubeconfig: None,
            context: Some("staging".to_string()),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_flags_override_properties() {
        let config = args(&["kubernetes.context=prod", "store.backend=memory"])
            .load()
            .unwrap();
        assert_eq!(config.kubernetes.context.as_deref(), Some("staging"));
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_bad_property_is_rejected() {
        assert!(args(&["no-equals-sign"]).load().is_err());
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("not-a-uuid").is_err());
        let id = WorkflowId::new();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
