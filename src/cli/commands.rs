// CLI command definitions

use super::provision::{
    AbortCommand, ListCommand, LocationsCommand, PoolsCommand, ProvisionCommand, RenderCommand,
    RetryCommand, StatusCommand, StepsCommand,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "kube-provisioner",
    version,
    about = "Self-service provisioning of Kubernetes namespaces and managed clusters",
    long_about = "Validates provisioning requests, renders their manifests and runs them as tracked workflows on Argo Workflows"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Validate a request and start a provisioning workflow
    Provision(ProvisionCommand),

    /// Validate a request and print the manifests it would apply
    Render(RenderCommand),

    /// Show the status of a workflow
    Status(StatusCommand),

    /// Show the steps of a workflow with their logs
    Steps(StepsCommand),

    /// List workflows
    List(ListCommand),

    /// Abort a pending or running workflow
    Abort(AbortCommand),

    /// Start a new workflow from a failed or aborted one
    Retry(RetryCommand),

    /// List the node pool types clusters can use
    Pools(PoolsCommand),

    /// List the locations clusters can be placed in
    Locations(LocationsCommand),
}
