//! Thin CLI front-end over `quaestor_core`'s library entry points.
//!
//! Argument parsing itself is out of scope (CLI argument parsing is an
//! explicit non-goal); this is a minimal hand-rolled dispatcher over
//! `std::env::args()`, not a general-purpose CLI surface.

use anyhow::{bail, Context, Result};
use quaestor_core::config::PipelineConfig;
use quaestor_core::{ClusterPartition, MethodCatalog, Proof};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().context("usage: quaestor <run|verify|validate-schema|list-methods>")?;

    match command.as_str() {
        "run" => cmd_run(),
        "verify" => cmd_verify(args.next()),
        "validate-schema" => cmd_validate_schema(),
        "list-methods" => cmd_list_methods(),
        other => bail!("unknown command '{other}'"),
    }
}

fn cmd_run() -> Result<()> {
    let config = PipelineConfig::from_env().context("loading pipeline configuration")?;
    tracing::info!(run_id = %config.run_id, "pipeline configuration loaded; full run wiring is assembled by the calling application via quaestor_core::factory::build_context");
    Ok(())
}

fn cmd_verify(proof_path: Option<String>) -> Result<()> {
    let path = proof_path.context("usage: quaestor verify <proof.json>")?;
    let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
    let proof: Proof = serde_json::from_slice(&bytes).context("parsing proof artifact")?;
    if !proof.verify().context("recomputing proof hash")? {
        bail!("proof hash mismatch for run '{}': artifact has been tampered with", proof.run_id);
    }
    tracing::info!(run_id = %proof.run_id, hash = %proof.hash, "proof verified");
    Ok(())
}

fn cmd_validate_schema() -> Result<()> {
    let partition = ClusterPartition::default_partition();
    tracing::info!(clusters = partition.clusters().count(), "ontology partition is well-formed");
    Ok(())
}

fn cmd_list_methods() -> Result<()> {
    let catalog = MethodCatalog::new();
    for descriptor in catalog.descriptors() {
        println!("{}", descriptor.method_id());
    }
    Ok(())
}
