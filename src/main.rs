//! SmartPool client - command line entry point
//!
//! The pool itself is assembled by an embedding binary that supplies the
//! node, contract and Ethash backends. This binary carries the offline
//! tools: configuration inspection and dataset tree roots and proofs.

use smartpool_client::mtree::{build_dataset_tree, DatasetSummary};
use smartpool_client::utils::{format_bytes, init_logging};
use smartpool_client::{Config, Error, Result, APP_DESCRIPTION, APP_NAME, APP_VERSION};
use std::path::PathBuf;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().await?;
    init_logging(config.log_level, config.log_format)?;

    if config.info {
        print_info();
        return Ok(());
    }

    if config.print_config {
        print_configuration(&config)?;
        return Ok(());
    }

    if let Some(path) = config.dataset_root.clone() {
        return print_dataset_root(path).await;
    }

    if let Some(path) = config.dataset_proof.clone() {
        return print_dataset_proof(path, config.index.clone()).await;
    }

    Err(Error::config(
        "no chain backend is linked into this binary; use --dataset-root, --dataset-proof or --print-config",
    ))
}

fn print_info() {
    println!("{} v{}", APP_NAME, APP_VERSION);
    println!("{}", APP_DESCRIPTION);
}

fn print_configuration(config: &Config) -> Result<()> {
    let config_yaml = serde_yaml::to_string(config)?;
    println!("{}", config_yaml);
    Ok(())
}

async fn print_dataset_root(path: PathBuf) -> Result<()> {
    let summary = tokio::task::spawn_blocking(move || {
        build_dataset_tree(&path, &[]).map(|tree| DatasetSummary::from_tree(&tree))
    })
    .await
    .map_err(|e| Error::invalid_state(format!("dataset task failed: {}", e)))??;

    println!("root:          {}", summary.root);
    println!("elements:      {}", summary.element_count);
    println!("size:          {}", format_bytes(summary.element_count * 128));
    println!("branch depth:  {}", summary.branch_depth);
    Ok(())
}

async fn print_dataset_proof(path: PathBuf, indices: Vec<u32>) -> Result<()> {
    debug!("Proving {} dataset indices", indices.len());
    let tree = tokio::task::spawn_blocking(move || build_dataset_tree(&path, &indices))
        .await
        .map_err(|e| Error::invalid_state(format!("dataset task failed: {}", e)))??;

    println!("root: {}", tree.root_hash());
    for (index, word) in tree.registered().iter().zip(tree.dag_elements()?) {
        let quarters: Vec<String> = word
            .to_uint256_array()
            .iter()
            .map(|q| format!("0x{:064x}", q))
            .collect();
        println!("element {}: {}", index, quarters.join(" "));
    }
    for element in tree.branch_elements()? {
        println!("branch: 0x{}", hex::encode(element.0));
    }
    Ok(())
}
