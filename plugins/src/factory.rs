use std::sync::Arc;

use anyhow::{bail, Result};

use logtail_core::api::{DockerConfig, LogSource, ProcessInspector};

use crate::docker::{DockerInspector, DockerLogSource};

pub fn build_source(cfg: &DockerConfig) -> Result<Arc<dyn LogSource>> {
    let binary = docker_binary(cfg)?;
    Ok(Arc::new(DockerLogSource::new(binary)))
}

pub fn build_inspector(cfg: &DockerConfig) -> Result<Arc<dyn ProcessInspector>> {
    let binary = docker_binary(cfg)?;
    Ok(Arc::new(DockerInspector::new(binary)))
}

fn docker_binary(cfg: &DockerConfig) -> Result<&str> {
    let binary = cfg.binary.trim();
    if binary.is_empty() {
        bail!("docker.binary must not be empty");
    }
    Ok(binary)
}
