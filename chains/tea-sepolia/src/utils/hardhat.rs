//! Hardhat invoked as a subprocess for compilation and source verification.

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{Artifact, BuildTool, ToolError, VerifyOutcome};
use dialoguer::{theme::ColorfulTheme, Confirm};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const ARTIFACT_PATH: &str = "artifacts/contracts/CustomToken.sol/CustomToken.json";
pub const CONFIG_FILE: &str = "hardhat.config.cjs";
const PACKAGE_MARKER: &str = "node_modules/hardhat/package.json";

const VERIFIED_MARKERS: [&str; 3] = [
    "verification submitted",
    "has already been verified",
    "successfully verified contract",
];

/// Network parameters written into the generated Hardhat config.
#[derive(Debug, Clone)]
pub struct HardhatNetwork {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
}

#[derive(Debug, Clone)]
pub struct HardhatTool {
    project_dir: PathBuf,
    network: HardhatNetwork,
    interactive: bool,
}

impl HardhatTool {
    pub fn new(project_dir: impl Into<PathBuf>, network: HardhatNetwork) -> Self {
        Self {
            project_dir: project_dir.into(),
            network,
            interactive: true,
        }
    }

    /// Never prompts; a missing installation just skips verification.
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    pub fn is_installed(&self) -> bool {
        self.project_dir.join(PACKAGE_MARKER).exists()
    }

    pub fn write_config(&self) -> Result<()> {
        let path = self.project_dir.join(CONFIG_FILE);
        fs::write(&path, render_config(&self.network))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("📝 Hardhat config written for RPC: {}", self.network.rpc_url);
        Ok(())
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        if !self.interactive {
            return Ok(false);
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(true)
            .interact()
            .context("Prompt failed")
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ToolError> {
        let command = format!("{} {}", program, args.join(" "));
        debug!("Running `{}` in {}", command, self.project_dir.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.project_dir)
            .output()
            .await
            .map_err(|e| ToolError::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::CommandFailed {
                command,
                reason: format!("{} {}", stderr.trim(), stdout.trim()).trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

#[async_trait]
impl BuildTool for HardhatTool {
    async fn ensure_ready(&self) -> Result<bool> {
        if !self.is_installed() {
            if !self.confirm("🔧 Hardhat is not installed. Install now?")? {
                warn!("⚠️ Hardhat not installed. Automatic verification will not run.");
                return Ok(false);
            }

            info!("🔧 Installing Hardhat and verification plugin...");
            self.run(
                "npm",
                &["install", "--save-dev", "hardhat", "@nomicfoundation/hardhat-verify"],
            )
            .await
            .map_err(|e| ToolError::InstallFailed {
                tool: "hardhat".to_string(),
                reason: e.to_string(),
            })?;
            info!(target: "success", "🔧 Hardhat and verification plugin installed successfully.");
        }

        // Always regenerated so the network and RPC match this run.
        self.write_config()?;
        Ok(true)
    }

    async fn compile(&self) -> Result<Artifact> {
        info!("🛠️ Running Hardhat compilation...");
        self.run("npx", &["hardhat", "compile"]).await?;
        info!(target: "success", "🛠️ Hardhat compilation successful.");

        let path = self.project_dir.join(ARTIFACT_PATH);
        let raw = fs::read_to_string(&path).map_err(|_| ToolError::ArtifactMissing {
            path: path.display().to_string(),
        })?;
        Ok(parse_artifact(&raw, &path)?)
    }

    async fn verify(&self, address: &str, constructor_args: &[String]) -> Result<VerifyOutcome> {
        let mut args = vec!["hardhat", "verify", "--network", self.network.name.as_str(), address];
        args.extend(constructor_args.iter().map(String::as_str));

        let stdout = self.run("npx", &args).await?;
        if verification_confirmed(&stdout) {
            Ok(VerifyOutcome::Verified)
        } else {
            Ok(VerifyOutcome::NotConfirmed { output: stdout })
        }
    }
}

/// Extracts ABI and creation bytecode. Hardhat writes `bytecode` as a
/// string; other toolchains nest it under `bytecode.object`.
pub fn parse_artifact(raw: &str, path: &Path) -> Result<Artifact, ToolError> {
    let invalid = |reason: &str| ToolError::InvalidArtifact {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let json: Value = serde_json::from_str(raw).map_err(|e| invalid(&e.to_string()))?;
    let abi = json.get("abi").cloned().ok_or_else(|| invalid("missing abi"))?;

    let bytecode = match json.get("bytecode") {
        Some(Value::String(s)) => s.clone(),
        Some(obj) => obj
            .get("object")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| invalid("bytecode has no object field"))?,
        None => return Err(invalid("missing bytecode")),
    };

    if bytecode.trim_start_matches("0x").is_empty() {
        return Err(invalid("empty bytecode"));
    }

    Ok(Artifact { abi, bytecode })
}

pub fn verification_confirmed(stdout: &str) -> bool {
    let lower = stdout.to_lowercase();
    VERIFIED_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn render_config(network: &HardhatNetwork) -> String {
    let explorer = network.explorer_url.trim_end_matches('/');
    format!(
        r#"require("@nomicfoundation/hardhat-verify");

module.exports = {{
  solidity: "0.8.28",
  networks: {{
    "{name}": {{
      url: "{rpc}",
      chainId: {chain_id},
      accounts: [process.env.MAIN_PRIVATE_KEY]
    }}
  }},
  etherscan: {{
    apiKey: {{
      "{name}": process.env.EXPLORER_API_KEY || "empty"
    }},
    customChains: [
      {{
        network: "{name}",
        chainId: {chain_id},
        urls: {{
          apiURL: "{explorer}/api",
          browserURL: "{explorer}/"
        }}
      }}
    ]
  }},
  sourcify: {{
    enabled: false
  }}
}};
"#,
        name = network.name,
        rpc = network.rpc_url,
        chain_id = network.chain_id,
        explorer = explorer,
    )
}
