//! Token deployment: compile, create, persist the address, verify.

use crate::client::ChainClient;
use crate::submitter::{created_address, receipt_hash, Payload, Submitter};
use crate::utils::env_file::update_env_var;
use anyhow::{anyhow, bail, Context, Result};
use core_logic::{with_retry, Artifact, BuildTool, RetryConfig, ToolError, VerifyOutcome};
use ethers::abi::{Abi, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::{hex, parse_units, to_checksum};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Constructor parameters entered by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Human units, e.g. `"100000"`.
    pub total_supply: String,
}

impl TokenParams {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Token name must not be empty");
        }
        if self.symbol.trim().is_empty() {
            bail!("Token symbol must not be empty");
        }
        if self.supply_units()?.is_zero() {
            bail!("Total supply must be positive");
        }
        Ok(())
    }

    /// Total supply scaled by `decimals`.
    pub fn supply_units(&self) -> Result<U256> {
        let parsed = parse_units(self.total_supply.trim(), u32::from(self.decimals))
            .with_context(|| format!("Invalid total supply '{}'", self.total_supply))?;
        Ok(parsed.into())
    }

    fn constructor_tokens(&self, supply: U256) -> Vec<Token> {
        vec![
            Token::String(self.name.clone()),
            Token::String(self.symbol.clone()),
            Token::Uint(U256::from(self.decimals)),
            Token::Uint(supply),
        ]
    }

    /// Constructor arguments as the verifier expects them on its command line.
    pub fn verify_args(&self, supply: U256) -> Vec<String> {
        vec![
            self.name.clone(),
            self.symbol.clone(),
            self.decimals.to_string(),
            supply.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    CollectParameters,
    Compile,
    SubmitCreation,
    AwaitConfirmation,
    PersistAddress,
    Verify,
    Done,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployStage::CollectParameters => "collect parameters",
            DeployStage::Compile => "compile",
            DeployStage::SubmitCreation => "submit creation",
            DeployStage::AwaitConfirmation => "await confirmation",
            DeployStage::PersistAddress => "persist address",
            DeployStage::Verify => "verify",
            DeployStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub params: TokenParams,
    pub supply_units: U256,
    pub address: Address,
    pub tx_hash: String,
    pub verified: bool,
}

impl fmt::Display for DeployReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📋 Contract Details:")?;
        writeln!(f, "- Name: {}", self.params.name)?;
        writeln!(f, "- Symbol: {}", self.params.symbol)?;
        writeln!(f, "- Decimals: {}", self.params.decimals)?;
        writeln!(
            f,
            "- Total Supply: {} (equivalent to {} smallest units)",
            self.params.total_supply, self.supply_units
        )?;
        writeln!(f, "- Address: {}", to_checksum(&self.address, None))?;
        write!(
            f,
            "- Verification Status: {}",
            if self.verified { "Verified" } else { "Not Verified" }
        )
    }
}

pub struct Deployer<'a, C: ChainClient + ?Sized, B: BuildTool + ?Sized> {
    client: &'a C,
    submitter: &'a Submitter,
    tool: &'a B,
    env_file: Option<PathBuf>,
    verify_retry: (u32, u64),
}

impl<'a, C: ChainClient + ?Sized, B: BuildTool + ?Sized> Deployer<'a, C, B> {
    pub fn new(client: &'a C, submitter: &'a Submitter, tool: &'a B) -> Self {
        Self {
            client,
            submitter,
            tool,
            env_file: None,
            verify_retry: (3, 5_000),
        }
    }

    /// Write `CONTRACT_ADDRESS` into this dotenv file after deployment.
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_verify_retry(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.verify_retry = (attempts.max(1), delay_ms);
        self
    }

    /// Runs the flow to completion. Anything before confirmation aborts;
    /// a failed verification only marks the report unverified.
    pub async fn deploy(&self, params: &TokenParams) -> Result<DeployReport> {
        let mut stage = DeployStage::CollectParameters;
        params.validate()?;
        let supply = params.supply_units()?;

        stage = self.advance(stage, DeployStage::Compile);
        info!("🚀 Preparing to deploy contract...");
        let artifact = self.tool.compile().await.context("Compilation failed")?;
        let bytecode = creation_code(&artifact, params.constructor_tokens(supply))?;

        stage = self.advance(stage, DeployStage::SubmitCreation);
        info!("🚀 Sending deploy transaction...");
        let receipt = self
            .submitter
            .submit(self.client, &Payload::Create { bytecode }, None)
            .await
            .context("Deployment transaction failed")?;

        stage = self.advance(stage, DeployStage::AwaitConfirmation);
        let address = created_address(&receipt)?;
        let address_str = to_checksum(&address, None);
        info!(target: "success", "🚀 Contract deployed at address: {}", address_str);

        stage = self.advance(stage, DeployStage::PersistAddress);
        if let Some(path) = &self.env_file {
            if let Err(e) = update_env_var(path, "CONTRACT_ADDRESS", &address_str) {
                warn!("Could not save CONTRACT_ADDRESS: {:#}", e);
            }
        }

        stage = self.advance(stage, DeployStage::Verify);
        let verified = self.verify(&address_str, &params.verify_args(supply)).await?;

        self.advance(stage, DeployStage::Done);
        Ok(DeployReport {
            params: params.clone(),
            supply_units: supply,
            address,
            tx_hash: receipt_hash(&receipt),
            verified,
        })
    }

    fn advance(&self, from: DeployStage, to: DeployStage) -> DeployStage {
        debug!("Deploy stage: {} -> {}", from, to);
        to
    }

    /// Best effort. Only a failed tool installation is propagated.
    async fn verify(&self, address: &str, args: &[String]) -> Result<bool> {
        info!("🔍 Automatically verifying contract...");

        match self.tool.ensure_ready().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("🔍 Contract not auto-verified. Please verify manually if necessary.");
                return Ok(false);
            }
            Err(e)
                if matches!(
                    e.downcast_ref::<ToolError>(),
                    Some(ToolError::InstallFailed { .. })
                ) =>
            {
                return Err(e);
            }
            Err(e) => {
                warn!("🔍 Verification tool unavailable: {:#}", e);
                return Ok(false);
            }
        }

        let (attempts, delay_ms) = self.verify_retry;
        let result = with_retry(
            RetryConfig::fixed(attempts - 1, delay_ms),
            "Contract verification",
            move || async move {
                match self.tool.verify(address, args).await? {
                    VerifyOutcome::Verified => Ok(()),
                    VerifyOutcome::NotConfirmed { output } => {
                        warn!("🔍 Verification output: {}", output.trim());
                        Err(anyhow!("verifier did not confirm"))
                    }
                }
            },
        )
        .await;

        match result {
            Ok(()) => {
                info!(target: "success", "🔍 Contract verified successfully.");
                Ok(true)
            }
            Err(e) => {
                warn!("🔍 {:#}", e);
                warn!("🔍 Contract not auto-verified. Please verify manually if necessary.");
                Ok(false)
            }
        }
    }
}

/// Creation bytecode followed by the ABI-encoded constructor arguments.
pub fn creation_code(artifact: &Artifact, args: Vec<Token>) -> Result<Bytes> {
    let abi: Abi =
        serde_json::from_value(artifact.abi.clone()).context("Artifact ABI is not valid")?;
    let code = hex::decode(artifact.bytecode.trim().trim_start_matches("0x"))
        .context("Artifact bytecode is not valid hex")?;

    let data = match abi.constructor() {
        Some(ctor) => ctor
            .encode_input(code, &args)
            .context("Constructor arguments do not match the ABI")?,
        None if args.is_empty() => code,
        None => bail!("Artifact has no constructor but arguments were given"),
    };
    Ok(data.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TokenParams {
        TokenParams {
            name: "Tea Token".to_string(),
            symbol: "TEA".to_string(),
            decimals: 6,
            total_supply: "1000".to_string(),
        }
    }

    #[test]
    fn test_supply_is_scaled_by_decimals() {
        assert_eq!(params().supply_units().unwrap(), U256::from(1_000_000_000u64));
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.total_supply = "0".to_string();
        assert!(p.validate().is_err());

        let mut p = params();
        p.symbol = " ".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_verify_args_order() {
        let p = params();
        assert_eq!(
            p.verify_args(U256::from(5u64)),
            vec!["Tea Token", "TEA", "6", "5"]
        );
    }
}
