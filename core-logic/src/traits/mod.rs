use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Outcome counts of one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub attempted: u64,
    pub confirmed: u64,
}

impl BatchStats {
    pub fn failed(&self) -> u64 {
        self.attempted - self.confirmed
    }
}

/// Compiled contract as produced by the external build tool.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub abi: Value,
    /// Hex-encoded creation bytecode, with or without `0x`.
    pub bytecode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The tool ran but its output did not confirm verification.
    NotConfirmed { output: String },
}

/// External compiler/verifier invoked as a subprocess.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Makes sure the tool is installed and configured. `Ok(false)` means
    /// the operator declined and verification should be skipped.
    async fn ensure_ready(&self) -> Result<bool> {
        Ok(true)
    }

    /// Compiles the project and returns the token contract artifact.
    async fn compile(&self) -> Result<Artifact>;

    /// Submits source verification for a deployed contract.
    async fn verify(&self, address: &str, constructor_args: &[String]) -> Result<VerifyOutcome>;
}
