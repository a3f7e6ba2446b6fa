//! Interactive operator menu.

use crate::client::{AccountContext, ChainClient};
use crate::config::TeaConfig;
use crate::contracts::{read_decimals, read_symbol};
use crate::deploy::{Deployer, TokenParams};
use crate::health::HealthGate;
use crate::spammer::{generate_recipients, BatchRunner, PayloadPlan};
use crate::submitter::Submitter;
use crate::utils::{load_recipients, HardhatNetwork, HardhatTool};
use anyhow::{bail, Context, Result};
use colored::*;
use core_logic::{
    BatchStats, DelayWindow, GeneratedWalletStore, QuotaLedger, ShutdownGuard, ToolError,
    DAILY_TX_LIMIT,
};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use ethers::types::{Address, U256};
use ethers::utils::{format_ether, parse_ether, parse_units, to_checksum};
use tracing::{debug, error, info, warn};

/// Typed at any prompt to return to the menu.
pub const BACK: &str = "back";

const MENU_ITEMS: [&str; 5] = [
    "Deploy token contract",
    "Send native TEA to address list",
    "Send tokens to address list",
    "Send native TEA to new wallets",
    "Exit",
];

pub fn is_back(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(BACK)
}

fn prompt(label: &str) -> Result<Option<String>> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} (or '{}')", label, BACK))
        .interact_text()
        .context("Prompt failed")?;
    Ok((!is_back(&input)).then(|| input.trim().to_string()))
}

fn prompt_default(label: &str, default: &str) -> Result<Option<String>> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} (or '{}')", label, BACK))
        .default(default.to_string())
        .interact_text()
        .context("Prompt failed")?;
    Ok((!is_back(&input)).then(|| input.trim().to_string()))
}

/// Empty input means "use the default" and yields `Some(None)`.
fn prompt_optional(label: &str) -> Result<Option<Option<String>>> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} (Enter to skip, or '{}')", label, BACK))
        .allow_empty(true)
        .interact_text()
        .context("Prompt failed")?;
    if is_back(&input) {
        return Ok(None);
    }
    let trimmed = input.trim();
    Ok(Some((!trimmed.is_empty()).then(|| trimmed.to_string())))
}

fn wait_for_enter() {
    if let Err(e) = Input::<String>::new()
        .with_prompt("Press Enter to return to the menu")
        .allow_empty(true)
        .interact_text()
    {
        debug!("Enter prompt failed: {}", e);
    }
}

/// The entered symbol must match the contract's exactly.
pub fn symbol_matches(entered: &str, on_chain: &str) -> bool {
    entered == on_chain
}

pub fn print_banner(config: &TeaConfig, address: Address) {
    let line = "=".repeat(60);
    println!("{}", line.bright_green());
    println!("{}", "   TEA SEPOLIA TOKEN DEPLOYER & SENDER".bright_green().bold());
    println!("{}", line.bright_green());
    println!("{} {}", "Network :".cyan(), config.network_name);
    println!("{} {}", "Chain ID:".cyan(), config.chain_id);
    println!("{} {}", "Wallet  :".cyan(), to_checksum(&address, None));
    println!("{}", line.bright_green());
}

fn print_stats(stats: &BatchStats) {
    println!(
        "{} {} confirmed, {} failed, {} attempted",
        "Batch:".bold(),
        stats.confirmed.to_string().green(),
        stats.failed().to_string().red(),
        stats.attempted
    );
}

pub struct App {
    config: TeaConfig,
    client: AccountContext,
    ledger: QuotaLedger,
    wallets: GeneratedWalletStore,
    submitter: Submitter,
    gate: HealthGate,
    tool: HardhatTool,
    contract: Option<Address>,
}

impl App {
    pub fn new(config: TeaConfig) -> Result<Self> {
        let wallet = config.wallet()?;
        let chain = config.chain_config()?;
        let contract = config.contract_address()?;

        let rpc_url = chain.rpc_endpoints.first().cloned().unwrap_or_default();
        let client = AccountContext::new(chain, wallet, config.selector.clone())?;
        let ledger = QuotaLedger::open(&config.state_dir, DAILY_TX_LIMIT);
        let wallets = GeneratedWalletStore::open(&config.state_dir)?;
        let submitter = Submitter::new(config.submit.clone(), config.gas_config());
        let gate = HealthGate::new(config.health.clone())?;
        let tool = HardhatTool::new(
            &config.hardhat_dir,
            HardhatNetwork {
                name: config.network_name.clone(),
                rpc_url,
                chain_id: config.chain_id,
                explorer_url: config.explorer_url.clone(),
            },
        );

        Ok(Self {
            config,
            client,
            ledger,
            wallets,
            submitter,
            gate,
            tool,
            contract,
        })
    }

    /// Menu loop. Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        loop {
            print_banner(&self.config, self.client.address());
            info!(
                "📊 Daily quota: {} sent, {} remaining",
                self.ledger.sent_today(),
                self.ledger.remaining_quota()
            );

            let choice = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Select an option")
                .default(0)
                .items(&MENU_ITEMS)
                .interact()
                .context("Menu selection failed")?;

            let outcome = match choice {
                0 => self.deploy().await,
                1 => self.send_native().await,
                2 => self.send_token().await,
                3 => self.send_generated().await,
                _ => {
                    info!("👋 Exiting...");
                    return Ok(0);
                }
            };

            if let Err(e) = outcome {
                if let Some(ToolError::InstallFailed { tool, reason }) =
                    e.downcast_ref::<ToolError>()
                {
                    error!("❌ Failed to install {}: {}", tool, reason);
                    return Ok(1);
                }
                error!("❌ {:#}", e);
            }

            wait_for_enter();
        }
    }

    async fn deploy(&mut self) -> Result<()> {
        let Some(name) = prompt("Token name")? else {
            return Ok(());
        };
        let Some(symbol) = prompt("Token symbol")? else {
            return Ok(());
        };
        let Some(decimals) = prompt_default("Decimals", "18")? else {
            return Ok(());
        };
        let Some(total_supply) = prompt("Total supply")? else {
            return Ok(());
        };

        let params = TokenParams {
            name,
            symbol,
            decimals: decimals
                .parse()
                .with_context(|| format!("Invalid decimals '{}'", decimals))?,
            total_supply,
        };

        let deploy = &self.config.deploy;
        let report = Deployer::new(&self.client, &self.submitter, &self.tool)
            .with_env_file(&self.config.env_file)
            .with_verify_retry(deploy.verify_attempts, deploy.verify_delay_ms)
            .deploy(&params)
            .await?;

        println!("\n{}", report.to_string().bright_white());
        self.contract = Some(report.address);
        Ok(())
    }

    /// Optional delay override; `None` when the operator typed back.
    fn prompt_delay(&self) -> Result<Option<DelayWindow>> {
        let batch = &self.config.batch;
        let Some(raw) = prompt_optional(&format!(
            "Delay range in seconds as min-max (default {}-{})",
            batch.min_delay_secs, batch.max_delay_secs
        ))?
        else {
            return Ok(None);
        };

        let window = match raw {
            None => DelayWindow::new(batch.min_delay_secs, batch.max_delay_secs),
            Some(text) => {
                let (min, max) = text
                    .split_once('-')
                    .with_context(|| format!("Expected min-max, got '{}'", text))?;
                DelayWindow::new(
                    min.trim().parse().context("Invalid minimum delay")?,
                    max.trim().parse().context("Invalid maximum delay")?,
                )
            }
        };
        Ok(Some(window))
    }

    fn recipients(&self) -> Result<Vec<Address>> {
        let recipients = load_recipients(&self.config.recipients_file)?;
        if recipients.is_empty() {
            bail!(
                "No recipient addresses found in {}",
                self.config.recipients_file.display()
            );
        }
        info!("📂 Loaded {} recipient addresses", recipients.len());
        Ok(recipients)
    }

    async fn send_native(&mut self) -> Result<()> {
        let batch = &self.config.batch;
        let Some(fixed) = prompt_optional(&format!(
            "Amount of TEA per transaction (default random {}-{})",
            batch.min_native_amount, batch.max_native_amount
        ))?
        else {
            return Ok(());
        };

        let plan = match fixed {
            Some(amount) => PayloadPlan::NativeFixed(
                parse_ether(&amount).with_context(|| format!("Invalid amount '{}'", amount))?,
            ),
            None => PayloadPlan::NativeRandom {
                min: batch.min_native_amount,
                max: batch.max_native_amount,
            },
        };

        let Some(delay) = self.prompt_delay()? else {
            return Ok(());
        };
        let recipients = self.recipients()?;
        self.run_batch(&recipients, &plan, delay).await
    }

    async fn send_token(&mut self) -> Result<()> {
        let Some(token) = self.contract else {
            bail!("No token contract configured. Deploy one first or set CONTRACT_ADDRESS.");
        };

        let on_chain_symbol = read_symbol(&self.client, token).await?;
        let Some(symbol) = prompt(&format!("Token symbol to send ({})", on_chain_symbol))? else {
            return Ok(());
        };
        if !symbol_matches(&symbol, &on_chain_symbol) {
            bail!(
                "Symbol '{}' does not match contract symbol '{}'",
                symbol,
                on_chain_symbol
            );
        }

        let decimals = read_decimals(&self.client, token).await?;
        let Some(raw_amount) = prompt("Amount of tokens per transaction")? else {
            return Ok(());
        };
        let amount: U256 = parse_units(&raw_amount, u32::from(decimals))
            .with_context(|| format!("Invalid amount '{}'", raw_amount))?
            .into();
        if amount.is_zero() {
            bail!("Amount must be positive");
        }

        let Some(delay) = self.prompt_delay()? else {
            return Ok(());
        };
        let recipients = self.recipients()?;
        self.run_batch(&recipients, &PayloadPlan::Token { token, amount }, delay)
            .await
    }

    async fn send_generated(&mut self) -> Result<()> {
        let Some(raw) = prompt("Number of new wallets")? else {
            return Ok(());
        };
        let count: usize = raw
            .parse()
            .with_context(|| format!("Invalid wallet count '{}'", raw))?;
        if count == 0 {
            warn!("Nothing to do for 0 wallets");
            return Ok(());
        }

        let remaining = self.ledger.remaining_quota();
        let count = count.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if count == 0 {
            error!(
                "Daily limit of {} transactions reached. Please try again tomorrow.",
                self.ledger.limit()
            );
            return Ok(());
        }

        let Some(delay) = self.prompt_delay()? else {
            return Ok(());
        };
        let recipients = generate_recipients(&mut self.wallets, count)?;
        let batch = &self.config.batch;
        let plan = PayloadPlan::NativeRandom {
            min: batch.min_native_amount,
            max: batch.max_native_amount,
        };
        self.run_batch(&recipients, &plan, delay).await
    }

    async fn run_batch(
        &mut self,
        recipients: &[Address],
        plan: &PayloadPlan,
        delay: DelayWindow,
    ) -> Result<()> {
        let balance = self.client.balance(self.client.address()).await?;
        info!("💰 Wallet balance: {} TEA", format_ether(balance));

        let shutdown = ShutdownGuard::install();
        let stats = BatchRunner::new(
            &self.client,
            &mut self.ledger,
            &self.submitter,
            &self.gate,
            shutdown.token(),
        )
        .with_delay(delay)
        .with_native_via(self.contract)
        .run_batch(recipients, plan)
        .await?;

        print_stats(&stats);
        Ok(())
    }
}
