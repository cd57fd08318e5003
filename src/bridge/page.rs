//! The page realm: the only context holding the wallet provider. A
//! [`PageScript`] injected here listens on the window bus, checks the
//! wallet, re-quotes, builds the swap and hands it to the wallet for
//! signing.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::protocol::{RequestId, SwapOrder, SwapPhase, SwapReceipt, WindowBus, WindowMessage};
use crate::error::WalletError;
use crate::pricing::{JsonRpc, PricingError, PricingHelper, RpcError, SwapTransactionRequest};

pub const SEPOLIA_CHAIN_ID: &str = "0xaa36a7";
const SEPOLIA_NAME: &str = "Sepolia testnet";
/// EIP-1193 "user rejected request"
const USER_REJECTED: i64 = 4001;

/// An EIP-1193 style provider as the page sees it
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

/// Wallet reached over JSON-RPC, e.g. a local signer node
pub struct JsonRpcWallet {
    rpc: Arc<dyn JsonRpc>,
}

impl JsonRpcWallet {
    pub fn new(rpc: Arc<dyn JsonRpc>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.rpc.call(method, params).await.map_err(|e| match e {
            RpcError::Transport(cause) => {
                debug!("[Wallet] Provider unreachable: {}", cause);
                WalletError::NotDetected
            }
            RpcError::Node { code: USER_REJECTED, .. } => {
                WalletError::TransactionFailed("User rejected the request".to_string())
            }
            RpcError::Node { message, .. } => WalletError::TransactionFailed(message),
            RpcError::MissingResult(method) => WalletError::TransactionFailed(format!("{method} returned nothing")),
        })
    }
}

async fn first_account(provider: &dyn WalletProvider) -> Result<Address, WalletError> {
    let accounts = provider.request("eth_requestAccounts", json!([])).await?;
    accounts
        .as_array()
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .and_then(|raw| Address::from_str(raw).ok())
        .ok_or(WalletError::NoAccount)
}

/// Connected account, provided the wallet is on Sepolia
pub async fn check_wallet(provider: &dyn WalletProvider) -> Result<Address, WalletError> {
    let account = first_account(provider).await?;

    let chain = provider.request("eth_chainId", json!([])).await?;
    let chain = chain.as_str().unwrap_or_default().to_ascii_lowercase();
    if chain != SEPOLIA_CHAIN_ID {
        return Err(WalletError::WrongChain { expected: SEPOLIA_NAME.to_string(), actual: chain });
    }

    Ok(account)
}

/// Submits `tx` after confirming the wallet still exposes `expected`
pub async fn send_transaction(
    provider: &dyn WalletProvider,
    expected: Address,
    tx: &SwapTransactionRequest,
) -> Result<String, WalletError> {
    let current = first_account(provider).await?;
    if current != expected {
        return Err(WalletError::TransactionFailed("Wallet address mismatch".to_string()));
    }

    let hash = provider.request("eth_sendTransaction", json!([tx.to_rpc_params()])).await?;
    hash.as_str()
        .map(str::to_string)
        .ok_or_else(|| WalletError::TransactionFailed("wallet returned no transaction hash".to_string()))
}

fn pricing_failure(error: PricingError) -> WalletError {
    WalletError::TransactionFailed(error.to_string())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InjectError {
    #[error("page script already injected")]
    AlreadyInjected,

    #[error("page refused script injection: {0}")]
    Blocked(String),
}

/// Ability to run the page script inside a realm
pub trait ScriptInjector: Send + Sync {
    fn inject(&self) -> Result<(), InjectError>;

    fn bus(&self) -> &WindowBus;
}

#[derive(Clone)]
struct PageScript {
    bus: WindowBus,
    wallet: Option<Arc<dyn WalletProvider>>,
    pricing: Arc<dyn PricingHelper>,
}

impl PageScript {
    async fn run(self, mut inbox: broadcast::Receiver<WindowMessage>) {
        self.bus.post(WindowMessage::Ready { request_id: None });
        info!("[Page] Script ready");

        loop {
            match inbox.recv().await {
                Ok(WindowMessage::Ping { request_id }) => {
                    self.bus.post(WindowMessage::Ready { request_id: Some(request_id) });
                }
                Ok(WindowMessage::ExecuteSwap { request_id, payload }) => {
                    let script = self.clone();
                    tokio::spawn(async move { script.answer_swap(request_id, payload).await });
                }
                Ok(WindowMessage::CheckWallet { request_id }) => {
                    let script = self.clone();
                    tokio::spawn(async move { script.answer_wallet(request_id).await });
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("[Page] Missed {} window messages", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn provider(&self) -> Result<&dyn WalletProvider, WalletError> {
        self.wallet.as_deref().ok_or(WalletError::NotDetected)
    }

    async fn answer_wallet(&self, request_id: RequestId) {
        let reply = match self.provider() {
            Ok(provider) => check_wallet(provider).await,
            Err(e) => Err(e),
        };
        self.bus.post(match reply {
            Ok(account) => WindowMessage::WalletInfo { request_id, wallet_address: account.to_string() },
            Err(e) => WindowMessage::WalletError { request_id, error: e.to_string(), wallet: Some(e) },
        });
    }

    async fn answer_swap(&self, request_id: RequestId, order: SwapOrder) {
        let message = match self.execute_swap(order).await {
            Ok(result) => WindowMessage::SwapResult { request_id, result },
            Err(e) => {
                error!("[Page] Swap failed: {}", e);
                WindowMessage::SwapError { request_id, error: e.to_string(), wallet: Some(e) }
            }
        };
        self.bus.post(message);
    }

    async fn execute_swap(&self, order: SwapOrder) -> Result<SwapReceipt, WalletError> {
        let provider = self.provider()?;
        let account = check_wallet(provider).await?;
        info!("[Page] Swapping {} {} → {} for {}", order.amount, order.from_token, order.to_token, account);

        let mut phases = vec![SwapPhase::QuoteRequested];
        let quote = self
            .pricing
            .quote_or_estimate(&order.from_token, &order.to_token, &order.amount)
            .await;
        phases.push(SwapPhase::QuoteReceived);

        let swap_tx = self
            .pricing
            .build_swap_transaction(account, &quote)
            .map_err(pricing_failure)?;
        phases.push(SwapPhase::TxBuilt);

        let approval_tx_hash = match self
            .pricing
            .approval_transaction(account, &order.from_token, &order.amount)
            .await
            .map_err(pricing_failure)?
        {
            Some(approval) => {
                info!("[Page] Sending approval for {}", order.from_token);
                Some(send_transaction(provider, account, &approval).await?)
            }
            None => None,
        };

        let tx_hash = send_transaction(provider, account, &swap_tx).await?;
        phases.push(SwapPhase::TxSubmitted);
        info!("[Page] Transaction sent: {}", tx_hash);

        Ok(SwapReceipt {
            tx_hash,
            wallet_address: account.to_string(),
            quote,
            approval_tx_hash,
            phases,
        })
    }
}

/// A browsed page: its window bus, its wallet (if any) and at most one
/// live page script
pub struct PageRealm {
    bus: WindowBus,
    wallet: Option<Arc<dyn WalletProvider>>,
    pricing: Arc<dyn PricingHelper>,
    script: Mutex<Option<JoinHandle<()>>>,
}

impl PageRealm {
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>, pricing: Arc<dyn PricingHelper>) -> Self {
        Self { bus: WindowBus::new(), wallet, pricing, script: Mutex::new(None) }
    }

    pub fn has_script(&self) -> bool {
        self.script.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Navigation: the page script is gone, the bus stays
    pub fn reload(&self) {
        if let Some(handle) = self.script.lock().take() {
            handle.abort();
        }
    }
}

impl ScriptInjector for PageRealm {
    fn inject(&self) -> Result<(), InjectError> {
        let mut slot = self.script.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(InjectError::AlreadyInjected);
        }

        let script = PageScript { bus: self.bus.clone(), wallet: self.wallet.clone(), pricing: self.pricing.clone() };
        // subscribe before spawning so nothing posted after inject() is missed
        let inbox = self.bus.subscribe();
        *slot = Some(tokio::spawn(script.run(inbox)));
        Ok(())
    }

    fn bus(&self) -> &WindowBus {
        &self.bus
    }
}

impl Drop for PageRealm {
    fn drop(&mut self) {
        self.reload();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy_primitives::Bytes;

    use super::*;
    use crate::pricing::{QuoteBasis, SwapQuote};

    pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

    /// Wallet that approves everything on a configurable chain
    pub struct FakeWallet {
        pub chain: &'static str,
        pub accounts: Vec<&'static str>,
        pub reject_send: bool,
        pub sends: AtomicUsize,
    }

    impl FakeWallet {
        pub fn sepolia() -> Arc<Self> {
            Arc::new(Self { chain: SEPOLIA_CHAIN_ID, accounts: vec![ACCOUNT], reject_send: false, sends: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl WalletProvider for FakeWallet {
        async fn request(&self, method: &str, _params: Value) -> Result<Value, WalletError> {
            match method {
                "eth_requestAccounts" => Ok(json!(self.accounts)),
                "eth_chainId" => Ok(json!(self.chain)),
                "eth_sendTransaction" if self.reject_send => {
                    Err(WalletError::TransactionFailed("User rejected the request".into()))
                }
                "eth_sendTransaction" => {
                    let n = self.sends.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(format!("0x{:064x}", n + 1)))
                }
                other => Err(WalletError::TransactionFailed(format!("unexpected {other}"))),
            }
        }
    }

    /// Pricing that either always quotes or always fails
    pub struct FixedPricing {
        pub live: bool,
    }

    #[async_trait]
    impl PricingHelper for FixedPricing {
        async fn quote(&self, from: &str, to: &str, amount: &str) -> Result<SwapQuote, PricingError> {
            if !self.live {
                return Err(PricingError::Rpc("node offline".into()));
            }
            let mut quote = SwapQuote::estimated(from, to, amount, "");
            quote.expected_output = "200.0".into();
            quote.min_received = "199.0".into();
            quote.path_encoding = Bytes::from(vec![0u8; 43]);
            quote.is_real = true;
            quote.basis = QuoteBasis::Real;
            Ok(quote)
        }

        async fn estimate_gas_cost(&self) -> String {
            "0.0002".into()
        }

        async fn approval_transaction(
            &self,
            _wallet: Address,
            _token: &str,
            _amount: &str,
        ) -> Result<Option<SwapTransactionRequest>, PricingError> {
            Ok(None)
        }

        fn build_swap_transaction(&self, wallet: Address, quote: &SwapQuote) -> Result<SwapTransactionRequest, PricingError> {
            if !quote.is_real() {
                return Err(PricingError::EstimatedQuote("offline".into()));
            }
            Ok(SwapTransactionRequest {
                to: Address::ZERO,
                from: wallet,
                data: Bytes::new(),
                value: Default::default(),
                gas_limit: 200_000,
            })
        }
    }
}
