#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;

use synthx::ai::{AiError, ChatRequest, ChatTransport};
use synthx::analyzers::Clock;
use synthx::bridge::{ContentScript, PageRealm, TabRegistry, WalletProvider};
use synthx::config::AiConfig;
use synthx::explorer::{ExplorerTransport, FetchError};
use synthx::pricing::{PricingError, PricingHelper, QuoteBasis, SwapQuote, SwapTransactionRequest};
use synthx::storage::{MemoryStore, StoredState};
use synthx::{Collaborators, ExtensionMessage, Orchestrator, Reply};

pub const ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const SEPOLIA: &str = "0xaa36a7";
pub const SAFE_VERDICT: &str =
    r#"{"safety_score":80,"verdict":"SAFE","risks":[],"reason":"ok","confidence":"HIGH"}"#;

/// Explorer answering by path suffix; anything else is an empty page
pub struct FakeExplorer {
    routes: Mutex<HashMap<String, Value>>,
    failing: bool,
    pub calls: AtomicUsize,
}

impl FakeExplorer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { routes: Mutex::new(HashMap::new()), failing: false, calls: AtomicUsize::new(0) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { routes: Mutex::new(HashMap::new()), failing: true, calls: AtomicUsize::new(0) })
    }

    pub fn route(&self, suffix: &str, body: Value) {
        self.routes.lock().insert(suffix.to_string(), body);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExplorerTransport for FakeExplorer {
    async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(FetchError::Status { status: 503, endpoint: url.path().to_string() });
        }
        let routes = self.routes.lock();
        // longest suffix wins so `/addresses/x` does not shadow `/addresses/x/token-transfers`
        let body = routes
            .iter()
            .filter(|(suffix, _)| url.path().ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, body)| body.clone());
        Ok(body.unwrap_or_else(|| json!({ "items": [] })))
    }
}

pub struct FakeChat {
    reply: Mutex<Result<String, AiError>>,
    pub calls: AtomicUsize,
}

impl FakeChat {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self { reply: Mutex::new(Ok(text.to_string())), calls: AtomicUsize::new(0) })
    }

    pub fn set_reply(&self, reply: Result<String, AiError>) {
        *self.reply.lock() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for FakeChat {
    async fn send(&self, _request: ChatRequest<'_>) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().clone()
    }
}

pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// Quotes 0.1 ETH → 200 USDC, or fails every quote when offline
pub struct FakePricing {
    pub online: bool,
    pub quotes: AtomicUsize,
}

impl FakePricing {
    pub fn online() -> Arc<Self> {
        Arc::new(Self { online: true, quotes: AtomicUsize::new(0) })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self { online: false, quotes: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl PricingHelper for FakePricing {
    async fn quote(&self, from: &str, to: &str, amount: &str) -> Result<SwapQuote, PricingError> {
        self.quotes.fetch_add(1, Ordering::SeqCst);
        if !self.online {
            return Err(PricingError::Rpc("connection refused".into()));
        }
        let mut quote = SwapQuote::estimated(from, to, amount, "");
        quote.expected_output = "200.0".into();
        quote.min_received = "199.0".into();
        quote.price_impact = "0.30%".into();
        quote.path_encoding = Bytes::from(vec![1u8; 43]);
        quote.gas_cost = "0.0002".into();
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
            return Err(PricingError::EstimatedQuote("no live quote".into()));
        }
        Ok(SwapTransactionRequest {
            to: Address::repeat_byte(0x3b),
            from: wallet,
            data: Bytes::from(vec![0xb8, 0x58, 0x18, 0x3f]),
            value: U256::from(100_000_000_000_000_000u64),
            gas_limit: 200_000,
        })
    }
}

pub struct FakeWallet {
    pub chain: &'static str,
    pub sends: AtomicUsize,
}

impl FakeWallet {
    pub fn on(chain: &'static str) -> Arc<Self> {
        Arc::new(Self { chain, sends: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, synthx::WalletError> {
        match method {
            "eth_requestAccounts" => Ok(json!([ADDRESS])),
            "eth_chainId" => Ok(json!(self.chain)),
            "eth_sendTransaction" => {
                self.sends.fetch_add(1, Ordering::SeqCst);
                Ok(json!(format!("0x{}", "ab".repeat(32))))
            }
            other => Err(synthx::WalletError::TransactionFailed(format!("unsupported {other}"))),
        }
    }
}

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub explorer: Arc<FakeExplorer>,
    pub chat: Arc<FakeChat>,
    pub pricing: Arc<FakePricing>,
    pub tabs: Arc<TabRegistry>,
    pub clock: Arc<TestClock>,
    pub store: Arc<MemoryStore>,
}

pub struct HarnessBuilder {
    state: StoredState,
    explorer: Arc<FakeExplorer>,
    chat: Arc<FakeChat>,
    pricing: Arc<FakePricing>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            state: StoredState::default(),
            explorer: FakeExplorer::new(),
            chat: FakeChat::replying(SAFE_VERDICT),
            pricing: FakePricing::online(),
        }
    }

    pub fn with_key(mut self) -> Self {
        self.state.api_key = Some("sk-ant-test-key".into());
        self
    }

    pub fn explorer(mut self, explorer: Arc<FakeExplorer>) -> Self {
        self.explorer = explorer;
        self
    }

    pub fn chat(mut self, chat: Arc<FakeChat>) -> Self {
        self.chat = chat;
        self
    }

    pub fn pricing(mut self, pricing: Arc<FakePricing>) -> Self {
        self.pricing = pricing;
        self
    }

    pub async fn build(self) -> Harness {
        let store = Arc::new(MemoryStore::with_state(self.state));
        let tabs = Arc::new(TabRegistry::new());
        let clock = TestClock::new();

        let orchestrator = Orchestrator::start(Collaborators {
            store: store.clone(),
            explorer: self.explorer.clone(),
            chat: self.chat.clone(),
            pricing: self.pricing.clone(),
            tabs: tabs.clone(),
            clock: clock.clone(),
            ai: AiConfig::default(),
        })
        .await
        .unwrap();

        Harness { orchestrator, explorer: self.explorer, chat: self.chat, pricing: self.pricing, tabs, clock, store }
    }
}

impl Harness {
    pub async fn send(&self, action: &str, data: Value) -> Reply {
        self.orchestrator.handle(ExtensionMessage::new(action, data)).await
    }

    /// Opens a page with `wallet` in tab `tab` and focuses it
    pub fn open_tab(&self, tab: u32, wallet: Option<Arc<dyn WalletProvider>>) -> Arc<PageRealm> {
        let page = Arc::new(PageRealm::new(wallet, self.pricing.clone()));
        let content = ContentScript::new(page.clone(), Duration::from_millis(500));
        self.tabs.attach_local(tab, Arc::new(content));
        page
    }
}

pub fn contract_address_record() -> Value {
    json!({
        "coin_balance": "1000000000000000000",
        "transactions_count": 5,
        "verified": true,
        "type": "contract",
        "token": null
    })
}
