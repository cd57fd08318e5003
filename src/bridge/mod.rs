//! # Page-Context Bridge
//!
//! Three contexts, two transports. The background reaches a tab's content
//! script over a tab-scoped request/response port ([`tabs`]); the content
//! script reaches the page script over a tagged window broadcast
//! ([`protocol::WindowBus`]); only the page script talks to the wallet.

pub mod content;
pub mod correlator;
pub mod page;
pub mod pipeline;
pub mod protocol;
pub mod tabs;

pub use content::ContentScript;
pub use correlator::PendingReplies;
pub use page::{InjectError, JsonRpcWallet, PageRealm, ScriptInjector, WalletProvider};
pub use pipeline::SwapPipeline;
pub use protocol::{SwapOrder, SwapPhase, SwapReceipt, TabRequest, TabResponse, WindowBus, WindowMessage};
pub use tabs::{TabEnvelope, TabId, TabMessenger, TabPort, TabRegistry};
