//! Events delivered to the shell event loop from other threads.

use vitrine_bridge::BridgeReply;

#[derive(Debug)]
pub enum ShellEvent {
    BridgeReply(BridgeReply),
}
