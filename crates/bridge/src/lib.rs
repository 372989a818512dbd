//! Wire protocol and pending-request bookkeeping for the webview bridge.

mod protocol;
mod registry;

pub use protocol::{
    parse_request, settle_script, BridgeError, BridgeReply, ErrorCode, IpcRequest, ParseError,
};
pub use registry::{PendingEntry, PendingRegistry, RegistryError};
