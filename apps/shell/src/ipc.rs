//! Webview IPC intake: parse one posted message and queue it for the
//! backend worker, without blocking the event-loop thread.

use crossbeam_channel::{Sender, TrySendError};
use vitrine_bridge::{parse_request, BridgeError, BridgeReply, ErrorCode, IpcRequest, ParseError};

/// Handles one raw IPC message. A `Some` reply never reached the worker
/// and must be settled immediately by the caller.
pub fn intake(raw: &str, queue: &Sender<IpcRequest>) -> Option<BridgeReply> {
    let request = match parse_request(raw) {
        Ok(request) => request,
        Err(ParseError::Unintelligible(reason)) => {
            tracing::warn!(%reason, "dropping unintelligible ipc message");
            return None;
        }
        Err(ParseError::Invalid { id, reason }) => {
            return Some(BridgeReply::rejected(
                id,
                BridgeError::new(ErrorCode::InvalidRequest, reason),
            ));
        }
    };

    let id = request.id.clone();
    let command = request.command.clone();
    match queue.try_send(request) {
        Ok(()) => {
            tracing::debug!(%id, %command, "queued bridge request");
            None
        }
        Err(TrySendError::Full(_)) => Some(BridgeReply::rejected(
            id,
            BridgeError::new(ErrorCode::Overloaded, "bridge queue is full"),
        )),
        Err(TrySendError::Disconnected(_)) => Some(BridgeReply::rejected(
            id,
            BridgeError::new(ErrorCode::Overloaded, "bridge worker is not running"),
        )),
    }
}
