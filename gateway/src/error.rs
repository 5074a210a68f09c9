use driftrace_core::error::Error;
use jsonrpsee::core::error::Error as RpcError;
use jsonrpsee::types::error::CallError;

/// Wire format for a failed call: `CODE: message`, so a client can
/// switch on the stable code without parsing prose.
pub fn to_call_error(e: Error) -> CallError {
    CallError::Failed(anyhow::anyhow!("{}: {e}", e.code()))
}

pub fn to_rpc_error(e: Error) -> RpcError {
    RpcError::Call(to_call_error(e))
}
