//! Deterministic serialization for boundary types.
//!
//! The action result crossing the engine/host boundary must be decodable
//! without out-of-band schema knowledge, and byte-identical across nodes.
//!
//! Encoding rules:
//! - Fixed-size fields (`Address`, `u64`, `u8`, `bool`) are written directly,
//!   numbers little-endian
//! - Variable-length fields (`Vec<u8>`, `String`) are length-prefixed (u32 LE)
//! - Repeated fields are count-prefixed (u32 LE) then concatenated
//! - Enums carry one leading tag byte

use crate::action::{
    Action, ActionResult, DeployContractAction, FunctionCallAction,
    InvocationContext, PromiseResult, ReadContractDataAction,
    ReadIdentityAction, TransferAction,
};
use crate::action::{
    ACTION_DEPLOY_CONTRACT, ACTION_FUNCTION_CALL, ACTION_NONE,
    ACTION_READ_CONTRACT_DATA, ACTION_READ_IDENTITY, ACTION_TRANSFER,
};
use crate::error::DecodeError;
use crate::types::{Address, ADDRESS_LEN};

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + n > self.data.len() {
            return Err(DecodeError::new("unexpected end of data"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::new("invalid bool value")),
        }
    }

    fn read_address(&mut self) -> Result<Address, DecodeError> {
        let bytes = self.read_bytes(ADDRESS_LEN)?;
        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(bytes);
        Ok(addr)
    }

    fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::new("invalid UTF-8"))
    }

    fn finish(&self) -> Result<(), DecodeError> {
        if self.pos != self.data.len() {
            return Err(DecodeError::new("trailing bytes after value"));
        }
        Ok(())
    }
}

// ── Encoding helpers ──

fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(u8::from(v));
}

fn write_address(buf: &mut Vec<u8>, addr: &Address) {
    buf.extend_from_slice(addr);
}

fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

// ── Action ──

fn write_action(buf: &mut Vec<u8>, action: &Action) {
    write_u8(buf, action.tag());
    match action {
        Action::None => {}
        Action::FunctionCall(call) => {
            write_string(buf, &call.method);
            write_var_bytes(buf, &call.args);
            write_var_bytes(buf, &call.deposit);
            write_u64(buf, call.gas_limit);
        }
        Action::Transfer(transfer) => {
            write_var_bytes(buf, &transfer.amount);
        }
        Action::DeployContract(deploy) => {
            write_var_bytes(buf, &deploy.code);
            write_var_bytes(buf, &deploy.args);
            write_var_bytes(buf, &deploy.nonce);
            write_var_bytes(buf, &deploy.deposit);
            write_u64(buf, deploy.gas_limit);
        }
        Action::ReadContractData(read) => {
            write_var_bytes(buf, &read.key);
            write_u64(buf, read.gas_limit);
        }
        Action::ReadIdentity(read) => {
            write_address(buf, &read.addr);
            write_u64(buf, read.gas_limit);
        }
    }
}

fn read_action(r: &mut Reader<'_>) -> Result<Action, DecodeError> {
    let tag = r.read_u8()?;
    match tag {
        ACTION_NONE => Ok(Action::None),
        ACTION_FUNCTION_CALL => Ok(Action::FunctionCall(FunctionCallAction {
            method: r.read_string()?,
            args: r.read_var_bytes()?,
            deposit: r.read_var_bytes()?,
            gas_limit: r.read_u64()?,
        })),
        ACTION_TRANSFER => Ok(Action::Transfer(TransferAction {
            amount: r.read_var_bytes()?,
        })),
        ACTION_DEPLOY_CONTRACT => Ok(Action::DeployContract(DeployContractAction {
            code: r.read_var_bytes()?,
            args: r.read_var_bytes()?,
            nonce: r.read_var_bytes()?,
            deposit: r.read_var_bytes()?,
            gas_limit: r.read_u64()?,
        })),
        ACTION_READ_CONTRACT_DATA => {
            Ok(Action::ReadContractData(ReadContractDataAction {
                key: r.read_var_bytes()?,
                gas_limit: r.read_u64()?,
            }))
        }
        ACTION_READ_IDENTITY => Ok(Action::ReadIdentity(ReadIdentityAction {
            addr: r.read_address()?,
            gas_limit: r.read_u64()?,
        })),
        _ => Err(DecodeError::new("unknown action tag")),
    }
}

/// Encode a single action.
pub fn encode_action(action: &Action) -> Vec<u8> {
    let mut buf = Vec::new();
    write_action(&mut buf, action);
    buf
}

/// Decode a single action.
pub fn decode_action(data: &[u8]) -> Result<Action, DecodeError> {
    let mut r = Reader::new(data);
    let action = read_action(&mut r)?;
    r.finish()?;
    Ok(action)
}

// ── ActionResult ──

fn write_action_result(buf: &mut Vec<u8>, res: &ActionResult) {
    write_action(buf, &res.input_action);
    write_u64(buf, res.gas_used);
    write_u64(buf, res.remaining_gas);
    write_bool(buf, res.success);
    write_string(buf, &res.error);
    write_var_bytes(buf, &res.output_data);
    write_address(buf, &res.contract);
    write_u32(buf, res.sub_results.len() as u32);
    for sub in &res.sub_results {
        write_action_result(buf, sub);
    }
}

fn read_action_result(r: &mut Reader<'_>) -> Result<ActionResult, DecodeError> {
    let input_action = read_action(r)?;
    let gas_used = r.read_u64()?;
    let remaining_gas = r.read_u64()?;
    let success = r.read_bool()?;
    let error = r.read_string()?;
    let output_data = r.read_var_bytes()?;
    let contract = r.read_address()?;
    let count = r.read_u32()? as usize;
    let mut sub_results = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        sub_results.push(read_action_result(r)?);
    }
    Ok(ActionResult {
        input_action,
        gas_used,
        remaining_gas,
        success,
        error,
        output_data,
        sub_results,
        contract,
    })
}

/// Encode an action result tree.
pub fn encode_action_result(res: &ActionResult) -> Vec<u8> {
    let mut buf = Vec::new();
    write_action_result(&mut buf, res);
    buf
}

/// Decode an action result tree.
pub fn decode_action_result(data: &[u8]) -> Result<ActionResult, DecodeError> {
    let mut r = Reader::new(data);
    let res = read_action_result(&mut r)?;
    r.finish()?;
    Ok(res)
}

// ── PromiseResult / InvocationContext ──

const PROMISE_RESULT_FAILED: u8 = 0;
const PROMISE_RESULT_EMPTY: u8 = 1;
const PROMISE_RESULT_VALUE: u8 = 2;

fn write_promise_result(buf: &mut Vec<u8>, res: &PromiseResult) {
    match res {
        PromiseResult::Failed => write_u8(buf, PROMISE_RESULT_FAILED),
        PromiseResult::Empty => write_u8(buf, PROMISE_RESULT_EMPTY),
        PromiseResult::Value(data) => {
            write_u8(buf, PROMISE_RESULT_VALUE);
            write_var_bytes(buf, data);
        }
    }
}

fn read_promise_result(r: &mut Reader<'_>) -> Result<PromiseResult, DecodeError> {
    match r.read_u8()? {
        PROMISE_RESULT_FAILED => Ok(PromiseResult::Failed),
        PROMISE_RESULT_EMPTY => Ok(PromiseResult::Empty),
        PROMISE_RESULT_VALUE => Ok(PromiseResult::Value(r.read_var_bytes()?)),
        _ => Err(DecodeError::new("unknown promise result tag")),
    }
}

/// Encode an invocation context.
pub fn encode_invocation_context(ctx: &InvocationContext) -> Vec<u8> {
    let mut buf = Vec::new();
    write_bool(&mut buf, ctx.is_callback);
    match &ctx.promise_result {
        None => write_u8(&mut buf, 0),
        Some(res) => {
            write_u8(&mut buf, 1);
            write_promise_result(&mut buf, res);
        }
    }
    buf
}

/// Decode an invocation context.
pub fn decode_invocation_context(
    data: &[u8],
) -> Result<InvocationContext, DecodeError> {
    let mut r = Reader::new(data);
    let is_callback = r.read_bool()?;
    let promise_result = match r.read_u8()? {
        0 => None,
        1 => Some(read_promise_result(&mut r)?),
        _ => return Err(DecodeError::new("invalid optional flag")),
    };
    r.finish()?;
    Ok(InvocationContext {
        is_callback,
        promise_result,
    })
}
