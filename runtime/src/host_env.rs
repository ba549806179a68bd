//! Per-execution state held in the Wasmtime store.
//!
//! `HostState` combines the host capability object, the gas meter, the
//! deferred-action queue, the invocation context, and the host allocator
//! into the single value living inside `Store<HostState<H>>` for the
//! duration of one execution. It is created fresh per request and torn down
//! with the instance.

use basalt_hostapi::HostApi;
use basalt_primitives::{
    Action, Address, Amount, CostSchedule, DeployContractAction,
    FunctionCallAction, GasMeter, InvocationContext, Promise, PromiseResult,
    ReadContractDataAction, ReadIdentityAction, TransferAction,
};

use crate::error::VmError;
use crate::memory::HostAllocator;

/// Per-execution mutable state.
pub struct HostState<H: HostApi> {
    /// The host capability object; the engine's only window onto world state.
    pub host: H,
    /// The execution's gas budget. Exclusive to this request.
    pub meter: GasMeter,
    /// Gas cost policy.
    pub costs: CostSchedule,
    /// Deferred actions queued by the contract, in insertion order.
    pub promises: Vec<Promise>,
    /// True when this call is a promise callback.
    pub is_callback: bool,
    /// Result of the awaited promise, for callback invocations.
    pub promise_result: Option<PromiseResult>,
    /// Bump allocator for host-written guest buffers.
    pub alloc: HostAllocator,
    /// First typed failure raised by a host function; classified after the
    /// resulting trap unwinds out of the guest.
    pub trap_cause: Option<VmError>,
    /// Whether guest debug prints are surfaced.
    pub debug: bool,
}

impl<H: HostApi> HostState<H> {
    /// Create the state for one execution request.
    pub fn new(
        host: H,
        gas_limit: u64,
        costs: CostSchedule,
        context: Option<InvocationContext>,
        debug: bool,
    ) -> Self {
        let context = context.unwrap_or_default();
        Self {
            host,
            meter: GasMeter::new(gas_limit),
            costs,
            promises: Vec::new(),
            is_callback: context.is_callback,
            promise_result: context.promise_result,
            // Placeholder until the engine reserves the real region after
            // instantiation.
            alloc: HostAllocator::default(),
            trap_cause: None,
            debug,
        }
    }

    /// Record a typed failure and produce the error that traps the guest.
    ///
    /// Only the first cause is kept; it wins over whatever generic trap
    /// message wasmtime reports while unwinding.
    pub fn fail(&mut self, err: VmError) -> anyhow::Error {
        match &err {
            VmError::HostPanic(msg) => {
                tracing::error!(target: "basalt_runtime", %msg, "host callback panicked");
            }
            VmError::HostFailure(msg) | VmError::Internal(msg) => {
                tracing::warn!(target: "basalt_runtime", %msg, "host callback failed");
            }
            _ => {
                tracing::debug!(target: "basalt_runtime", error = %err, "host call aborted execution");
            }
        }
        let trap = anyhow::anyhow!("{err}");
        if self.trap_cause.is_none() {
            self.trap_cause = Some(err);
        }
        trap
    }

    // ── Deferred actions ──

    /// Queue a transfer to `to`. The amount was already deducted.
    pub fn queue_transfer(&mut self, to: Address, amount: Amount) -> Result<(), VmError> {
        let own = self.host.contract()?;
        self.promises.push(Promise {
            predecessor: own,
            receiver: to,
            action: Action::Transfer(TransferAction { amount }),
            callback: None,
        });
        Ok(())
    }

    /// Queue a cross-contract call. Returns the promise index.
    pub fn queue_call(
        &mut self,
        to: Address,
        method: String,
        args: Vec<u8>,
        deposit: Amount,
        gas_limit: u64,
    ) -> Result<u32, VmError> {
        let own = self.host.contract()?;
        self.promises.push(Promise {
            predecessor: own,
            receiver: to,
            action: Action::FunctionCall(FunctionCallAction {
                method,
                args,
                deposit,
                gas_limit,
            }),
            callback: None,
        });
        Ok(self.promises.len() as u32 - 1)
    }

    /// Queue a contract deploy. The receiver is the derived address.
    pub fn queue_deploy(
        &mut self,
        code: Vec<u8>,
        args: Vec<u8>,
        nonce: Vec<u8>,
        deposit: Amount,
        gas_limit: u64,
    ) -> Result<u32, VmError> {
        let own = self.host.contract()?;
        let to = self.host.contract_addr(&code, &args, &nonce)?;
        self.promises.push(Promise {
            predecessor: own,
            receiver: to,
            action: Action::DeployContract(DeployContractAction {
                code,
                args,
                nonce,
                deposit,
                gas_limit,
            }),
            callback: None,
        });
        Ok(self.promises.len() as u32 - 1)
    }

    /// Queue a read of another contract's storage.
    pub fn queue_read_contract_data(
        &mut self,
        to: Address,
        key: Vec<u8>,
        gas_limit: u64,
    ) -> Result<u32, VmError> {
        let own = self.host.contract()?;
        self.promises.push(Promise {
            predecessor: own,
            receiver: to,
            action: Action::ReadContractData(ReadContractDataAction { key, gas_limit }),
            callback: None,
        });
        Ok(self.promises.len() as u32 - 1)
    }

    /// Queue an identity lookup.
    pub fn queue_read_identity(
        &mut self,
        addr: Address,
        gas_limit: u64,
    ) -> Result<u32, VmError> {
        let own = self.host.contract()?;
        self.promises.push(Promise {
            predecessor: own,
            receiver: addr,
            action: Action::ReadIdentity(ReadIdentityAction { addr, gas_limit }),
            callback: None,
        });
        Ok(self.promises.len() as u32 - 1)
    }

    /// Attach a callback to a queued promise. One callback per promise.
    pub fn attach_callback(
        &mut self,
        idx: u32,
        method: String,
        args: Vec<u8>,
        deposit: Amount,
        gas_limit: u64,
    ) -> Result<(), VmError> {
        match self.promises.get_mut(idx as usize) {
            Some(promise) => {
                if promise.callback.is_some() {
                    return Err(VmError::contract_trap(
                        "promise already has a callback",
                    ));
                }
                promise.callback = Some(Action::FunctionCall(FunctionCallAction {
                    method,
                    args,
                    deposit,
                    gas_limit,
                }));
                Ok(())
            }
            None => Err(VmError::contract_trap("invalid promise index")),
        }
    }
}
