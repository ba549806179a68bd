//! The execution engine: compiles contract bytecode, binds the host bridge
//! and gas meter, dispatches an entry point, applies queued actions, and
//! assembles the outcome.
//!
//! One `execute` or `deploy` call creates a fresh engine, store, and
//! instance; nothing survives the call. Execution walks
//! loaded → running → one of completed / trapped / out-of-gas / host-aborted,
//! and every path — including every failure — produces a well-formed
//! [`ExecutionOutcome`].

use wasmtime::{Config, Engine, Linker, Module, Store, Trap};

use basalt_hostapi::HostApi;
use basalt_primitives::types::{MAX_ARGS_SIZE, MAX_CODE_SIZE};
use basalt_primitives::{
    codec, Action, ActionResult, Address, Amount, ByteView, CostSchedule,
    DeployContractAction, FunctionCallAction, InvocationContext, OwnedBuffer,
    Promise, PromiseResult, StatusCode,
};

use crate::config::VmConfig;
use crate::error::VmError;
use crate::host_env::HostState;
use crate::linker::register_host_functions;
use crate::memory::{self, unpack_region, HostAllocator, HOST_ALLOC_PAGES, WASM_PAGE_SIZE};
use crate::validation::{resolve_entry_point, validate_module, DEPLOY_ENTRY_POINT};

/// One contract method invocation. Immutable for the call's duration.
#[derive(Debug, Clone)]
pub struct ExecuteRequest<'a> {
    /// Contract bytecode (wasm binary or text).
    pub code: &'a [u8],
    /// Name of the exported entry point to invoke.
    pub method: &'a str,
    /// Opaque argument bytes handed to the entry point. Borrowed for the
    /// duration of this call only; absent reads as empty.
    pub args: ByteView<'a>,
    /// Invocation context (callback flag, awaited promise result).
    pub context: Option<InvocationContext>,
    /// Address of the executing contract.
    pub contract: Address,
    /// Gas budget for this call.
    pub gas_limit: u64,
    /// Surface guest debug prints.
    pub debug: bool,
}

/// One contract deployment. The constructor entry point is implicit.
#[derive(Debug, Clone)]
pub struct DeployRequest<'a> {
    pub code: &'a [u8],
    pub args: ByteView<'a>,
    pub contract: Address,
    pub gas_limit: u64,
    pub debug: bool,
}

/// What one execution produced, in boundary form.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// Terminal status. Only `Ok` means the entry point completed.
    pub status: StatusCode,
    /// Gas consumed; never exceeds the request's limit.
    pub gas_used: u64,
    /// Encoded action result tree. Absent after a host abort, when partial
    /// state must not be trusted.
    pub action_result: OwnedBuffer,
}

impl ExecutionOutcome {
    /// Decode the action result, if present and well-formed.
    pub fn decoded(&self) -> Option<ActionResult> {
        self.action_result
            .as_slice()
            .and_then(|bytes| codec::decode_action_result(bytes).ok())
    }
}

/// The contract execution engine. Cheap to construct; holds only policy.
pub struct Runtime {
    config: VmConfig,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

/// Run a contract method under the default configuration.
pub fn execute<H: HostApi + 'static>(host: H, req: &ExecuteRequest<'_>) -> ExecutionOutcome {
    Runtime::default().execute(host, req)
}

/// Deploy a contract under the default configuration.
pub fn deploy<H: HostApi + 'static>(host: H, req: &DeployRequest<'_>) -> ExecutionOutcome {
    Runtime::default().deploy(host, req)
}

impl Runtime {
    pub fn new(config: VmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Run a named entry point.
    pub fn execute<H: HostApi + 'static>(
        &self,
        host: H,
        req: &ExecuteRequest<'_>,
    ) -> ExecutionOutcome {
        let args = req.args.read_or_empty();
        let input_action = Action::FunctionCall(FunctionCallAction {
            method: req.method.to_string(),
            args: args.to_vec(),
            deposit: Vec::new(),
            gas_limit: req.gas_limit,
        });

        // Validation and entry-point lookup happen before any gas charge.
        let prepared = validate_execute_request(req)
            .and_then(|()| self.compile(req.code))
            .and_then(|(engine, module)| {
                validate_module(&module)?;
                resolve_entry_point(&module, req.method)?;
                Ok((engine, module))
            });
        let (engine, module) = match prepared {
            Ok(v) => v,
            Err(err) => {
                return self.failure_outcome(err, input_action, req.contract, 0, req.gas_limit);
            }
        };

        self.run(
            host,
            engine,
            module,
            req.method,
            args,
            req.context.clone(),
            req.contract,
            req.gas_limit,
            self.config.costs.call_base,
            req.debug,
            input_action,
        )
    }

    /// Run a contract's constructor.
    pub fn deploy<H: HostApi + 'static>(
        &self,
        host: H,
        req: &DeployRequest<'_>,
    ) -> ExecutionOutcome {
        let args = req.args.read_or_empty();
        // Code is dropped from the recorded action; the host already has it.
        let input_action = Action::DeployContract(DeployContractAction {
            code: Vec::new(),
            args: args.to_vec(),
            nonce: Vec::new(),
            deposit: Vec::new(),
            gas_limit: req.gas_limit,
        });

        let prepared = validate_code_and_args(req.code, args)
            .and_then(|()| self.compile(req.code))
            .and_then(|(engine, module)| {
                validate_module(&module)?;
                resolve_entry_point(&module, DEPLOY_ENTRY_POINT)?;
                Ok((engine, module))
            });
        let (engine, module) = match prepared {
            Ok(v) => v,
            Err(err) => {
                return self.failure_outcome(err, input_action, req.contract, 0, req.gas_limit);
            }
        };

        self.run(
            host,
            engine,
            module,
            DEPLOY_ENTRY_POINT,
            args,
            None,
            req.contract,
            req.gas_limit,
            self.config.costs.deploy_base,
            req.debug,
            input_action,
        )
    }

    fn compile(&self, code: &[u8]) -> Result<(Engine, Module), VmError> {
        let engine = create_engine(&self.config)?;
        let module = Module::new(&engine, code)
            .map_err(|e| VmError::bad_argument(format!("compilation error: {e}")))?;
        Ok((engine, module))
    }

    #[allow(clippy::too_many_arguments)]
    fn run<H: HostApi + 'static>(
        &self,
        host: H,
        engine: Engine,
        module: Module,
        entry: &str,
        args: &[u8],
        context: Option<InvocationContext>,
        contract: Address,
        gas_limit: u64,
        base_cost: u64,
        debug: bool,
        input_action: Action,
    ) -> ExecutionOutcome {
        let state = HostState::new(host, gas_limit, self.config.costs.clone(), context, debug);
        let mut store = Store::new(&engine, state);
        if store.set_fuel(gas_limit).is_err() {
            return self.failure_outcome(
                VmError::internal("fuel metering unavailable"),
                input_action,
                contract,
                0,
                gas_limit,
            );
        }

        // The up-front cost of entering a contract at all.
        if store.data_mut().meter.charge(base_cost).is_err() {
            return self.failure_outcome(
                VmError::OutOfGas,
                input_action,
                contract,
                gas_limit,
                gas_limit,
            );
        }
        let remaining = store.data().meter.remaining();
        let _ = store.set_fuel(remaining);

        let mut linker = Linker::new(&engine);
        if let Err(err) = register_host_functions::<H>(&mut linker) {
            return self.failure_outcome(err, input_action, contract, 0, gas_limit);
        }

        let call_res = self.call_entry(&mut store, &linker, &module, entry, args);

        // Fold the evaluator's instruction metering into the meter.
        let fuel = store.get_fuel().unwrap_or(0);
        store.data_mut().meter.absorb(gas_limit.saturating_sub(fuel));

        match call_res {
            Err(err) => {
                if matches!(err, VmError::OutOfGas) {
                    store.data_mut().meter.absorb(gas_limit);
                }
                let gas_used = store.data().meter.consumed();
                self.failure_outcome(err, input_action, contract, gas_used, gas_limit)
            }
            Ok(output_data) => {
                let HostState {
                    mut host,
                    mut meter,
                    costs,
                    promises,
                    ..
                } = store.into_data();

                let sub_results = apply_promises(&mut host, contract, promises, &costs);
                let refund: u64 = sub_results.iter().map(|r| r.remaining_gas).sum();
                meter.refund(refund);
                let gas_used = meter.consumed();

                let mut result =
                    success_result(input_action, contract, output_data, gas_used, gas_limit);
                result.sub_results = sub_results;
                ExecutionOutcome {
                    status: StatusCode::Ok,
                    gas_used,
                    action_result: OwnedBuffer::some(codec::encode_action_result(&result)),
                }
            }
        }
    }

    /// Instantiate, wire up the host region, invoke the entry point, and
    /// read back its result payload.
    fn call_entry<H: HostApi + 'static>(
        &self,
        store: &mut Store<HostState<H>>,
        linker: &Linker<HostState<H>>,
        module: &Module,
        entry: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, VmError> {
        let instance = linker.instantiate(&mut *store, module).map_err(|e| {
            let cause = store.data_mut().trap_cause.take();
            classify_instantiation(e, cause)
        })?;

        let mem = instance
            .get_memory(&mut *store, "memory")
            .ok_or_else(|| VmError::internal("validated module lost its memory export"))?;

        // Reserve the host allocation region past the guest's own memory.
        let current_pages = mem.size(&*store);
        mem.grow(&mut *store, HOST_ALLOC_PAGES)
            .map_err(|e| VmError::internal(format!("initial memory grow: {e}")))?;
        let alloc_base = current_pages as usize * WASM_PAGE_SIZE;
        let alloc_capacity = HOST_ALLOC_PAGES as usize * WASM_PAGE_SIZE;
        store.data_mut().alloc = HostAllocator::new(alloc_base, alloc_capacity);

        let (args_ptr, args_len) = if args.is_empty() {
            (0, 0)
        } else {
            let (ptr, new_bump, new_cap, grow_pages) =
                store.data().alloc.compute_alloc(args.len());
            if grow_pages > 0 {
                mem.grow(&mut *store, grow_pages)
                    .map_err(|e| VmError::internal(format!("argument grow: {e}")))?;
            }
            mem.data_mut(&mut *store)[ptr..ptr + args.len()].copy_from_slice(args);
            store.data_mut().alloc.commit(new_bump, new_cap);
            (ptr as i32, args.len() as i32)
        };

        let func = instance
            .get_typed_func::<(i32, i32), i64>(&mut *store, entry)
            .map_err(|e| VmError::internal(format!("entry point '{entry}': {e}")))?;

        let packed = func.call(&mut *store, (args_ptr, args_len)).map_err(|e| {
            let cause = store.data_mut().trap_cause.take();
            classify_trap(e, cause)
        })?;

        if packed == 0 {
            return Ok(Vec::new());
        }
        let (ptr, len) = unpack_region(packed);
        if len as usize > self.config.max_result_size {
            return Err(VmError::ResultTooLarge {
                actual: len as usize,
                max: self.config.max_result_size,
            });
        }
        memory::read_bytes(mem.data(&*store), ptr as i32, len as i32)
    }

    /// Build the outcome for a failed execution. The action result is still
    /// well-formed, except after engine-fatal host aborts where partial
    /// state must not be handed back.
    fn failure_outcome(
        &self,
        err: VmError,
        input_action: Action,
        contract: Address,
        gas_used: u64,
        gas_limit: u64,
    ) -> ExecutionOutcome {
        let status = err.status_code();
        tracing::debug!(
            target: "basalt_runtime",
            %status,
            error = %err,
            gas_used,
            "execution failed"
        );
        if err.is_engine_fatal() {
            return ExecutionOutcome {
                status,
                gas_used,
                action_result: OwnedBuffer::none(),
            };
        }

        let output_data = match &err {
            VmError::ContractError(payload) => payload.clone(),
            _ => Vec::new(),
        };
        let result = ActionResult {
            input_action,
            gas_used,
            remaining_gas: gas_limit.saturating_sub(gas_used),
            success: false,
            error: err.to_string(),
            output_data,
            sub_results: Vec::new(),
            contract,
        };
        ExecutionOutcome {
            status,
            gas_used,
            action_result: OwnedBuffer::some(codec::encode_action_result(&result)),
        }
    }
}

/// Engine configuration: fuel metering on, nondeterminism off.
fn create_engine(config: &VmConfig) -> Result<Engine, VmError> {
    let mut wasm_config = Config::new();

    wasm_config.consume_fuel(true);

    wasm_config.wasm_threads(false);
    wasm_config.wasm_simd(false);
    wasm_config.wasm_relaxed_simd(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.cranelift_nan_canonicalization(true);

    let max_bytes = (config.max_memory_pages as u64) * WASM_PAGE_SIZE as u64;
    wasm_config.memory_guaranteed_dense_image_size(max_bytes.min(16 * 1024 * 1024));

    Engine::new(&wasm_config).map_err(|e| VmError::internal(format!("engine: {e}")))
}

fn validate_execute_request(req: &ExecuteRequest<'_>) -> Result<(), VmError> {
    validate_code_and_args(req.code, req.args.read_or_empty())?;
    if req.method.is_empty() {
        return Err(VmError::bad_argument("method name is required"));
    }
    if req.method == DEPLOY_ENTRY_POINT {
        return Err(VmError::bad_argument("direct call to deploy is forbidden"));
    }
    let is_callback = req.context.as_ref().is_some_and(|c| c.is_callback);
    if req.method.starts_with('_') && !is_callback {
        return Err(VmError::bad_argument(
            "direct call to a promise callback is forbidden",
        ));
    }
    Ok(())
}

fn validate_code_and_args(code: &[u8], args: &[u8]) -> Result<(), VmError> {
    if code.is_empty() {
        return Err(VmError::bad_argument("code is required"));
    }
    if code.len() > MAX_CODE_SIZE {
        return Err(VmError::bad_argument("code too large"));
    }
    if args.len() > MAX_ARGS_SIZE {
        return Err(VmError::bad_argument("arguments too large"));
    }
    Ok(())
}

/// Map a trap out of guest execution to the typed failure.
///
/// A cause recorded by a host function wins; otherwise fuel exhaustion maps
/// to out-of-gas and anything else is a contract trap.
fn classify_trap(err: anyhow::Error, cause: Option<VmError>) -> VmError {
    if let Some(cause) = cause {
        return cause;
    }
    if let Some(trap) = err.downcast_ref::<Trap>() {
        if matches!(trap, Trap::OutOfFuel) {
            return VmError::OutOfGas;
        }
        return VmError::contract_trap(trap.to_string());
    }
    VmError::contract_trap(format!("{err:#}"))
}

/// Instantiation failures that are not traps mean the module asked for
/// something the runtime does not provide.
fn classify_instantiation(err: anyhow::Error, cause: Option<VmError>) -> VmError {
    if cause.is_some() || err.downcast_ref::<Trap>().is_some() {
        return classify_trap(err, cause);
    }
    VmError::bad_argument(format!("instantiation failed: {err}"))
}

fn success_result(
    input_action: Action,
    contract: Address,
    output_data: Vec<u8>,
    gas_used: u64,
    gas_limit: u64,
) -> ActionResult {
    ActionResult {
        input_action,
        gas_used,
        remaining_gas: gas_limit.saturating_sub(gas_used),
        success: true,
        error: String::new(),
        output_data,
        sub_results: Vec::new(),
        contract,
    }
}

fn failed_result(
    input_action: Action,
    contract: Address,
    error: String,
    gas_limit: u64,
) -> ActionResult {
    ActionResult {
        input_action,
        gas_used: 0,
        remaining_gas: gas_limit,
        success: false,
        error,
        output_data: Vec::new(),
        sub_results: Vec::new(),
        contract,
    }
}

// ── Deferred-action application ──

/// Apply queued actions through the host, in insertion order, collecting
/// one result per action plus one per callback.
///
/// A failed action produces a failed sub-result and refunds its deposit to
/// the issuer; its callback still runs and sees `Failed`.
fn apply_promises<H: HostApi>(
    host: &mut H,
    own_contract: Address,
    promises: Vec<Promise>,
    costs: &CostSchedule,
) -> Vec<ActionResult> {
    let mut results = Vec::new();

    for promise in promises {
        let promise_result = match &promise.action {
            Action::FunctionCall(call) => {
                let ctx = codec::encode_invocation_context(&InvocationContext::default());
                match host.call(
                    &promise.receiver,
                    &call.method,
                    &call.args,
                    &call.deposit,
                    call.gas_limit,
                    &ctx,
                ) {
                    Ok(res) => {
                        let pr = promise_result_from(&res);
                        results.push(res);
                        pr
                    }
                    Err(err) => {
                        refund_deposit(host, &promise.predecessor, &call.deposit);
                        results.push(failed_result(
                            promise.action.clone(),
                            promise.receiver,
                            err.to_string(),
                            call.gas_limit,
                        ));
                        Some(PromiseResult::Failed)
                    }
                }
            }
            Action::DeployContract(deploy) => {
                match host.deploy(
                    &deploy.code,
                    &deploy.args,
                    &deploy.nonce,
                    &deploy.deposit,
                    deploy.gas_limit,
                ) {
                    Ok(res) => {
                        let pr = promise_result_from(&res);
                        results.push(res);
                        pr
                    }
                    Err(err) => {
                        refund_deposit(host, &promise.predecessor, &deploy.deposit);
                        results.push(failed_result(
                            promise.action.clone(),
                            promise.receiver,
                            err.to_string(),
                            deploy.gas_limit,
                        ));
                        Some(PromiseResult::Failed)
                    }
                }
            }
            Action::Transfer(transfer) => {
                match host.add_balance(&promise.receiver, &transfer.amount) {
                    Ok(()) => {
                        results.push(success_result(
                            promise.action.clone(),
                            promise.receiver,
                            Vec::new(),
                            0,
                            0,
                        ));
                        Some(PromiseResult::Empty)
                    }
                    Err(err) => {
                        // The amount was deducted when the promise was
                        // queued; hand it back.
                        refund_deposit(host, &promise.predecessor, &transfer.amount);
                        results.push(failed_result(
                            promise.action.clone(),
                            promise.receiver,
                            err.to_string(),
                            0,
                        ));
                        Some(PromiseResult::Failed)
                    }
                }
            }
            Action::ReadContractData(read) => {
                let data = host.read_contract_data(&promise.receiver, &read.key);
                apply_read(
                    data.map(OwnedBuffer::consume),
                    promise.action.clone(),
                    promise.receiver,
                    read.gas_limit,
                    costs.host_op(read.key.len()),
                    &mut results,
                )
            }
            Action::ReadIdentity(read) => {
                let data = host.identity(&read.addr);
                apply_read(
                    data.map(OwnedBuffer::consume),
                    promise.action.clone(),
                    promise.receiver,
                    read.gas_limit,
                    costs.host_op(0),
                    &mut results,
                )
            }
            Action::None => None,
        };

        run_callback(host, own_contract, &promise, promise_result, &mut results);
    }

    results
}

fn apply_read<E: std::fmt::Display>(
    data: Result<Option<Vec<u8>>, E>,
    action: Action,
    receiver: Address,
    gas_limit: u64,
    cost: u64,
    results: &mut Vec<ActionResult>,
) -> Option<PromiseResult> {
    match data {
        Ok(value) => {
            let gas_used = cost.min(gas_limit);
            let (output, promise_result) = match value {
                None => (Vec::new(), PromiseResult::Empty),
                Some(v) => (v.clone(), PromiseResult::Value(v)),
            };
            results.push(success_result(action, receiver, output, gas_used, gas_limit));
            Some(promise_result)
        }
        Err(err) => {
            results.push(failed_result(action, receiver, err.to_string(), gas_limit));
            Some(PromiseResult::Failed)
        }
    }
}

fn run_callback<H: HostApi>(
    host: &mut H,
    own_contract: Address,
    promise: &Promise,
    promise_result: Option<PromiseResult>,
    results: &mut Vec<ActionResult>,
) {
    let Some(Action::FunctionCall(cb)) = promise.callback.clone() else {
        return;
    };
    let ctx = codec::encode_invocation_context(&InvocationContext {
        is_callback: true,
        promise_result,
    });
    match host.call(
        &own_contract,
        &cb.method,
        &cb.args,
        &cb.deposit,
        cb.gas_limit,
        &ctx,
    ) {
        Ok(res) => results.push(res),
        Err(err) => {
            refund_deposit(host, &promise.predecessor, &cb.deposit);
            results.push(failed_result(
                Action::FunctionCall(cb.clone()),
                own_contract,
                err.to_string(),
                cb.gas_limit,
            ));
        }
    }
}

fn promise_result_from(res: &ActionResult) -> Option<PromiseResult> {
    Some(if !res.success {
        PromiseResult::Failed
    } else if res.output_data.is_empty() {
        PromiseResult::Empty
    } else {
        PromiseResult::Value(res.output_data.clone())
    })
}

fn refund_deposit<H: HostApi>(host: &mut H, to: &Address, deposit: &Amount) {
    if !deposit.is_empty() {
        let _ = host.add_balance(to, deposit);
    }
}
