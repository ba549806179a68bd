//! The deferred-action model.
//!
//! Contracts do not mutate the world directly: side effects are queued as
//! [`Action`]s during execution and applied through the host after the entry
//! point returns. The engine reports the full [`ActionResult`] tree back to
//! the host, preserving insertion order — later actions may depend on state
//! mutated by earlier ones.

use crate::types::{Address, Amount, Gas};

/// Wire tag for [`Action::FunctionCall`].
pub const ACTION_FUNCTION_CALL: u8 = 1;
/// Wire tag for [`Action::Transfer`].
pub const ACTION_TRANSFER: u8 = 2;
/// Wire tag for [`Action::DeployContract`].
pub const ACTION_DEPLOY_CONTRACT: u8 = 3;
/// Wire tag for [`Action::ReadContractData`].
pub const ACTION_READ_CONTRACT_DATA: u8 = 4;
/// Wire tag for [`Action::ReadIdentity`].
pub const ACTION_READ_IDENTITY: u8 = 5;
/// Wire tag for [`Action::None`].
pub const ACTION_NONE: u8 = 0;

/// A request the contract makes against the host during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Action {
    /// No action (placeholder for results not caused by an action).
    #[default]
    None,
    /// Invoke a method on another contract with its own gas sub-budget.
    FunctionCall(FunctionCallAction),
    /// Move value to another account.
    Transfer(TransferAction),
    /// Deploy a new contract with its own gas sub-budget.
    DeployContract(DeployContractAction),
    /// Read another contract's storage.
    ReadContractData(ReadContractDataAction),
    /// Look up an identity record.
    ReadIdentity(ReadIdentityAction),
}

impl Action {
    /// The stable wire tag for this action.
    pub fn tag(&self) -> u8 {
        match self {
            Action::None => ACTION_NONE,
            Action::FunctionCall(_) => ACTION_FUNCTION_CALL,
            Action::Transfer(_) => ACTION_TRANSFER,
            Action::DeployContract(_) => ACTION_DEPLOY_CONTRACT,
            Action::ReadContractData(_) => ACTION_READ_CONTRACT_DATA,
            Action::ReadIdentity(_) => ACTION_READ_IDENTITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallAction {
    pub method: String,
    pub args: Vec<u8>,
    pub deposit: Amount,
    pub gas_limit: Gas,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAction {
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContractAction {
    pub code: Vec<u8>,
    pub args: Vec<u8>,
    pub nonce: Vec<u8>,
    pub deposit: Amount,
    pub gas_limit: Gas,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadContractDataAction {
    pub key: Vec<u8>,
    pub gas_limit: Gas,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadIdentityAction {
    pub addr: Address,
    pub gas_limit: Gas,
}

/// Outcome of one applied action, including its sub-actions.
///
/// The tree is self-describing once encoded (see [`crate::codec`]) so the
/// host can decode it without out-of-band schema knowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResult {
    /// The action this result answers.
    pub input_action: Action,
    /// Gas consumed by this action.
    pub gas_used: Gas,
    /// Gas reserved for this action but not spent (refunded to the caller).
    pub remaining_gas: Gas,
    /// Whether the action completed.
    pub success: bool,
    /// Error description when `success` is false.
    pub error: String,
    /// Payload returned by the action (entry-point return value, read data).
    pub output_data: Vec<u8>,
    /// Results of the actions this execution queued, in insertion order.
    pub sub_results: Vec<ActionResult>,
    /// The contract this result belongs to.
    pub contract: Address,
}

impl ActionResult {
    /// Append sub-action results, preserving order.
    pub fn append_sub_results(&mut self, results: Vec<ActionResult>) {
        self.sub_results.extend(results);
    }
}

/// Outcome of an awaited promise, delivered to its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromiseResult {
    /// The action failed.
    Failed,
    /// The action succeeded with no payload.
    Empty,
    /// The action succeeded with a payload.
    Value(Vec<u8>),
}

/// A queued deferred action, with an optional callback into the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promise {
    /// The contract that queued the action.
    pub predecessor: Address,
    /// The account the action targets.
    pub receiver: Address,
    /// The queued action.
    pub action: Action,
    /// Callback to run on the issuer once the action settles. Always a
    /// `FunctionCall` when present.
    pub callback: Option<Action>,
}

/// Per-call context the host passes into an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// True when this call is a promise callback.
    pub is_callback: bool,
    /// Result of the awaited promise, when `is_callback` is true.
    pub promise_result: Option<PromiseResult>,
}
