//! Test-facing handles for accounts and contracts.
//!
//! Handles are plain values returned to the caller; holding one is the only
//! way to reference a created account, there is no name-keyed global state.
//! Many handles may reference the same underlying identity.

use sandbox_common::outcome::CallOutcome;
use sandbox_common::types::{Balance, Gas};
use serde_json::Value;

use crate::client::ChainClient;
use crate::error::HarnessResult;

/// Handle to an account managed by a [`ChainClient`].
#[derive(Clone)]
pub struct Account {
    client: ChainClient,
    account_id: String,
}

impl Account {
    pub(crate) fn new(client: ChainClient, account_id: &str) -> Self {
        Self {
            client,
            account_id: account_id.to_string(),
        }
    }

    /// Full account id, including any generated disambiguator.
    pub fn id(&self) -> &str {
        &self.account_id
    }

    /// Call a contract method as this account.
    pub fn call(&self, contract_id: &str, method: &str, args: Value) -> HarnessResult<CallOutcome> {
        self.call_with(contract_id, method, args, 0, None)
    }

    /// Call a contract method with an attached deposit and explicit gas.
    pub fn call_with(
        &self,
        contract_id: &str,
        method: &str,
        args: Value,
        deposit: Balance,
        gas: Option<Gas>,
    ) -> HarnessResult<CallOutcome> {
        self.client
            .call_function(&self.account_id, contract_id, method, args, deposit, gas)
    }

    /// View a contract method (read-only, unsigned).
    pub fn view(&self, contract_id: &str, method: &str, args: Value) -> HarnessResult<Value> {
        self.client.view_function(contract_id, method, args)
    }

    /// Deploy contract bytecode to this account.
    pub fn deploy(&self, wasm: &[u8]) -> HarnessResult<CallOutcome> {
        self.client.deploy_contract(&self.account_id, wasm)
    }

    /// Deploy contract bytecode from a file to this account.
    pub fn deploy_file(&self, wasm_path: impl AsRef<std::path::Path>) -> HarnessResult<CallOutcome> {
        self.client.deploy_contract_file(&self.account_id, wasm_path)
    }

    /// Transfer tokens from this account.
    pub fn transfer(&self, receiver_id: &str, amount: Balance) -> HarnessResult<CallOutcome> {
        self.client.transfer(&self.account_id, receiver_id, amount)
    }

    /// Create a funded subaccount of this account.
    pub fn create_subaccount(
        &self,
        name: &str,
        balance: Option<Balance>,
    ) -> HarnessResult<Account> {
        self.client
            .create_subaccount(&self.account_id, name, balance)
    }

    /// Current balance, in the smallest unit.
    pub fn balance(&self) -> HarnessResult<Balance> {
        self.client.balance(&self.account_id)
    }

    /// View this account as a contract handle.
    pub fn as_contract(&self) -> Contract {
        Contract::new(self.client.clone(), &self.account_id)
    }
}

/// Handle to a deployed contract.
///
/// Stateless beyond the account id and client reference; all contract state
/// lives in the remote ledger.
#[derive(Clone)]
pub struct Contract {
    client: ChainClient,
    account_id: String,
}

impl Contract {
    pub(crate) fn new(client: ChainClient, account_id: &str) -> Self {
        Self {
            client,
            account_id: account_id.to_string(),
        }
    }

    /// Account id the contract is deployed on.
    pub fn id(&self) -> &str {
        &self.account_id
    }

    /// Call a method signed by the contract account itself.
    pub fn call(&self, method: &str, args: Value) -> HarnessResult<CallOutcome> {
        self.client
            .call_function(&self.account_id, &self.account_id, method, args, 0, None)
    }

    /// Call a method as another account.
    pub fn call_as(
        &self,
        caller: &Account,
        method: &str,
        args: Value,
    ) -> HarnessResult<CallOutcome> {
        caller.call(&self.account_id, method, args)
    }

    /// Call a method as another account, with deposit and gas.
    pub fn call_as_with(
        &self,
        caller: &Account,
        method: &str,
        args: Value,
        deposit: Balance,
        gas: Option<Gas>,
    ) -> HarnessResult<CallOutcome> {
        caller.call_with(&self.account_id, method, args, deposit, gas)
    }

    /// View a method on this contract.
    pub fn view(&self, method: &str, args: Value) -> HarnessResult<Value> {
        self.client.view_function(&self.account_id, method, args)
    }
}
