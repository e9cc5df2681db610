//! Synchronous chain client: signing, submission and result decoding.

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;
use sandbox_common::crypto::KeyPair;
use sandbox_common::outcome::CallOutcome;
use sandbox_common::rpc::RpcClient;
use sandbox_common::types::{AccountView, Action, Balance, Gas};
use serde_json::Value;

use crate::accounts::{AccountRegistry, Identity};
use crate::bridge::AsyncBridge;
use crate::config::DEFAULT_CALL_GAS;
use crate::error::{HarnessError, HarnessResult};
use crate::handles::{Account, Contract};
use crate::sandbox::Sandbox;

/// Synchronous client for one validator endpoint.
///
/// Composes the execution-context bridge, the account registry and the async
/// RPC client into a call-and-return API. Cheap to clone; clones share the
/// context, the cache and the connection pool. Calls from one thread execute
/// in submission order; calls from different threads are serialized on the
/// shared context.
#[derive(Clone)]
pub struct ChainClient {
    bridge: Arc<AsyncBridge>,
    rpc: Arc<RpcClient>,
    registry: Arc<AccountRegistry>,
}

impl ChainClient {
    /// Client for `endpoint`, signing master operations with
    /// `master_secret_key` (text encoding).
    pub fn new(
        endpoint: &str,
        master_account_id: &str,
        master_secret_key: &str,
    ) -> HarnessResult<Self> {
        Self::with_bridge(
            Arc::new(AsyncBridge::new()?),
            endpoint,
            master_account_id,
            master_secret_key,
        )
    }

    /// Client for a sandbox, using its validator key as the master identity
    /// and sharing its execution context.
    pub fn connect(sandbox: &Sandbox) -> HarnessResult<Self> {
        let key_file = sandbox.validator_key()?;
        let master_account_id = key_file
            .account_id
            .clone()
            .unwrap_or_else(|| sandbox.master_account_id().to_string());
        Self::with_bridge(
            sandbox.bridge(),
            sandbox.rpc_endpoint(),
            &master_account_id,
            &key_file.secret_key,
        )
    }

    fn with_bridge(
        bridge: Arc<AsyncBridge>,
        endpoint: &str,
        master_account_id: &str,
        master_secret_key: &str,
    ) -> HarnessResult<Self> {
        let rpc = Arc::new(RpcClient::new(endpoint)?);
        let master = Identity::new(master_account_id, KeyPair::from_secret_key(master_secret_key)?);
        let registry = Arc::new(AccountRegistry::new(rpc.clone(), master));
        Ok(Self {
            bridge,
            rpc,
            registry,
        })
    }

    /// Master account id of this client.
    pub fn master_account_id(&self) -> String {
        self.registry.master().account_id().to_string()
    }

    /// Endpoint this client talks to.
    pub fn rpc_endpoint(&self) -> String {
        self.rpc.endpoint().to_string()
    }

    /// Submit a signed, state-changing function call and decode its outcome.
    ///
    /// `sender` must be an account this client manages (the master, or one
    /// returned from account creation). A remote execution failure is a
    /// normal [`CallOutcome::Failure`], not an `Err`.
    pub fn call_function(
        &self,
        sender: &str,
        contract: &str,
        method: &str,
        args: Value,
        deposit: Balance,
        gas: Option<Gas>,
    ) -> HarnessResult<CallOutcome> {
        let registry = self.registry.clone();
        let rpc = self.rpc.clone();
        let sender = sender.to_string();
        let contract = contract.to_string();
        let method = method.to_string();

        self.bridge.run(async move {
            let signer = registry.resolve(&sender).await?;
            let action =
                Action::function_call(&method, &args, gas.unwrap_or(DEFAULT_CALL_GAS), deposit);
            let raw = signer.sign_and_submit(&rpc, &contract, vec![action]).await?;
            Ok(CallOutcome::decode(&raw)?)
        })?
    }

    /// Read-only view call; no signature, no execution outcome envelope.
    ///
    /// The result bytes are parsed as JSON where possible, otherwise
    /// returned as a JSON string of the raw text. View failures surface as
    /// errors, since there is no transaction outcome to fall back on.
    pub fn view_function(&self, contract: &str, method: &str, args: Value) -> HarnessResult<Value> {
        let rpc = self.rpc.clone();
        let contract = contract.to_string();
        let method = method.to_string();

        self.bridge.run(async move {
            let view = rpc.view_call(&contract, &method, &args).await?;
            for line in &view.logs {
                debug!("view log: {line}");
            }
            let text = String::from_utf8_lossy(&view.result).into_owned();
            Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        })?
    }

    /// Deploy contract bytecode to a managed account.
    pub fn deploy_contract(&self, account_id: &str, wasm: &[u8]) -> HarnessResult<CallOutcome> {
        let registry = self.registry.clone();
        let rpc = self.rpc.clone();
        let account_id = account_id.to_string();
        let code = BASE64.encode(wasm);

        self.bridge.run(async move {
            let signer = registry.resolve(&account_id).await?;
            let raw = signer
                .sign_and_submit(&rpc, &account_id, vec![Action::DeployContract { code }])
                .await?;
            Ok(CallOutcome::decode(&raw)?)
        })?
    }

    /// Deploy contract bytecode read from a file.
    pub fn deploy_contract_file(
        &self,
        account_id: &str,
        wasm_path: impl AsRef<Path>,
    ) -> HarnessResult<CallOutcome> {
        let wasm = std::fs::read(wasm_path)?;
        self.deploy_contract(account_id, &wasm)
    }

    /// Create a funded account under the master and return its handle.
    ///
    /// The returned handle carries the *generated* id (base name plus a
    /// random disambiguator); keep it if you need a stable reference.
    pub fn create_account(&self, name: &str, balance: Option<Balance>) -> HarnessResult<Account> {
        let registry = self.registry.clone();
        let name = name.to_string();
        let identity = self
            .bridge
            .run(async move { registry.create_account(&name, balance).await })??;
        Ok(Account::new(self.clone(), identity.account_id()))
    }

    /// Cached handle for `account_id`, or a fresh funded account derived
    /// from it as a base name.
    ///
    /// Ids returned from earlier creations hit the cache; anything else is
    /// treated as a base name, so two calls with the same base name yield
    /// two distinct accounts.
    pub fn get_or_create_account(&self, account_id: &str) -> HarnessResult<Account> {
        let registry = self.registry.clone();
        let account_id = account_id.to_string();
        let identity = self
            .bridge
            .run(async move { registry.get_or_create(&account_id).await })??;
        Ok(Account::new(self.clone(), identity.account_id()))
    }

    /// Create a funded subaccount under a managed parent.
    pub fn create_subaccount(
        &self,
        parent_id: &str,
        name: &str,
        balance: Option<Balance>,
    ) -> HarnessResult<Account> {
        let registry = self.registry.clone();
        let parent_id = parent_id.to_string();
        let name = name.to_string();
        let identity = self
            .bridge
            .run(async move { registry.create_subaccount(&parent_id, &name, balance).await })??;
        Ok(Account::new(self.clone(), identity.account_id()))
    }

    /// Transfer tokens between accounts; the sender must be managed.
    pub fn transfer(
        &self,
        sender: &str,
        receiver: &str,
        amount: Balance,
    ) -> HarnessResult<CallOutcome> {
        let registry = self.registry.clone();
        let rpc = self.rpc.clone();
        let sender = sender.to_string();
        let receiver = receiver.to_string();

        self.bridge.run(async move {
            let signer = registry.resolve(&sender).await?;
            let raw = signer
                .sign_and_submit(
                    &rpc,
                    &receiver,
                    vec![Action::Transfer {
                        deposit: amount.to_string(),
                    }],
                )
                .await?;
            Ok(CallOutcome::decode(&raw)?)
        })?
    }

    /// Account metadata for any account id.
    pub fn view_account(&self, account_id: &str) -> HarnessResult<AccountView> {
        let rpc = self.rpc.clone();
        let account_id = account_id.to_string();
        let view = self
            .bridge
            .run(async move { rpc.view_account(&account_id).await })??;
        Ok(view)
    }

    /// Balance of any account, in the smallest unit.
    pub fn balance(&self, account_id: &str) -> HarnessResult<Balance> {
        let view = self.view_account(account_id)?;
        view.balance().ok_or_else(|| {
            HarnessError::Malformed(format!(
                "account {account_id} reported a non-numeric balance"
            ))
        })
    }

    /// Privileged state patch; used by snapshot restores driven through a
    /// client instead of a [`Sandbox`].
    pub fn patch_state(&self, records: &[Value]) -> HarnessResult<()> {
        let rpc = self.rpc.clone();
        let records = records.to_vec();
        self.bridge
            .run(async move { rpc.patch_state(&records).await })?
            .map_err(HarnessError::RestoreFailed)
    }

    /// Handle for an account this client manages.
    pub fn account(&self, account_id: &str) -> Account {
        Account::new(self.clone(), account_id)
    }

    /// Handle for a deployed contract.
    pub fn contract(&self, account_id: &str) -> Contract {
        Contract::new(self.clone(), account_id)
    }
}
