//! Signing identities and the per-client account cache.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use sandbox_common::crypto::{KeyPair, PublicKey};
use sandbox_common::rpc::RpcClient;
use sandbox_common::types::{Action, Balance, FinalOutcome, Transaction};
use tokio::sync::Mutex;

use crate::config::DEFAULT_ACCOUNT_BALANCE;
use crate::error::{HarnessError, HarnessResult};

/// A signing identity bound to one RPC endpoint.
///
/// Holds the account id, its key pair and the access-key nonce cursor. The
/// cursor is primed lazily from the chain on first use. Identities are never
/// mutated; rotating a key means building a new `Identity` under the same
/// account id.
#[derive(Debug)]
pub struct Identity {
    account_id: String,
    keypair: KeyPair,
    // Next-nonce cache; None until primed from the chain
    nonce: Mutex<Option<u64>>,
}

impl Identity {
    pub(crate) fn new(account_id: impl Into<String>, keypair: KeyPair) -> Self {
        Self {
            account_id: account_id.into(),
            keypair,
            nonce: Mutex::new(None),
        }
    }

    /// Account this identity signs for.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Public half of the identity's key pair.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Sign `actions` against `receiver_id` and submit, returning the raw
    /// execution trace.
    pub(crate) async fn sign_and_submit(
        &self,
        rpc: &RpcClient,
        receiver_id: &str,
        actions: Vec<Action>,
    ) -> HarnessResult<FinalOutcome> {
        let block_hash = rpc.latest_block_hash().await?;
        let nonce = self.next_nonce(rpc).await?;

        let transaction = Transaction {
            signer_id: self.account_id.clone(),
            public_key: self.public_key().to_string(),
            nonce,
            receiver_id: receiver_id.to_string(),
            block_hash,
            actions,
        };
        let signed = transaction.sign(&self.keypair)?;
        Ok(rpc.broadcast_tx_commit(&signed).await?)
    }

    /// Advance the nonce cursor, priming it from the chain the first time.
    async fn next_nonce(&self, rpc: &RpcClient) -> HarnessResult<u64> {
        let mut slot = self.nonce.lock().await;
        let next = match *slot {
            Some(current) => current + 1,
            None => {
                let key = rpc
                    .view_access_key(&self.account_id, &self.public_key().to_string())
                    .await?;
                debug!(
                    "primed nonce for {} at {}",
                    self.account_id, key.nonce
                );
                key.nonce + 1
            }
        };
        *slot = Some(next);
        Ok(next)
    }
}

/// Cache of signing identities keyed by account id.
///
/// Owned by one `ChainClient`; not meant to be shared between independent
/// clients driving the same process.
pub struct AccountRegistry {
    rpc: Arc<RpcClient>,
    master: Arc<Identity>,
    accounts: Mutex<HashMap<String, Arc<Identity>>>,
}

impl AccountRegistry {
    pub(crate) fn new(rpc: Arc<RpcClient>, master: Identity) -> Self {
        let master = Arc::new(master);
        let mut accounts = HashMap::new();
        accounts.insert(master.account_id().to_string(), master.clone());
        Self {
            rpc,
            master,
            accounts: Mutex::new(accounts),
        }
    }

    /// The designated master identity (validator key holder).
    pub(crate) fn master(&self) -> Arc<Identity> {
        self.master.clone()
    }

    /// Identity for an account this client already manages.
    pub(crate) async fn resolve(&self, account_id: &str) -> HarnessResult<Arc<Identity>> {
        self.accounts
            .lock()
            .await
            .get(account_id)
            .cloned()
            .ok_or_else(|| HarnessError::UnknownAccount(account_id.to_string()))
    }

    /// Cached identity for `account_id`, or a freshly created chain account
    /// derived from it as a base name.
    pub(crate) async fn get_or_create(&self, account_id: &str) -> HarnessResult<Arc<Identity>> {
        if let Some(identity) = self.accounts.lock().await.get(account_id).cloned() {
            return Ok(identity);
        }
        self.create_child(self.master.clone(), account_id, None).await
    }

    /// Create a funded account under the master, returning its identity.
    pub(crate) async fn create_account(
        &self,
        name: &str,
        balance: Option<Balance>,
    ) -> HarnessResult<Arc<Identity>> {
        self.create_child(self.master.clone(), name, balance).await
    }

    /// Create a funded account under an arbitrary managed parent.
    pub(crate) async fn create_subaccount(
        &self,
        parent_id: &str,
        name: &str,
        balance: Option<Balance>,
    ) -> HarnessResult<Arc<Identity>> {
        let parent = self.resolve(parent_id).await?;
        self.create_child(parent, name, balance).await
    }

    async fn create_child(
        &self,
        parent: Arc<Identity>,
        name: &str,
        balance: Option<Balance>,
    ) -> HarnessResult<Arc<Identity>> {
        let account_id = derive_child_id(name, parent.account_id());
        self.create_named(parent, account_id.clone(), balance)
            .await
            .map_err(|err| HarnessError::for_account(account_id, err))
    }

    async fn create_named(
        &self,
        parent: Arc<Identity>,
        account_id: String,
        balance: Option<Balance>,
    ) -> HarnessResult<Arc<Identity>> {
        let keypair = KeyPair::generate();
        let deposit = balance.unwrap_or(DEFAULT_ACCOUNT_BALANCE);
        let actions = vec![
            Action::CreateAccount,
            Action::Transfer {
                deposit: deposit.to_string(),
            },
            Action::AddKey {
                public_key: keypair.public_key().to_string(),
            },
        ];

        let raw = parent
            .sign_and_submit(&self.rpc, &account_id, actions)
            .await?;
        let outcome = sandbox_common::outcome::CallOutcome::decode(&raw)?;
        if let sandbox_common::outcome::CallOutcome::Failure(failure) = outcome {
            return Err(HarnessError::ExecutionFailed(failure));
        }

        info!("created account {account_id}");
        let identity = Arc::new(Identity::new(account_id.clone(), keypair));
        self.accounts
            .lock()
            .await
            .insert(account_id, identity.clone());
        Ok(identity)
    }
}

/// Derive a collision-free child account id from a base name.
///
/// The random disambiguator guarantees that repeated calls with the same
/// base name never collide within one process lifetime; callers that need a
/// stable name must keep the returned id.
pub(crate) fn derive_child_id(name: &str, parent_id: &str) -> String {
    format!("{}-{:08x}.{}", name, rand::random::<u32>(), parent_id)
}
