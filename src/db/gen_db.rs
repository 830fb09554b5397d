use crate::{
    account::{Account, AccountInfo, AccountStatus},
    code::{analysis::AnalysisCache, Code},
    constants::{DEFAULT_ANALYSIS_CACHE_WEIGHT, EMPTY_CODE_HASH},
    db::{
        cache::{self, CacheDB},
        Database,
    },
    errors::{DatabaseError, InternalError},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Net effect of a transaction batch on one account, in the shape hosts
/// fold back into their own state representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: Address,
    pub removed: bool,
    pub info: Option<AccountInfo>,
    pub added_storage: BTreeMap<H256, U256>,
    pub code: Option<Bytes>,
}

/// The store handle plus the transaction-scoped account cache. All reads go
/// through the cache; all writes live only in the cache until the host
/// extracts them.
pub struct GeneralizedDatabase {
    pub store: Arc<dyn Database>,
    pub current_accounts_state: CacheDB,
    /// Decoded and analyzed code, keyed by code hash.
    code_cache: FxHashMap<H256, Code>,
    /// Jump-target analyses shared across VM instances and threads.
    pub analysis_cache: Arc<AnalysisCache>,
    /// Newly deployed code, to be reported in account updates.
    new_codes: FxHashMap<H256, Bytes>,
    /// Pre-transaction snapshot taken by the backup hook.
    pub tx_backup: Option<CacheDB>,
}

impl GeneralizedDatabase {
    pub fn new(store: Arc<dyn Database>, cache: CacheDB) -> Self {
        Self::with_analysis_cache(
            store,
            cache,
            Arc::new(AnalysisCache::new(DEFAULT_ANALYSIS_CACHE_WEIGHT)),
        )
    }

    /// Share one analysis cache between databases serving parallel
    /// transactions.
    pub fn with_analysis_cache(
        store: Arc<dyn Database>,
        cache: CacheDB,
        analysis_cache: Arc<AnalysisCache>,
    ) -> Self {
        Self {
            store,
            current_accounts_state: cache,
            code_cache: FxHashMap::default(),
            analysis_cache,
            new_codes: FxHashMap::default(),
            tx_backup: None,
        }
    }

    /// Account lookup through the cache, loading (and caching) from the
    /// store on a miss. Missing accounts materialize as empty.
    pub fn get_account(&mut self, address: Address) -> Result<&Account, DatabaseError> {
        self.load_account(address)?;
        cache::get_account(&self.current_accounts_state, &address)
            .ok_or_else(|| DatabaseError::Custom("account vanished from cache".to_string()))
    }

    pub(crate) fn load_account(&mut self, address: Address) -> Result<(), DatabaseError> {
        if !cache::is_account_cached(&self.current_accounts_state, &address) {
            let account = match self.store.get_account_info(address)? {
                Some(info) => Account {
                    info,
                    storage: BTreeMap::new(),
                    status: AccountStatus::Unmodified,
                },
                None => Account::default(),
            };
            cache::insert_account(&mut self.current_accounts_state, address, account);
        }
        Ok(())
    }

    /// Whether the account exists in the world state at all. Pre-Spurious
    /// Dragon call costing distinguishes nonexistent accounts from existing
    /// empty ones.
    pub fn account_exists(&mut self, address: Address) -> Result<bool, DatabaseError> {
        if let Some(account) = cache::get_account(&self.current_accounts_state, &address) {
            if !account.is_unmodified() || !account.is_empty() {
                return Ok(true);
            }
        }
        Ok(self.store.get_account_info(address)?.is_some())
    }

    /// Code of an account by hash, decoded and jump-analyzed once.
    pub fn get_code(&mut self, code_hash: H256) -> Result<Code, DatabaseError> {
        if code_hash == EMPTY_CODE_HASH {
            return Ok(Code::default());
        }
        if let Some(code) = self.code_cache.get(&code_hash) {
            return Ok(code.clone());
        }
        let bytes = self.store.get_account_code(code_hash)?;
        let code = Code::from_bytecode_cached(bytes, &self.analysis_cache);
        self.code_cache.insert(code_hash, code.clone());
        Ok(code)
    }

    /// Code of the account at `address`.
    pub fn get_account_code(&mut self, address: Address) -> Result<Code, DatabaseError> {
        let code_hash = self.get_account(address)?.info.code_hash;
        self.get_code(code_hash)
    }

    /// Register freshly deployed code so later frames (and the final
    /// account updates) can see it.
    pub fn insert_code(&mut self, code: Code) {
        self.new_codes.insert(code.hash, code.bytecode.clone());
        self.code_cache.insert(code.hash, code);
    }

    /// Restore the pre-transaction cache snapshot taken by the backup hook.
    pub fn undo_last_transaction(&mut self) -> Result<(), InternalError> {
        let backup = self
            .tx_backup
            .take()
            .ok_or_else(|| InternalError::Custom("no transaction backup to restore".to_string()))?;
        self.current_accounts_state = backup;
        Ok(())
    }

    /// Fold the cache into per-account net updates for the host.
    pub fn account_updates(&self) -> Vec<AccountUpdate> {
        let mut updates = Vec::new();
        for (address, account) in &self.current_accounts_state {
            if account.is_unmodified() {
                continue;
            }
            let removed = matches!(account.status, AccountStatus::Destroyed)
                || account.is_empty() && account.storage.is_empty();
            let code = self.new_codes.get(&account.info.code_hash).cloned();
            updates.push(AccountUpdate {
                address: *address,
                removed,
                info: (!removed).then_some(account.info),
                added_storage: account.storage.clone(),
                code,
            });
        }
        updates
    }
}
