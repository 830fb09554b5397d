//! Helpers over the transaction-scoped account cache.

use crate::account::Account;
use ethereum_types::Address;
use rustc_hash::FxHashMap;

pub type CacheDB = FxHashMap<Address, Account>;

pub fn get_account<'a>(cache: &'a CacheDB, address: &Address) -> Option<&'a Account> {
    cache.get(address)
}

pub fn get_account_mut<'a>(cache: &'a mut CacheDB, address: &Address) -> Option<&'a mut Account> {
    cache.get_mut(address)
}

pub fn insert_account(cache: &mut CacheDB, address: Address, account: Account) {
    cache.insert(address, account);
}

pub fn remove_account(cache: &mut CacheDB, address: &Address) -> Option<Account> {
    cache.remove(address)
}

pub fn is_account_cached(cache: &CacheDB, address: &Address) -> bool {
    cache.contains_key(address)
}
