//! Fork-aware gas schedules.
//!
//! Each fork gets one flat `GasSchedule`; differences between revisions are
//! expressed as struct-update overrides of the previous schedule, never as
//! layered dispatch. Costs that have never changed across forks stay as
//! plain constants in `gas_cost`.
//!
//! Gas-relevant history captured here:
//! - Frontier/Homestead: original costs
//! - Tangerine Whistle (EIP-150): IO repricing, 63/64 rule, selfdestruct cost
//! - Spurious Dragon (EIP-160/161): EXP repricing, empty-account semantics
//! - Istanbul (EIP-1884/2028/2200): SLOAD/BALANCE increases, calldata
//!   discount, net-metered SSTORE
//! - Berlin (EIP-2929): cold/warm access costs
//! - London (EIP-3529): refund cap quotient 5, clears refund 4800, no
//!   selfdestruct refund

use crate::environment::Fork;

#[derive(Debug, Clone, Copy)]
pub struct GasSchedule {
    // Storage
    pub sload: u64,
    pub sstore_set: u64,
    pub sstore_reset: u64,
    pub sstore_clears_refund: u64,

    // Account access
    pub balance: u64,
    pub extcodesize: u64,
    pub extcodecopy_base: u64,
    pub extcodehash: u64,

    // Call family base costs (memory, value and new-account costs come on
    // top and do not vary by fork)
    pub call_base: u64,
    pub call_new_account: u64,

    // Selfdestruct
    pub selfdestruct: u64,
    pub selfdestruct_new_account: u64,
    pub selfdestruct_refund: u64,

    // EXP dynamic cost per exponent byte
    pub exp_byte: u64,

    // Transaction calldata
    pub calldata_zero: u64,
    pub calldata_nonzero: u64,

    // Refund cap: refund <= gas_used / refund_quotient
    pub refund_quotient: u64,

    // Cold/warm access (EIP-2929); meaningful only when has_access_lists
    pub has_access_lists: bool,
    pub cold_sload: u64,
    pub warm_sload: u64,
    pub cold_account_access: u64,
    pub warm_account_access: u64,

    // EIP-150: child calls keep at most 63/64 of remaining gas
    pub has_63_64_rule: bool,
    // EIP-2200/1283 net gas metering for SSTORE
    pub has_net_metering: bool,
}

impl GasSchedule {
    pub const fn for_fork(fork: Fork) -> &'static GasSchedule {
        match fork {
            Fork::Frontier | Fork::Homestead => &FRONTIER_SCHEDULE,
            Fork::TangerineWhistle => &TANGERINE_WHISTLE_SCHEDULE,
            Fork::SpuriousDragon => &SPURIOUS_DRAGON_SCHEDULE,
            Fork::Byzantium | Fork::Petersburg => &BYZANTIUM_SCHEDULE,
            Fork::Constantinople => &CONSTANTINOPLE_SCHEDULE,
            Fork::Istanbul => &ISTANBUL_SCHEDULE,
            Fork::Berlin => &BERLIN_SCHEDULE,
            _ => &LONDON_SCHEDULE,
        }
    }

    /// SLOAD cost, cold/warm aware from Berlin on.
    #[inline]
    pub const fn sload_cost(&self, is_cold: bool) -> u64 {
        if self.has_access_lists {
            if is_cold {
                self.cold_sload
            } else {
                self.warm_sload
            }
        } else {
            self.sload
        }
    }

    /// Account access cost (BALANCE, EXTCODESIZE, ...), cold/warm aware.
    #[inline]
    pub const fn account_access_cost(&self, is_cold: bool, base_cost: u64) -> u64 {
        if self.has_access_lists {
            if is_cold {
                self.cold_account_access
            } else {
                self.warm_account_access
            }
        } else {
            base_cost
        }
    }

    /// Base cost of the CALL family, cold/warm aware.
    #[inline]
    pub const fn call_cost(&self, is_cold: bool) -> u64 {
        if self.has_access_lists {
            if is_cold {
                self.cold_account_access
            } else {
                self.warm_account_access
            }
        } else {
            self.call_base
        }
    }
}

/// Frontier/Homestead (pre-repricing).
pub static FRONTIER_SCHEDULE: GasSchedule = GasSchedule {
    sload: 50,
    sstore_set: 20000,
    sstore_reset: 5000,
    sstore_clears_refund: 15000,

    balance: 20,
    extcodesize: 20,
    extcodecopy_base: 20,
    extcodehash: 20,

    call_base: 40,
    call_new_account: 25000,

    selfdestruct: 0,
    selfdestruct_new_account: 0,
    selfdestruct_refund: 24000,

    exp_byte: 10,

    calldata_zero: 4,
    calldata_nonzero: 68,

    refund_quotient: 2,

    has_access_lists: false,
    cold_sload: 0,
    warm_sload: 0,
    cold_account_access: 0,
    warm_account_access: 0,

    has_63_64_rule: false,
    has_net_metering: false,
};

/// Tangerine Whistle (EIP-150): anti-DoS IO repricing.
pub static TANGERINE_WHISTLE_SCHEDULE: GasSchedule = GasSchedule {
    sload: 200,
    balance: 400,
    extcodesize: 700,
    extcodecopy_base: 700,
    extcodehash: 400,
    call_base: 700,
    selfdestruct: 5000,
    selfdestruct_new_account: 25000,
    has_63_64_rule: true,
    ..FRONTIER_SCHEDULE
};

/// Spurious Dragon (EIP-160/161): EXP repricing.
pub static SPURIOUS_DRAGON_SCHEDULE: GasSchedule = GasSchedule {
    exp_byte: 50,
    ..TANGERINE_WHISTLE_SCHEDULE
};

pub static BYZANTIUM_SCHEDULE: GasSchedule = SPURIOUS_DRAGON_SCHEDULE;

/// Constantinople introduced EIP-1283 net metering (reverted in Petersburg).
pub static CONSTANTINOPLE_SCHEDULE: GasSchedule = GasSchedule {
    has_net_metering: true,
    ..BYZANTIUM_SCHEDULE
};

/// Istanbul (EIP-1884/2028/2200).
pub static ISTANBUL_SCHEDULE: GasSchedule = GasSchedule {
    sload: 800,
    balance: 700,
    extcodehash: 700,
    calldata_nonzero: 16,
    has_net_metering: true,
    ..SPURIOUS_DRAGON_SCHEDULE
};

/// Berlin (EIP-2929/2930): cold/warm access lists.
pub static BERLIN_SCHEDULE: GasSchedule = GasSchedule {
    // Base costs are superseded by cold/warm from here on.
    sload: 0,
    balance: 0,
    extcodesize: 0,
    extcodecopy_base: 0,
    extcodehash: 0,
    call_base: 0,

    sstore_reset: 2900,

    has_access_lists: true,
    cold_sload: 2100,
    warm_sload: 100,
    cold_account_access: 2600,
    warm_account_access: 100,

    ..ISTANBUL_SCHEDULE
};

/// London (EIP-3529) and every later fork.
pub static LONDON_SCHEDULE: GasSchedule = GasSchedule {
    sstore_clears_refund: 4800,
    selfdestruct_refund: 0,
    refund_quotient: 5,
    ..BERLIN_SCHEDULE
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_costs() {
        let schedule = GasSchedule::for_fork(Fork::Frontier);
        assert_eq!(schedule.sload, 50);
        assert_eq!(schedule.balance, 20);
        assert_eq!(schedule.call_base, 40);
        assert!(!schedule.has_63_64_rule);
        assert_eq!(schedule.refund_quotient, 2);
    }

    #[test]
    fn tangerine_whistle_reprices_io() {
        let schedule = GasSchedule::for_fork(Fork::TangerineWhistle);
        assert_eq!(schedule.sload, 200);
        assert_eq!(schedule.call_base, 700);
        assert!(schedule.has_63_64_rule);
        // EXP byte cost changes one fork later.
        assert_eq!(schedule.exp_byte, 10);
        assert_eq!(
            GasSchedule::for_fork(Fork::SpuriousDragon).exp_byte,
            50
        );
    }

    #[test]
    fn petersburg_reverts_constantinople_net_metering() {
        assert!(GasSchedule::for_fork(Fork::Constantinople).has_net_metering);
        assert!(!GasSchedule::for_fork(Fork::Petersburg).has_net_metering);
        assert!(GasSchedule::for_fork(Fork::Istanbul).has_net_metering);
    }

    #[test]
    fn berlin_switches_to_cold_warm() {
        let schedule = GasSchedule::for_fork(Fork::Berlin);
        assert!(schedule.has_access_lists);
        assert_eq!(schedule.sload_cost(true), 2100);
        assert_eq!(schedule.sload_cost(false), 100);
        // Pre-Berlin ignores warmth.
        let istanbul = GasSchedule::for_fork(Fork::Istanbul);
        assert_eq!(istanbul.sload_cost(true), 800);
        assert_eq!(istanbul.sload_cost(false), 800);
    }

    #[test]
    fn london_reduces_refunds() {
        let schedule = GasSchedule::for_fork(Fork::London);
        assert_eq!(schedule.sstore_clears_refund, 4800);
        assert_eq!(schedule.selfdestruct_refund, 0);
        assert_eq!(schedule.refund_quotient, 5);
        assert_eq!(GasSchedule::for_fork(Fork::Berlin).sstore_clears_refund, 15000);
    }
}
