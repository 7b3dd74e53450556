/// Ledger amounts and fee floors
///
/// Values are counted in the smallest indivisible unit, as Bitcoin counts
/// satoshis.

/// Outputs and fees below this value are treated as dust
pub const DUST_THRESHOLD: u64 = 546;

/// Lowest fee the wallet accepts when building a transaction
pub const MIN_TRANSACTION_FEE: u64 = DUST_THRESHOLD;

/// Sequence number stamped on every input the wallet builds
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

/// Version written into new blocks and transactions
pub const CURRENT_VERSION: u32 = 1;

/// Returns true when `fee` meets `minimum`
pub fn meets_fee_floor(fee: u64, minimum: u64) -> bool {
    fee >= minimum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_floor() {
        assert!(meets_fee_floor(546, MIN_TRANSACTION_FEE));
        assert!(!meets_fee_floor(545, MIN_TRANSACTION_FEE));
    }
}
