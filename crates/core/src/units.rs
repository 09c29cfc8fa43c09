//! Wei to ether formatting.

/// Wei per ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

const ETHER_DECIMALS: usize = 18;

/// Formats a wei amount as a decimal ether string.
///
/// Output always carries a fractional part and never trailing zeros beyond
/// the first: `0` → `"0.0"`, `1.5e18` → `"1.5"`, `1` → `"0.000000000000000001"`.
pub fn format_ether(wei: u128) -> String {
	let whole = wei / WEI_PER_ETHER;
	let frac = wei % WEI_PER_ETHER;
	let frac = format!("{frac:0width$}", width = ETHER_DECIMALS);
	let frac = frac.trim_end_matches('0');
	if frac.is_empty() {
		format!("{whole}.0")
	} else {
		format!("{whole}.{frac}")
	}
}
