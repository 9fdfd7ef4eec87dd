//! Formatting helpers for hashes, addresses and explorer links.

/// `0x12345678...9abcdef0`
pub fn short_hash(hash: &str) -> String {
    abbreviate(hash, 10, 8)
}

/// `0x1234...abcd`
pub fn format_address(address: &str) -> String {
    abbreviate(address, 6, 4)
}

pub fn explorer_tx_url(base_url: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", base_url.trim_end_matches('/'), tx_hash)
}

pub fn explorer_address_url(base_url: &str, address: &str) -> String {
    format!("{}/address/{}", base_url.trim_end_matches('/'), address)
}

fn abbreviate(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= head + tail {
        return value.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}
