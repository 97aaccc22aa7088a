use std::collections::HashMap;
use std::sync::OnceLock;

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};
use regex::Regex;
use sha2::Sha256;

type Blake2b64 = Blake2b<U8>;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9]+").unwrap())
}

fn tokenize(text: &str) -> Vec<String> {
    token_re().find_iter(&text.to_lowercase()).map(|m| m.as_str().to_string()).collect()
}

/// A 64-bit weighted simhash over `[a-z0-9]+` tokens, one bit per hash output bit.
pub fn simhash64(text: &str) -> u64 {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 0;
    }

    let mut weights: HashMap<String, i64> = HashMap::new();
    for token in tokens {
        *weights.entry(token).or_insert(0) += 1;
    }

    let mut vector = [0i64; 64];
    for (token, weight) in weights {
        let mut hasher = Blake2b64::new();
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();
        let token_hash = u64::from_be_bytes(digest.into());
        for bit in 0..64 {
            if token_hash & (1 << bit) != 0 {
                vector[bit] += weight;
            } else {
                vector[bit] -= weight;
            }
        }
    }

    let mut result: u64 = 0;
    for (bit, value) in vector.iter().enumerate() {
        if *value > 0 {
            result |= 1 << bit;
        }
    }
    result
}

pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Bijective reinterpretation of a u64 bit pattern as a signed i64 (SQLite columns are
/// always signed), matching Python's `value - 2**64` wraparound for values >= 2**63.
pub fn u64_to_i64(value: u64) -> i64 {
    value as i64
}

pub fn i64_to_u64(value: i64) -> u64 {
    value as u64
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Token-set Jaccard similarity over `[a-z0-9]+` tokens.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let a_tokens: std::collections::HashSet<String> = tokenize(a).into_iter().collect();
    let b_tokens: std::collections::HashSet<String> = tokenize(b).into_iter().collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }
    let intersection = a_tokens.intersection(&b_tokens).count();
    let union = a_tokens.union(&b_tokens).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_zero_hamming_distance() {
        let a = simhash64("Magnitude 5.1 earthquake near Oaxaca");
        let b = simhash64("magnitude 5.1 earthquake near oaxaca");
        assert_eq!(hamming_distance(a, b), 0);
    }

    #[test]
    fn bijective_roundtrip_for_high_bit_values() {
        let value: u64 = 1 << 63;
        let signed = u64_to_i64(value);
        assert!(signed < 0);
        assert_eq!(i64_to_u64(signed), value);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        assert_eq!(token_jaccard("alpha beta", "gamma delta"), 0.0);
    }
}
