//! 安全随机数生成模块
//!
//! 提供验证码生成与存储所需的随机数功能。
//!
//! 所有函数都使用密码学安全的随机数生成器：
//! - `rand::rng()`：线程本地 CSPRNG（ChaCha，由操作系统熵源定期重新播种）
//! - `OsRng`：直接读取操作系统熵源

use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, TryRngCore, rngs::OsRng};

use crate::error::{Error, Result};

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Example
///
/// ```rust
/// use otprs::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(16).unwrap();
/// assert_eq!(bytes.len(), 16);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::internal(format!("random number generation failed: {:?}", e)))?;
    Ok(bytes)
}

/// 生成指定长度的十六进制随机字符串
///
/// 最终字符串长度为字节数的两倍。
///
/// ```rust
/// use otprs::random::generate_random_hex;
///
/// let hex = generate_random_hex(12).unwrap();
/// assert_eq!(hex.len(), 24);
/// ```
pub fn generate_random_hex(byte_length: usize) -> Result<String> {
    let bytes = generate_random_bytes(byte_length)?;
    Ok(hex_encode(&bytes))
}

/// 从切片中均匀随机选取一个元素
///
/// 切片为空时返回 `None`。
pub fn pick_one<T: Copy>(items: &[T]) -> Option<T> {
    items.choose(&mut rand::rng()).copied()
}

/// 从字节字母表中均匀随机选取一个字符
pub fn pick_char(alphabet: &[u8]) -> Option<char> {
    pick_one(alphabet).map(char::from)
}

/// 生成 `[0, upper)` 范围内的随机下标
pub fn random_index(upper: usize) -> usize {
    rand::rng().random_range(0..upper)
}

/// 对切片做均匀随机排列（Fisher-Yates）
pub fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut rand::rng());
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 将字节数组编码为十六进制字符串
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 常量时间比较两个字节切片
///
/// 用于防止时序攻击
///
/// ```rust
/// use otprs::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"aB3$xy", b"aB3$xy"));
/// assert!(!constant_time_compare(b"aB3$xy", b"ab3$xy"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串（区分大小写）
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_random_bytes() {
        let bytes = generate_random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);

        let bytes2 = generate_random_bytes(32).unwrap();
        assert_ne!(bytes, bytes2);
    }

    #[test]
    fn test_generate_random_hex() {
        let hex = generate_random_hex(16).unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_pick_one() {
        let items = [1, 2, 3];
        for _ in 0..50 {
            let v = pick_one(&items).unwrap();
            assert!(items.contains(&v));
        }

        let empty: [u8; 0] = [];
        assert_eq!(pick_one(&empty), None);
    }

    #[test]
    fn test_pick_char_covers_alphabet() {
        let alphabet = b"ab";
        let seen: HashSet<char> = (0..200).filter_map(|_| pick_char(alphabet)).collect();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_random_index() {
        for _ in 0..100 {
            assert!(random_index(4) < 4);
        }
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut items: Vec<u32> = (0..20).collect();
        shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_constant_time_compare_str() {
        assert!(constant_time_compare_str("secret", "secret"));
        assert!(!constant_time_compare_str("secret", "Secret"));
        assert!(!constant_time_compare_str("secret", "secre"));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex_encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }
}
