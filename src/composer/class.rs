//! 字符类定义
//!
//! 验证码的每一位都属于四个字符类之一，每个字符类对应一个固定字母表。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Error};

/// 大写字母表
pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 小写字母表
pub const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// 数字字母表
pub const DIGITS: &[u8] = b"0123456789";

/// 特殊字符表
///
/// 已签发的验证码依赖这 26 个字节，不能增删或调整。
pub const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{}|;:,.<>?";

/// 字符类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharClass {
    /// 大写字母 A-Z
    #[serde(alias = "uppercase")]
    Upper,
    /// 小写字母 a-z
    #[serde(alias = "lowercase")]
    Lower,
    /// 数字 0-9
    Digit,
    /// 标点符号
    Special,
}

impl CharClass {
    /// 全部字符类，按固定顺序
    pub const ALL: [CharClass; 4] = [
        CharClass::Upper,
        CharClass::Lower,
        CharClass::Digit,
        CharClass::Special,
    ];

    /// 字符类对应的字母表
    pub fn alphabet(&self) -> &'static [u8] {
        match self {
            CharClass::Upper => UPPERCASE,
            CharClass::Lower => LOWERCASE,
            CharClass::Digit => DIGITS,
            CharClass::Special => SPECIAL,
        }
    }

    /// 字符是否属于该字符类
    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.alphabet().contains(&(c as u8))
    }

    /// 返回字符所属的字符类
    pub fn of(c: char) -> Option<CharClass> {
        Self::ALL.into_iter().find(|class| class.contains(c))
    }

    /// 在 [`CharClass::ALL`] 中的位置
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }

    fn as_str(&self) -> &'static str {
        match self {
            CharClass::Upper => "upper",
            CharClass::Lower => "lower",
            CharClass::Digit => "digit",
            CharClass::Special => "special",
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upper" | "uppercase" => Ok(CharClass::Upper),
            "lower" | "lowercase" => Ok(CharClass::Lower),
            "digit" | "digits" => Ok(CharClass::Digit),
            "special" => Ok(CharClass::Special),
            other => Err(ConfigError::InvalidValue {
                key: "char_class".to_string(),
                message: format!("unknown character class '{}'", other),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_sizes() {
        assert_eq!(UPPERCASE.len(), 26);
        assert_eq!(LOWERCASE.len(), 26);
        assert_eq!(DIGITS.len(), 10);
        assert_eq!(SPECIAL.len(), 26);
    }

    #[test]
    fn test_special_alphabet_is_exact() {
        assert_eq!(SPECIAL, "!@#$%^&*()-_=+[]{}|;:,.<>?".as_bytes());
    }

    #[test]
    fn test_alphabets_are_disjoint() {
        for a in CharClass::ALL {
            for b in CharClass::ALL {
                if a == b {
                    continue;
                }
                assert!(a.alphabet().iter().all(|c| !b.alphabet().contains(c)));
            }
        }
    }

    #[test]
    fn test_of() {
        assert_eq!(CharClass::of('Q'), Some(CharClass::Upper));
        assert_eq!(CharClass::of('q'), Some(CharClass::Lower));
        assert_eq!(CharClass::of('7'), Some(CharClass::Digit));
        assert_eq!(CharClass::of('?'), Some(CharClass::Special));
        assert_eq!(CharClass::of('~'), None);
        assert_eq!(CharClass::of('é'), None);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, class) in CharClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("upper".parse::<CharClass>().unwrap(), CharClass::Upper);
        assert_eq!(" Lowercase ".parse::<CharClass>().unwrap(), CharClass::Lower);
        assert_eq!("digits".parse::<CharClass>().unwrap(), CharClass::Digit);
        assert_eq!(CharClass::Special.to_string(), "special");
        assert!("emoji".parse::<CharClass>().unwrap_err().is_config());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&CharClass::Upper).unwrap();
        assert_eq!(json, "\"upper\"");
        let class: CharClass = serde_json::from_str("\"lowercase\"").unwrap();
        assert_eq!(class, CharClass::Lower);
    }
}
