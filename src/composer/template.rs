//! 字符类模板
//!
//! 模板为验证码的每个位置指定一个字符类，之后再由
//! [`Composer::render`](super::Composer::render) 填入具体字符。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::class::CharClass;
use crate::config::OtpConfig;
use crate::error::Error;
use crate::random::{pick_one, random_index, shuffle};

/// 模板构建策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStrategy {
    /// 拒绝采样
    ///
    /// 逐个位置随机抽取字符类，直到抽到尚未达到最少个数的类为止；
    /// 所有最少个数满足后，剩余的尾部位置从填充字符类中选取。
    /// 必需字符总是占据模板前部。
    RejectionSampling,

    /// 随机排列
    ///
    /// 先按最少个数和填充类组成固定多重集，再做一次均匀随机排列。
    /// 每个位置都可能是任意字符类，且没有无界重试。
    #[default]
    Shuffle,
}

impl TemplateStrategy {
    fn as_str(&self) -> &'static str {
        match self {
            TemplateStrategy::RejectionSampling => "rejection_sampling",
            TemplateStrategy::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for TemplateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStrategy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rejection_sampling" | "rejection" => Ok(TemplateStrategy::RejectionSampling),
            "shuffle" => Ok(TemplateStrategy::Shuffle),
            other => Err(Error::invalid_config(
                "template_strategy",
                format!("unknown strategy '{}'", other),
            )),
        }
    }
}

/// 字符类模板
///
/// 每个位置持有一个可选的字符类。由 [`Template::build`] 产生的模板每个位置都已赋值；
/// 未赋值的位置只会来自外部构造，渲染时会被当作内部错误拒绝。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    slots: Vec<Option<CharClass>>,
}

impl Template {
    /// 按配置构建模板
    pub fn build(config: &OtpConfig) -> Self {
        let slots = match config.template_strategy {
            TemplateStrategy::RejectionSampling => rejection_sampling(config),
            TemplateStrategy::Shuffle => shuffled(config),
        };
        Self { slots }
    }

    /// 从字符类列表构造
    pub fn from_classes(classes: impl IntoIterator<Item = CharClass>) -> Self {
        Self {
            slots: classes.into_iter().map(Some).collect(),
        }
    }

    /// 从可能含空位的列表构造
    pub fn from_slots(slots: Vec<Option<CharClass>>) -> Self {
        Self { slots }
    }

    /// 位置数
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否没有位置
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 全部位置
    pub fn slots(&self) -> &[Option<CharClass>] {
        &self.slots
    }

    /// 某字符类出现的次数
    pub fn count(&self, class: CharClass) -> usize {
        self.slots.iter().filter(|s| **s == Some(class)).count()
    }

    /// 是否每个位置都已赋值
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// 是否满足配置中的全部最少个数且长度正确
    pub fn satisfies(&self, config: &OtpConfig) -> bool {
        self.len() == config.code_length
            && self.is_complete()
            && CharClass::ALL
                .iter()
                .all(|class| self.count(*class) >= config.minimum(*class))
    }
}

fn rejection_sampling(config: &OtpConfig) -> Vec<Option<CharClass>> {
    let minimums = config.minimums();
    let mut counts = [0usize; 4];
    let mut slots = vec![None; config.code_length];
    let mut index = 0;

    // 最少个数之和不超过长度（配置已校验），所以 index 不会越界
    while counts != minimums && index < slots.len() {
        let class = CharClass::ALL[random_index(CharClass::ALL.len())];
        if counts[class.index()] < minimums[class.index()] {
            slots[index] = Some(class);
            counts[class.index()] += 1;
            index += 1;
        }
    }

    for slot in &mut slots[index..] {
        *slot = pick_one(&config.default_fill_classes);
    }

    slots
}

fn shuffled(config: &OtpConfig) -> Vec<Option<CharClass>> {
    let mut slots = Vec::with_capacity(config.code_length);

    for class in CharClass::ALL {
        slots.extend(std::iter::repeat_n(Some(class), config.minimum(class)));
    }
    while slots.len() < config.code_length {
        slots.push(pick_one(&config.default_fill_classes));
    }
    slots.truncate(config.code_length);

    shuffle(&mut slots);
    slots
}
