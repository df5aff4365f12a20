// 规则集解析
pub mod rule;
pub mod rule_set;

pub use rule::{CanonicalRule, RuleKind};
pub use rule_set::{RuleSetConvention, RuleSetResource};
