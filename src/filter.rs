// 节点过滤器
use crate::config::FilterConfig;
use crate::error::{Result, SubgenError};
use crate::node::CanonicalNode;
use log::debug;
use regex::Regex;

/// 可参与过滤的节点
pub trait Labeled {
    /// 来源标签，基础配置中的节点为空串
    fn tag(&self) -> &str;
    fn name(&self) -> &str;
}

impl Labeled for CanonicalNode {
    fn tag(&self) -> &str {
        CanonicalNode::tag(self)
    }

    fn name(&self) -> &str {
        CanonicalNode::name(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Tag,
    Name,
}

impl FilterField {
    pub fn parse(field: &str) -> Result<Self> {
        match field {
            "tag" => Ok(FilterField::Tag),
            "name" => Ok(FilterField::Name),
            other => Err(SubgenError::Config(format!(
                "Unsupported filter type: {}",
                other
            ))),
        }
    }
}

/// 正则过滤：字段中存在满足 include 的子串，且不存在满足 exclude 的子串
#[derive(Debug, Clone)]
pub struct Filter {
    field: FilterField,
    include: Regex,
    exclude: Option<Regex>,
}

impl Filter {
    pub fn new(field: FilterField, include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| SubgenError::Config(format!("Invalid filter regex {}: {}", pattern, e)))
        };
        Ok(Self {
            field,
            include: compile(include.unwrap_or(".*"))?,
            exclude: exclude.map(compile).transpose()?,
        })
    }

    pub fn from_config(cfg: &FilterConfig) -> Result<Self> {
        Self::new(
            FilterField::parse(&cfg.filter_type)?,
            cfg.regex.as_deref(),
            cfg.negative_regex.as_deref(),
        )
    }

    pub fn matches<N: Labeled + ?Sized>(&self, node: &N) -> bool {
        let value = match self.field {
            FilterField::Tag => node.tag(),
            FilterField::Name => node.name(),
        };

        let matched = self.include.is_match(value)
            && !self.exclude.as_ref().map_or(false, |re| re.is_match(value));
        debug!(
            "{} {} regex: {} -regex: {:?}",
            value,
            if matched { "satisfies" } else { "does not satisfy" },
            self.include,
            self.exclude.as_ref().map(Regex::as_str)
        );
        matched
    }
}
