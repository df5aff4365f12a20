// 规则集资源：按约定格式把规则列表转换为规范化规则
use super::rule::{CanonicalRule, RuleKind};
use crate::config::RuleSetConfig;
use crate::error::{Result, SubgenError};
use crate::resource_cache::{ResourceCache, ResourceSource};
use ipnet::{Ipv4Net, Ipv6Net};
use log::{debug, info};
use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr};

/// 规则列表约定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetConvention {
    /// 每行 `KIND,PARAM`
    Classic,
    /// `+.` 前缀为后缀匹配，其余为完整域名
    Domain,
    IpCidr,
    Match,
    /// 其它类型名原样作为规则类型
    Raw(String),
}

impl RuleSetConvention {
    pub fn parse(rule_type: &str) -> Result<Self> {
        match rule_type {
            "" => Err(SubgenError::Config("Rule set type is empty".to_string())),
            "classic" => Ok(RuleSetConvention::Classic),
            "domain" => Ok(RuleSetConvention::Domain),
            "ipcidr" => Ok(RuleSetConvention::IpCidr),
            "match" => Ok(RuleSetConvention::Match),
            other => Ok(RuleSetConvention::Raw(other.to_string())),
        }
    }

    fn needs_resource(&self) -> bool {
        matches!(
            self,
            RuleSetConvention::Classic | RuleSetConvention::Domain | RuleSetConvention::IpCidr
        )
    }
}

/// rule-provider 格式的 YAML 文件
#[derive(Deserialize)]
struct PayloadFile {
    payload: Vec<String>,
}

/// 规则集资源
#[derive(Debug, Clone)]
pub struct RuleSetResource {
    pub convention: RuleSetConvention,
    pub source: Option<ResourceSource>,
    pub params: Vec<String>,
    pub target: String,
    pub ttl_secs: u64,
    pub proxy: Option<String>,
}

impl RuleSetResource {
    pub fn from_config(cfg: &RuleSetConfig) -> Result<Self> {
        let convention = RuleSetConvention::parse(&cfg.rule_type)?;
        if cfg.target.is_empty() {
            return Err(SubgenError::Config(format!(
                "Rule set {} has no target",
                cfg.rule_type
            )));
        }

        let source = match &cfg.url {
            Some(url) if !url.is_empty() => Some(ResourceSource::from_config(
                cfg.resource_type.as_deref(),
                url,
            )?),
            _ => None,
        };
        let params = cfg.params.clone().unwrap_or_default();

        if convention.needs_resource() && source.is_none() {
            return Err(SubgenError::Config(format!(
                "Rule set {} -> {} requires a url",
                cfg.rule_type, cfg.target
            )));
        }
        if matches!(convention, RuleSetConvention::Raw(_)) && source.is_none() && params.is_empty()
        {
            return Err(SubgenError::Config(format!(
                "Rule set {} -> {} has neither url nor params",
                cfg.rule_type, cfg.target
            )));
        }

        Ok(Self {
            convention,
            source,
            params,
            target: cfg.target.clone(),
            ttl_secs: cfg.cache,
            proxy: cfg.proxy.clone(),
        })
    }

    /// 读取规则列表并生成规则
    pub async fn resolve(&self, cache: &ResourceCache) -> Result<Vec<CanonicalRule>> {
        let payload = match (&self.convention, &self.source) {
            (RuleSetConvention::Match, _) | (_, None) => Vec::new(),
            (_, Some(source)) => {
                let body = cache
                    .fetch(source, self.ttl_secs, self.proxy.as_deref())
                    .await?;
                parse_payload(&String::from_utf8_lossy(&body))
            }
        };

        let rules = self.generate(&payload)?;
        info!(
            "Generate rules from {}, TARGET: {}, rule count: {}",
            self.describe(),
            self.target,
            rules.len()
        );
        Ok(rules)
    }

    fn describe(&self) -> String {
        match &self.source {
            Some(source) => source.to_string(),
            None => format!("{:?}", self.params),
        }
    }

    /// 按约定把规则列表转换为规则
    pub fn generate(&self, payload: &[String]) -> Result<Vec<CanonicalRule>> {
        let target = self.target.as_str();
        match &self.convention {
            RuleSetConvention::Classic => payload
                .iter()
                .map(|line| {
                    let mut parts = line.splitn(3, ',');
                    match (parts.next(), parts.next()) {
                        (Some(kind), Some(param)) if !kind.is_empty() => Ok(CanonicalRule::new(
                            RuleKind::Raw(kind.to_string()),
                            param,
                            target,
                        )),
                        _ => Err(SubgenError::Validation(format!(
                            "{}: {} is not a KIND,PARAM rule",
                            self.describe(),
                            line
                        ))),
                    }
                })
                .collect(),
            RuleSetConvention::Domain => Ok(payload
                .iter()
                .map(|line| match line.strip_prefix("+.") {
                    Some(suffix) => CanonicalRule::new(RuleKind::DomainSuffix, suffix, target),
                    None => CanonicalRule::new(RuleKind::Domain, line.as_str(), target),
                })
                .collect()),
            RuleSetConvention::IpCidr => payload
                .iter()
                .map(|line| match classify_cidr(line) {
                    Some(kind) => Ok(CanonicalRule::new(kind, line.as_str(), target)),
                    None => Err(SubgenError::Validation(format!(
                        "{}: {} is not a valid ip address",
                        self.describe(),
                        line
                    ))),
                })
                .collect(),
            RuleSetConvention::Match => Ok(vec![CanonicalRule::match_all(target)]),
            RuleSetConvention::Raw(kind) => {
                let values = if self.source.is_some() {
                    payload
                } else {
                    self.params.as_slice()
                };
                Ok(values
                    .iter()
                    .map(|value| CanonicalRule::new(RuleKind::Raw(kind.clone()), value.as_str(), target))
                    .collect())
            }
        }
    }
}

/// 先按 IPv4 再按 IPv6 解析，主机位不要求为零
fn classify_cidr(literal: &str) -> Option<RuleKind> {
    if literal.parse::<Ipv4Net>().is_ok() || literal.parse::<Ipv4Addr>().is_ok() {
        Some(RuleKind::IpCidr)
    } else if literal.parse::<Ipv6Net>().is_ok() || literal.parse::<Ipv6Addr>().is_ok() {
        Some(RuleKind::IpCidr6)
    } else {
        None
    }
}

/// 解析规则列表：优先 `payload:` YAML，否则按行切分
pub fn parse_payload(body: &str) -> Vec<String> {
    let lines = match serde_yaml::from_str::<PayloadFile>(body) {
        Ok(file) => file.payload,
        Err(e) => {
            debug!("not a payload document ({}), reading as plain text", e);
            body.lines().map(str::to_string).collect()
        }
    };

    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
