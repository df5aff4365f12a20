use std::fmt;

/// 规则匹配类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Domain,
    DomainSuffix,
    IpCidr,
    IpCidr6,
    Match,
    /// 原样透传的类型，例如 `DOMAIN-KEYWORD`、`GEOIP`
    Raw(String),
}

impl RuleKind {
    pub fn as_str(&self) -> &str {
        match self {
            RuleKind::Domain => "DOMAIN",
            RuleKind::DomainSuffix => "DOMAIN-SUFFIX",
            RuleKind::IpCidr => "IP-CIDR",
            RuleKind::IpCidr6 => "IP-CIDR6",
            RuleKind::Match => "MATCH",
            RuleKind::Raw(kind) => kind,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规范化规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRule {
    kind: RuleKind,
    param: Option<String>,
    target: String,
}

impl CanonicalRule {
    pub fn new(kind: RuleKind, param: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind,
            param: Some(param.into()),
            target: target.into(),
        }
    }

    /// MATCH 是唯一没有参数的规则
    pub fn match_all(target: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Match,
            param: None,
            target: target.into(),
        }
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// `KIND,PARAM,TARGET` 或 `KIND,TARGET`
impl fmt::Display for CanonicalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{},{},{}", self.kind, param, self.target),
            None => write!(f, "{},{}", self.kind, self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_line_format() {
        let rule = CanonicalRule::new(RuleKind::DomainSuffix, "example.com", "PROXY");
        assert_eq!(rule.to_string(), "DOMAIN-SUFFIX,example.com,PROXY");

        let rule = CanonicalRule::new(RuleKind::Raw("GEOIP".to_string()), "CN", "DIRECT");
        assert_eq!(rule.to_string(), "GEOIP,CN,DIRECT");

        let rule = CanonicalRule::match_all("Final");
        assert_eq!(rule.param(), None);
        assert_eq!(rule.to_string(), "MATCH,Final");
    }
}
