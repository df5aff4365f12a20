// 配置生成：构造 -> 并发解析订阅与规则集 -> 合并到基础配置
use crate::config::GenerationConfig;
use crate::error::{Result, SubgenError};
use crate::filter::Labeled;
use crate::node::CanonicalNode;
use crate::policy_group::{PolicyGroupDescriptor, PolicyGroupSpec};
use crate::resource_cache::ResourceCache;
use crate::rules::{CanonicalRule, RuleSetResource};
use crate::subscription::Subscription;
use futures::future::try_join_all;
use log::info;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// 合并后的节点条目
#[derive(Debug, Clone)]
pub struct ProxyEntry {
    pub tag: String,
    pub name: String,
    pub body: Value,
}

impl ProxyEntry {
    pub fn from_node(node: &CanonicalNode) -> Result<Self> {
        Ok(Self {
            tag: node.tag().to_string(),
            name: node.name().to_string(),
            body: serde_yaml::to_value(node)?,
        })
    }

    /// 基础配置中的节点，标签为空
    pub fn from_base(body: Value) -> Result<Self> {
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SubgenError::Config("Base proxy has no name".to_string()))?
            .to_string();
        Ok(Self {
            tag: String::new(),
            name,
            body,
        })
    }
}

impl Labeled for ProxyEntry {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 订阅与规则集解析结果
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub nodes: Vec<CanonicalNode>,
    pub rules: Vec<CanonicalRule>,
}

/// 一次运行的全部工作，构造阶段完成所有配置检查
pub struct GenerationPlan {
    cache: ResourceCache,
    subscriptions: Vec<Subscription>,
    groups: Vec<PolicyGroupSpec>,
    rulesets: Vec<RuleSetResource>,
}

impl GenerationPlan {
    pub fn new(config: &GenerationConfig, cache: ResourceCache) -> Result<Self> {
        let subscriptions = config
            .subscriptions
            .iter()
            .map(Subscription::from_config)
            .collect::<Result<Vec<_>>>()?;
        let groups = config
            .proxy_groups
            .iter()
            .map(PolicyGroupSpec::from_config)
            .collect::<Result<Vec<_>>>()?;
        let rulesets = config
            .rulesets
            .iter()
            .map(RuleSetResource::from_config)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            cache,
            subscriptions,
            groups,
            rulesets,
        })
    }

    /// 并发解析，任一失败即整体失败
    pub async fn resolve(&self) -> Result<Resolved> {
        let cache = &self.cache;
        let subscriptions = try_join_all(self.subscriptions.iter().map(|s| s.resolve(cache)));
        let rulesets = try_join_all(self.rulesets.iter().map(|r| r.resolve(cache)));
        let (nodes, rules) = futures::try_join!(subscriptions, rulesets)?;

        Ok(Resolved {
            nodes: nodes.into_iter().flatten().collect(),
            rules: rules.into_iter().flatten().collect(),
        })
    }

    /// 把节点、策略组和规则写入基础配置
    pub fn assemble(&self, mut base: Mapping, resolved: &Resolved) -> Result<Mapping> {
        let mut universe = Vec::new();
        if let Some(proxies) = base.get("proxies").and_then(Value::as_sequence) {
            for proxy in proxies {
                universe.push(ProxyEntry::from_base(proxy.clone())?);
            }
        }
        for node in &resolved.nodes {
            universe.push(ProxyEntry::from_node(node)?);
        }

        let groups: Vec<PolicyGroupDescriptor> =
            self.groups.iter().map(|g| g.build(&universe)).collect();
        let rules: Vec<Value> = resolved
            .rules
            .iter()
            .map(|r| Value::String(r.to_string()))
            .collect();

        info!(
            "Assembled {} proxies, {} proxy groups, {} rules",
            universe.len(),
            groups.len(),
            rules.len()
        );

        base.insert(
            Value::from("proxies"),
            Value::Sequence(universe.into_iter().map(|p| p.body).collect()),
        );
        base.insert(Value::from("proxy-groups"), serde_yaml::to_value(&groups)?);
        base.insert(Value::from("rules"), Value::Sequence(rules));
        Ok(base)
    }
}

/// 读取基础配置，未指定时为空文档
pub fn load_base(path: Option<&Path>) -> Result<Mapping> {
    match path {
        Some(path) => {
            info!("Loading base config: {}", path.display());
            let content = fs::read_to_string(path)?;
            match serde_yaml::from_str::<Value>(&content)? {
                Value::Mapping(mapping) => Ok(mapping),
                Value::Null => Ok(Mapping::new()),
                _ => Err(SubgenError::Config(format!(
                    "Base config {} is not a mapping",
                    path.display()
                ))),
            }
        }
        None => Ok(Mapping::new()),
    }
}

/// 完整生成流程
pub async fn generate(config: &GenerationConfig, base: Option<&Path>, output: &Path) -> Result<()> {
    let cache = ResourceCache::new(&config.cache.dir, config.fetch_timeout())?;
    let plan = GenerationPlan::new(config, cache)?;
    let base = load_base(base.or(config.base.as_deref()))?;

    let resolved = plan.resolve().await?;
    let document = plan.assemble(base, &resolved)?;

    fs::write(output, serde_yaml::to_string(&Value::Mapping(document))?)?;
    info!("Configuration written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::config::{CacheConfig, ProxyGroupConfig, RuleSetConfig, SubscriptionConfig};
    use tempfile::TempDir;

    fn local_config(dir: &TempDir) -> GenerationConfig {
        let nodes = [
            "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#HK-01",
            "trojan://secret@example.com:443?sni=example.com#US-01",
            "vmess://unsupported",
        ];
        fs::write(dir.path().join("sub.txt"), codec::encode_standard(nodes.join("\n"))).unwrap();
        fs::write(dir.path().join("domains.txt"), "+.example.com\nplain.com\n").unwrap();

        let path = |name: &str| dir.path().join(name).display().to_string();
        GenerationConfig {
            cache: CacheConfig {
                dir: dir.path().join("cache"),
                timeout_secs: 5,
            },
            subscriptions: vec![SubscriptionConfig {
                tag: "airport".to_string(),
                url: path("sub.txt"),
                cache: 60,
                resource_type: Some("local".to_string()),
                proxy: None,
            }],
            proxy_groups: vec![
                serde_json::from_str::<ProxyGroupConfig>(
                    r#"{"type": "select", "name": "HK", "filters": [{"type": "name", "regex": "HK"}]}"#,
                )
                .unwrap(),
                serde_json::from_str::<ProxyGroupConfig>(
                    r#"{"type": "select", "name": "Proxy", "filters": [{"type": "tag"}], "includes": ["HK", "DIRECT"]}"#,
                )
                .unwrap(),
            ],
            rulesets: vec![
                RuleSetConfig {
                    rule_type: "domain".to_string(),
                    url: Some(path("domains.txt")),
                    params: None,
                    target: "Proxy".to_string(),
                    cache: 60,
                    resource_type: Some("local".to_string()),
                    proxy: None,
                },
                serde_json::from_str::<RuleSetConfig>(r#"{"type": "match", "target": "Proxy"}"#)
                    .unwrap(),
            ],
            ..GenerationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_merges_into_base() {
        let dir = TempDir::new().unwrap();
        let config = local_config(&dir);
        let base = dir.path().join("base.yaml");
        fs::write(
            &base,
            "port: 7890\nproxies:\n  - {name: Home, type: socks5, server: 10.0.0.1, port: 1080}\n",
        )
        .unwrap();
        let output = dir.path().join("out.yaml");

        generate(&config, Some(&base), &output).await.unwrap();

        let doc: Value = serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(doc["port"].as_u64(), Some(7890));

        let names: Vec<&str> = doc["proxies"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Home", "HK-01", "US-01"]);

        let groups = doc["proxy-groups"].as_sequence().unwrap();
        let members = |i: usize| -> Vec<&str> {
            groups[i]["proxies"]
                .as_sequence()
                .unwrap()
                .iter()
                .map(|p| p.as_str().unwrap())
                .collect()
        };
        assert_eq!(members(0), vec!["HK-01"]);
        // 默认 include 匹配所有标签，包括基础配置中的空标签
        assert_eq!(members(1), vec!["Home", "HK-01", "US-01", "HK", "DIRECT"]);

        let rules: Vec<&str> = doc["rules"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|r| r.as_str().unwrap())
            .collect();
        assert_eq!(
            rules,
            vec!["DOMAIN-SUFFIX,example.com,Proxy", "DOMAIN,plain.com,Proxy", "MATCH,Proxy"]
        );
    }

    #[test]
    fn test_config_errors_before_any_fetch() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.proxy_groups.push(
            serde_json::from_str(r#"{"type": "fallback", "name": "F"}"#).unwrap(),
        );
        let cache = ResourceCache::new(dir.path().join("cache"), config.fetch_timeout()).unwrap();

        assert!(matches!(
            GenerationPlan::new(&config, cache),
            Err(SubgenError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_resource_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.rulesets[0].url = Some(dir.path().join("absent.txt").display().to_string());
        let output = dir.path().join("out.yaml");

        let result = generate(&config, None, &output).await;
        assert!(matches!(result, Err(SubgenError::Resource { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_base_proxy_requires_name() {
        let body: Value = serde_yaml::from_str("{type: socks5}").unwrap();
        assert!(ProxyEntry::from_base(body).is_err());
        assert!(load_base(None).unwrap().is_empty());
    }
}
