// 订阅解析：下载 -> base64 解码 -> 逐行解析节点
use crate::codec;
use crate::config::SubscriptionConfig;
use crate::error::{Result, SubgenError};
use crate::node::{decode_link, CanonicalNode};
use crate::resource_cache::{ResourceCache, ResourceSource};
use log::{info, warn};

/// 一个订阅源
#[derive(Debug, Clone)]
pub struct Subscription {
    pub tag: String,
    pub source: ResourceSource,
    pub ttl_secs: u64,
    pub proxy: Option<String>,
}

impl Subscription {
    pub fn from_config(cfg: &SubscriptionConfig) -> Result<Self> {
        if cfg.url.is_empty() {
            return Err(SubgenError::Config(format!(
                "Subscription {} has no url",
                cfg.tag
            )));
        }
        Ok(Self {
            tag: cfg.tag.clone(),
            source: ResourceSource::from_config(cfg.resource_type.as_deref(), &cfg.url)?,
            ttl_secs: cfg.cache,
            proxy: cfg.proxy.clone(),
        })
    }

    /// 下载并解析订阅
    pub async fn resolve(&self, cache: &ResourceCache) -> Result<Vec<CanonicalNode>> {
        info!("开始处理订阅: {}", self.source);
        let body = cache
            .fetch(&self.source, self.ttl_secs, self.proxy.as_deref())
            .await?;
        let text = String::from_utf8_lossy(&body);
        let nodes = self.parse_body(&text)?;
        info!(
            "订阅处理完成: {} (tag: {}), node count: {}",
            self.source,
            self.tag,
            nodes.len()
        );
        Ok(nodes)
    }

    /// 解码订阅正文；单行失败只记录并跳过
    pub fn parse_body(&self, body: &str) -> Result<Vec<CanonicalNode>> {
        let decoded = codec::decode_standard_str(body).map_err(|source| SubgenError::Decode {
            resource: self.source.to_string(),
            source,
        })?;

        let mut nodes = Vec::new();
        for (index, line) in decoded.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match decode_link(line) {
                Ok(node) => {
                    info!("{} 节点 {} 解析成功", node.scheme(), node.name());
                    nodes.push(node.with_tag(self.tag.clone()));
                }
                Err(e) => warn!(
                    "跳过节点: subscription={} line={} reason=\"{}\"",
                    self.tag,
                    index + 1,
                    e
                ),
            }
        }
        Ok(nodes)
    }
}
