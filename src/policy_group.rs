// 策略组生成
use crate::config::ProxyGroupConfig;
use crate::error::{Result, SubgenError};
use crate::filter::{Filter, Labeled};
use log::info;
use serde::Serialize;

const DEFAULT_TEST_INTERVAL: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyGroupKind {
    /// 手动选择
    Select,
    /// 自动测速
    UrlTest {
        url: String,
        interval: u64,
        tolerance: Option<u64>,
    },
}

impl PolicyGroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyGroupKind::Select => "select",
            PolicyGroupKind::UrlTest { .. } => "url-test",
        }
    }
}

/// 输出到配置文件的策略组
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyGroupDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u64>,
    pub proxies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PolicyGroupSpec {
    pub name: String,
    pub kind: PolicyGroupKind,
    pub filters: Vec<Filter>,
    pub includes: Vec<String>,
}

impl PolicyGroupSpec {
    pub fn from_config(cfg: &ProxyGroupConfig) -> Result<Self> {
        if cfg.name.is_empty() {
            return Err(SubgenError::Config("Proxy group has no name".to_string()));
        }

        let kind = match cfg.group_type.as_str() {
            "select" => PolicyGroupKind::Select,
            "url-test" => PolicyGroupKind::UrlTest {
                url: cfg.test_url.clone().filter(|u| !u.is_empty()).ok_or_else(|| {
                    SubgenError::Config(format!("url-test group {} has no test_url", cfg.name))
                })?,
                interval: cfg.interval.unwrap_or(DEFAULT_TEST_INTERVAL),
                tolerance: cfg.tolerance,
            },
            other => {
                return Err(SubgenError::Config(format!(
                    "Unsupported proxy group type {} for {}",
                    other, cfg.name
                )))
            }
        };

        let filters = cfg
            .filters
            .iter()
            .flatten()
            .map(Filter::from_config)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: cfg.name.clone(),
            kind,
            filters,
            includes: cfg.includes.clone().unwrap_or_default(),
        })
    }

    /// 成员：依次通过全部过滤器的节点（保持原顺序），再追加 includes
    ///
    /// 没有过滤器时不选入任何节点。
    pub fn members<N: Labeled>(&self, universe: &[N]) -> Vec<String> {
        let mut selected: Vec<&N> = if self.filters.is_empty() {
            Vec::new()
        } else {
            universe.iter().collect()
        };
        for filter in &self.filters {
            selected.retain(|node| filter.matches(*node));
        }

        selected
            .into_iter()
            .map(|node| node.name().to_string())
            .chain(self.includes.iter().cloned())
            .collect()
    }

    pub fn build<N: Labeled>(&self, universe: &[N]) -> PolicyGroupDescriptor {
        info!("Generation proxy group [{}], type: {}", self.name, self.kind.as_str());
        let proxies = self.members(universe);

        let (url, interval, tolerance) = match &self.kind {
            PolicyGroupKind::Select => (None, None, None),
            PolicyGroupKind::UrlTest {
                url,
                interval,
                tolerance,
            } => (Some(url.clone()), Some(*interval), *tolerance),
        };

        info!(
            "Generate proxy group [{}] success, node count: {}",
            self.name,
            proxies.len()
        );
        PolicyGroupDescriptor {
            name: self.name.clone(),
            kind: self.kind.as_str(),
            url,
            interval,
            tolerance,
            proxies,
        }
    }
}
