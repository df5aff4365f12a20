// 远程资源下载器和缓存系统
use crate::error::{Result, SubgenError};
use bytes::Bytes;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::fs as async_fs;

/// 资源来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    Url(String),
    Local(PathBuf),
}

impl ResourceSource {
    /// 按配置中的 resource_type 构造来源，缺省为 URL
    pub fn from_config(resource_type: Option<&str>, location: &str) -> Result<Self> {
        match resource_type.unwrap_or("url") {
            "url" | "remote" => Ok(ResourceSource::Url(location.to_string())),
            "local" | "file" => Ok(ResourceSource::Local(PathBuf::from(location))),
            other => Err(SubgenError::Config(format!(
                "Unsupported resource type {} for {}",
                other, location
            ))),
        }
    }
}

impl fmt::Display for ResourceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceSource::Url(url) => write!(f, "{}", url),
            ResourceSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 临时文件序号，同一 URL 的并发写入互不覆盖
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// 资源缓存，每次运行构造一个实例
#[derive(Debug, Clone)]
pub struct ResourceCache {
    cache_dir: PathBuf,
    timeout: Duration,
}

impl ResourceCache {
    /// 创建新的资源缓存
    pub fn new(cache_dir: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        // 确保缓存目录存在
        fs::create_dir_all(&cache_dir)?;

        Ok(Self { cache_dir, timeout })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// URL 对应的缓存键
    pub fn cache_key(url: &str) -> String {
        format!("{:x}", Sha256::digest(url.as_bytes()))
    }

    /// URL 对应的缓存文件路径
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.cache", Self::cache_key(url)))
    }

    /// 读取资源
    ///
    /// 本地文件直接读取，不经过缓存；URL 在 `ttl_secs` 内命中缓存时不访问网络。
    pub async fn fetch(
        &self,
        source: &ResourceSource,
        ttl_secs: u64,
        proxy: Option<&str>,
    ) -> Result<Bytes> {
        match source {
            ResourceSource::Local(path) => {
                debug!("读取本地资源: {}", path.display());
                let content = async_fs::read(path).await.map_err(|e| {
                    SubgenError::resource(path.display().to_string(), e)
                })?;
                Ok(Bytes::from(content))
            }
            ResourceSource::Url(url) => self.fetch_url(url, ttl_secs, proxy).await,
        }
    }

    async fn fetch_url(&self, url: &str, ttl_secs: u64, proxy: Option<&str>) -> Result<Bytes> {
        let cache_file = self.cache_path(url);

        if let Some(content) = self.read_fresh(&cache_file, ttl_secs).await {
            metrics::increment_counter!("subgen_cache_hits_total");
            info!("使用缓存的资源: {}", url);
            return Ok(content);
        }
        metrics::increment_counter!("subgen_cache_misses_total");

        info!("下载资源: {}", url);
        let content = match self.download(url, proxy).await {
            Ok(content) => content,
            Err(e) => {
                metrics::increment_counter!("subgen_fetch_failures_total");
                return Err(e);
            }
        };

        // 先写临时文件再 rename，读者只会看到完整的旧文件或新文件
        if !self.cache_dir.exists() {
            async_fs::create_dir_all(&self.cache_dir).await?;
        }
        let tmp_file = cache_file.with_extension(format!(
            "cache.{}.{}.tmp",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        async_fs::write(&tmp_file, &content).await?;
        if let Err(e) = async_fs::rename(&tmp_file, &cache_file).await {
            let _ = async_fs::remove_file(&tmp_file).await;
            return Err(e.into());
        }

        info!("资源下载完成: {} ({} 字节)", url, content.len());
        Ok(content)
    }

    /// 缓存未过期时返回内容
    async fn read_fresh(&self, cache_file: &Path, ttl_secs: u64) -> Option<Bytes> {
        let metadata = async_fs::metadata(cache_file).await.ok()?;
        let modified = metadata.modified().ok()?;
        // 修改时间在未来时视为刚写入
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= Duration::from_secs(ttl_secs) {
            debug!("缓存已过期: {} ({}s)", cache_file.display(), age.as_secs());
            return None;
        }

        async_fs::read(cache_file).await.ok().map(Bytes::from)
    }

    /// 下载文件
    async fn download(&self, url: &str, proxy: Option<&str>) -> Result<Bytes> {
        // 不读取环境变量中的代理
        let mut builder = reqwest::Client::builder().no_proxy().timeout(self.timeout);
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| SubgenError::Config(format!("Invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| SubgenError::resource(url, e))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| SubgenError::resource(url, e))?;

        if !response.status().is_success() {
            return Err(SubgenError::resource(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| SubgenError::resource(url, e))
    }
}
