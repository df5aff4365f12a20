// 节点模型与分享链接解析
pub mod shadowsocks;
pub mod shadowsocksr;
pub mod trojan;

use crate::codec::DecodeError;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::{Host, Url};

/// 支持的分享链接协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Shadowsocks,
    ShadowsocksR,
    Trojan,
}

impl Scheme {
    pub const ALL: [Scheme; 3] = [Scheme::Shadowsocks, Scheme::ShadowsocksR, Scheme::Trojan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Shadowsocks => "ss",
            Scheme::ShadowsocksR => "ssr",
            Scheme::Trojan => "trojan",
        }
    }

    /// 根据链接前缀识别协议
    pub fn from_link(link: &str) -> Option<Scheme> {
        let (prefix, _) = link.split_once("://")?;
        Self::ALL.into_iter().find(|s| s.as_str() == prefix)
    }

    /// 解析并校验一条分享链接
    pub fn decode(self, link: &str) -> Result<CanonicalNode, NodeDecodeError> {
        match self {
            Scheme::Shadowsocks => shadowsocks::decode(link),
            Scheme::ShadowsocksR => shadowsocksr::decode(link),
            Scheme::Trojan => trojan::decode(link),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单行链接解析失败，调用方跳过该行
#[derive(Error, Debug)]
pub enum NodeDecodeError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("malformed {scheme} link: {reason}")]
    Malformed { scheme: Scheme, reason: String },

    #[error("{scheme} node is missing {field}")]
    MissingField { scheme: Scheme, field: &'static str },

    #[error("{scheme} node does not support {field}: {value}")]
    NotAllowed {
        scheme: Scheme,
        field: &'static str,
        value: String,
    },

    #[error("{scheme} link has an undecodable {field}: {source}")]
    Base64 {
        scheme: Scheme,
        field: &'static str,
        #[source]
        source: DecodeError,
    },
}

impl NodeDecodeError {
    pub(crate) fn malformed(scheme: Scheme, reason: impl ToString) -> Self {
        NodeDecodeError::Malformed {
            scheme,
            reason: reason.to_string(),
        }
    }
}

/// simple-obfs 插件参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginOpts {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// 各协议特有字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum NodeProtocol {
    #[serde(rename = "ss")]
    Shadowsocks {
        cipher: String,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        plugin: Option<String>,
        #[serde(rename = "plugin-opts", skip_serializing_if = "Option::is_none")]
        plugin_opts: Option<PluginOpts>,
    },
    #[serde(rename = "ssr")]
    ShadowsocksR {
        cipher: String,
        password: String,
        obfs: String,
        protocol: String,
        #[serde(rename = "obfs-param", skip_serializing_if = "Option::is_none")]
        obfs_param: Option<String>,
        #[serde(rename = "protocol-param", skip_serializing_if = "Option::is_none")]
        protocol_param: Option<String>,
    },
    #[serde(rename = "trojan")]
    Trojan {
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sni: Option<String>,
        #[serde(rename = "skip-cert-verify", skip_serializing_if = "Option::is_none")]
        skip_cert_verify: Option<bool>,
    },
}

impl NodeProtocol {
    pub fn scheme(&self) -> Scheme {
        match self {
            NodeProtocol::Shadowsocks { .. } => Scheme::Shadowsocks,
            NodeProtocol::ShadowsocksR { .. } => Scheme::ShadowsocksR,
            NodeProtocol::Trojan { .. } => Scheme::Trojan,
        }
    }

    fn validate(&self) -> Result<(), NodeDecodeError> {
        match self {
            NodeProtocol::Shadowsocks { cipher, password, .. } => {
                shadowsocks::validate(cipher, password)
            }
            NodeProtocol::ShadowsocksR {
                cipher,
                password,
                obfs,
                protocol,
                ..
            } => shadowsocksr::validate(cipher, password, obfs, protocol),
            NodeProtocol::Trojan { password, .. } => trojan::validate(password),
        }
    }
}

/// 规范化节点：构造即校验，不存在非法实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalNode {
    #[serde(skip)]
    tag: String,
    name: String,
    #[serde(flatten)]
    protocol: NodeProtocol,
    server: String,
    port: u16,
    udp: bool,
}

impl CanonicalNode {
    pub fn new(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        protocol: NodeProtocol,
    ) -> Result<Self, NodeDecodeError> {
        let scheme = protocol.scheme();
        let name = name.into();
        let server = server.into();

        if name.is_empty() {
            return Err(NodeDecodeError::MissingField { scheme, field: "name" });
        }
        if server.is_empty() {
            return Err(NodeDecodeError::MissingField { scheme, field: "server" });
        }
        if port == 0 {
            return Err(NodeDecodeError::MissingField { scheme, field: "port" });
        }
        protocol.validate()?;

        Ok(Self {
            tag: String::new(),
            name,
            protocol,
            server,
            port,
            udp: true,
        })
    }

    /// 标记节点来源
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> Scheme {
        self.protocol.scheme()
    }

    pub fn protocol(&self) -> &NodeProtocol {
        &self.protocol
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn udp(&self) -> bool {
        self.udp
    }
}

/// 按前缀分发到对应协议解析器
pub fn decode_link(link: &str) -> Result<CanonicalNode, NodeDecodeError> {
    match Scheme::from_link(link) {
        Some(scheme) => scheme.decode(link),
        None => {
            let prefix = link.split_once("://").map_or(link, |(p, _)| p);
            Err(NodeDecodeError::UnsupportedScheme(prefix.to_string()))
        }
    }
}

pub(crate) fn percent_decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// 取主机名，IPv6 去掉方括号
pub(crate) fn host_of(url: &Url) -> String {
    match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    }
}

pub(crate) fn check_allowed(
    scheme: Scheme,
    field: &'static str,
    value: &str,
    allowed: &[&str],
) -> Result<(), NodeDecodeError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(NodeDecodeError::NotAllowed {
            scheme,
            field,
            value: value.to_string(),
        })
    }
}
