// Shadowsocks 链接: ss://base64(cipher:password)@host:port?plugin=...#name
// 不支持 v2ray-plugin 等 websocket 插件
use super::{
    check_allowed, host_of, percent_decode, CanonicalNode, NodeDecodeError, NodeProtocol,
    PluginOpts, Scheme,
};
use crate::codec;
use std::collections::HashMap;
use url::Url;

pub const SUPPORTED_CIPHERS: [&str; 14] = [
    "aes-128-gcm",
    "aes-192-gcm",
    "aes-256-gcm",
    "chacha20-ietf-poly1305",
    "xchacha20-ietf-poly1305",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "rc4-md5",
    "chacha20-ietf",
    "xchacha20",
    "aes-128-ctr",
    "aes-192-ctr",
    "aes-256-ctr",
];

const SCHEME: Scheme = Scheme::Shadowsocks;

pub fn decode(link: &str) -> Result<CanonicalNode, NodeDecodeError> {
    let url = Url::parse(link).map_err(|e| NodeDecodeError::malformed(SCHEME, e))?;

    let userinfo = percent_decode(url.username());
    let credential = codec::decode_standard_str(&userinfo)
        .or_else(|_| codec::decode_url_safe_str(&userinfo))
        .map_err(|source| NodeDecodeError::Base64 {
            scheme: SCHEME,
            field: "credential",
            source,
        })?;
    let (cipher, password) = credential
        .split_once(':')
        .ok_or_else(|| NodeDecodeError::malformed(SCHEME, "credential lacks cipher:password"))?;

    let mut plugin = None;
    let mut plugin_opts = None;
    if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == "plugin") {
        if let Some(opts) = parse_obfs_plugin(&value)? {
            plugin = Some("obfs".to_string());
            plugin_opts = Some(opts);
        }
    }

    let name = url.fragment().map(percent_decode).unwrap_or_default();
    CanonicalNode::new(
        name,
        host_of(&url),
        url.port().unwrap_or(0),
        NodeProtocol::Shadowsocks {
            cipher: cipher.to_string(),
            password: password.to_string(),
            plugin,
            plugin_opts,
        },
    )
}

/// 解析 `simple-obfs;obfs=http;obfs-host=example.com`，其它插件忽略
fn parse_obfs_plugin(value: &str) -> Result<Option<PluginOpts>, NodeDecodeError> {
    if !value.starts_with("simple-obfs") && !value.starts_with("obfs-local") {
        return Ok(None);
    }

    let options: HashMap<&str, &str> = value
        .split(';')
        .skip(1)
        .filter_map(|item| item.split_once('='))
        .collect();

    let mode = options
        .get("obfs")
        .filter(|mode| !mode.is_empty())
        .ok_or(NodeDecodeError::MissingField {
            scheme: SCHEME,
            field: "plugin-opts.mode",
        })?;

    Ok(Some(PluginOpts {
        mode: mode.to_string(),
        host: options.get("obfs-host").map(|h| h.to_string()),
    }))
}

pub(crate) fn validate(cipher: &str, password: &str) -> Result<(), NodeDecodeError> {
    if password.is_empty() {
        return Err(NodeDecodeError::MissingField {
            scheme: SCHEME,
            field: "password",
        });
    }
    if cipher.is_empty() {
        return Err(NodeDecodeError::MissingField {
            scheme: SCHEME,
            field: "cipher",
        });
    }
    check_allowed(SCHEME, "cipher", cipher, &SUPPORTED_CIPHERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_link() {
        let node = decode("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#Node-A").unwrap();
        assert_eq!(node.name(), "Node-A");
        assert_eq!(node.scheme(), Scheme::Shadowsocks);
        assert_eq!(node.server(), "1.2.3.4");
        assert_eq!(node.port(), 8388);
        assert_eq!(
            node.protocol(),
            &NodeProtocol::Shadowsocks {
                cipher: "aes-256-gcm".to_string(),
                password: "pass".to_string(),
                plugin: None,
                plugin_opts: None,
            }
        );
    }

    #[test]
    fn test_credential_round_trip() {
        for credential in ["aes-128-gcm:secret", "chacha20-ietf-poly1305:p@ss:word", "rc4-md5:x"] {
            let link = format!("ss://{}@example.com:443#n", codec::encode_standard(credential));
            let node = decode(&link).unwrap();
            match node.protocol() {
                NodeProtocol::Shadowsocks { cipher, password, .. } => {
                    assert_eq!(format!("{}:{}", cipher, password), credential);
                }
                other => panic!("unexpected protocol: {:?}", other),
            }
        }
    }

    #[test]
    fn test_name_is_percent_decoded() {
        let node = decode("ss://YWVzLTI1Ni1nY206cGFzcw@h.example:1#%E9%A6%99%E6%B8%AF%2001").unwrap();
        assert_eq!(node.name(), "香港 01");
    }

    #[test]
    fn test_simple_obfs_plugin() {
        let link = "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388\
                    ?plugin=simple-obfs%3Bobfs%3Dhttp%3Bobfs-host%3Dcdn.example.com#A";
        let node = decode(link).unwrap();
        match node.protocol() {
            NodeProtocol::Shadowsocks { plugin, plugin_opts, .. } => {
                assert_eq!(plugin.as_deref(), Some("obfs"));
                assert_eq!(
                    plugin_opts,
                    &Some(PluginOpts {
                        mode: "http".to_string(),
                        host: Some("cdn.example.com".to_string()),
                    })
                );
            }
            other => panic!("unexpected protocol: {:?}", other),
        }
    }

    #[test]
    fn test_other_plugins_are_ignored() {
        let link = "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388?plugin=v2ray-plugin%3Bmode%3Dwebsocket#A";
        let node = decode(link).unwrap();
        assert!(matches!(
            node.protocol(),
            NodeProtocol::Shadowsocks { plugin: None, plugin_opts: None, .. }
        ));
    }

    #[test]
    fn test_rejects_unsupported_cipher() {
        let link = format!("ss://{}@1.2.3.4:8388#A", codec::encode_standard("none:pass"));
        match decode(&link) {
            Err(NodeDecodeError::NotAllowed { field, value, .. }) => {
                assert_eq!(field, "cipher");
                assert_eq!(value, "none");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_name_and_password() {
        assert!(matches!(
            decode("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388"),
            Err(NodeDecodeError::MissingField { field: "name", .. })
        ));
        let link = format!("ss://{}@1.2.3.4:8388#A", codec::encode_standard("aes-256-gcm:"));
        assert!(matches!(
            decode(&link),
            Err(NodeDecodeError::MissingField { field: "password", .. })
        ));
    }

    #[test]
    fn test_garbage_credential() {
        assert!(matches!(
            decode("ss://!!!@1.2.3.4:8388#A"),
            Err(NodeDecodeError::Base64 { .. })
        ));
    }
}
