// ShadowsocksR 链接
// ssr://base64url(server:port:protocol:cipher:obfs:base64url(password)/?obfsparam=..&protoparam=..&remarks=..)
use super::{check_allowed, CanonicalNode, NodeDecodeError, NodeProtocol, Scheme};
use crate::codec;
use std::collections::HashMap;

pub const SUPPORTED_CIPHERS: [&str; 6] = [
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "rc4-md5",
    "chacha20-ietf",
    "xchacha20",
];

pub const SUPPORTED_OBFS: [&str; 6] = [
    "plain",
    "http_simple",
    "http_post",
    "random_head",
    "tls1.2_ticket_auth",
    "tls1.2_ticket_fastauth",
];

pub const SUPPORTED_PROTOCOLS: [&str; 6] = [
    "origin",
    "auth_sha1_v4",
    "auth_aes128_md5",
    "auth_aes128_sha1",
    "auth_chain_a",
    "auth_chain_b",
];

const SCHEME: Scheme = Scheme::ShadowsocksR;

fn decode_field(field: &'static str, value: &str) -> Result<String, NodeDecodeError> {
    codec::decode_url_safe_str(value).map_err(|source| NodeDecodeError::Base64 {
        scheme: SCHEME,
        field,
        source,
    })
}

pub fn decode(link: &str) -> Result<CanonicalNode, NodeDecodeError> {
    let payload = link
        .strip_prefix("ssr://")
        .ok_or_else(|| NodeDecodeError::malformed(SCHEME, "missing ssr:// prefix"))?;
    let content = decode_field("payload", payload)?;

    let (location, query) = match content.split_once('?') {
        Some((location, query)) => (location.trim_end_matches('/'), query),
        None => (content.trim_end_matches('/'), ""),
    };

    // 从右侧切分，IPv6 地址中的冒号留在 server 中
    let fields: Vec<&str> = location.rsplitn(6, ':').collect();
    let &[password, obfs, cipher, protocol, port, server] = fields.as_slice() else {
        return Err(NodeDecodeError::malformed(
            SCHEME,
            format!("expected 6 fields in {}", location),
        ));
    };
    let port: u16 = port
        .parse()
        .map_err(|_| NodeDecodeError::malformed(SCHEME, format!("invalid port {}", port)))?;
    let server = server.trim_start_matches('[').trim_end_matches(']');

    let params: HashMap<&str, &str> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    let optional = |key: &str, field: &'static str| -> Result<Option<String>, NodeDecodeError> {
        match params.get(key) {
            Some(value) if !value.is_empty() => decode_field(field, value).map(Some),
            _ => Ok(None),
        }
    };

    let name = optional("remarks", "remarks")?.unwrap_or_default();
    let obfs_param = optional("obfsparam", "obfsparam")?;
    let protocol_param = optional("protoparam", "protoparam")?;

    CanonicalNode::new(
        name,
        server,
        port,
        NodeProtocol::ShadowsocksR {
            cipher: cipher.to_string(),
            password: decode_field("password", password)?,
            obfs: obfs.to_string(),
            protocol: protocol.to_string(),
            obfs_param,
            protocol_param,
        },
    )
}

pub(crate) fn validate(
    cipher: &str,
    password: &str,
    obfs: &str,
    protocol: &str,
) -> Result<(), NodeDecodeError> {
    for (field, value) in [
        ("password", password),
        ("cipher", cipher),
        ("obfs", obfs),
        ("protocol", protocol),
    ] {
        if value.is_empty() {
            return Err(NodeDecodeError::MissingField { scheme: SCHEME, field });
        }
    }

    check_allowed(SCHEME, "cipher", cipher, &SUPPORTED_CIPHERS)?;
    check_allowed(SCHEME, "obfs", obfs, &SUPPORTED_OBFS)?;
    check_allowed(SCHEME, "protocol", protocol, &SUPPORTED_PROTOCOLS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::encode_url_safe;

    fn link(location: &str, query: &str) -> String {
        format!("ssr://{}", encode_url_safe(format!("{}/?{}", location, query)))
    }

    #[test]
    fn test_decode_full_link() {
        let location = format!("1.2.3.4:8388:auth_aes128_md5:aes-256-cfb:tls1.2_ticket_auth:{}", encode_url_safe("pw"));
        let query = format!(
            "obfsparam={}&protoparam={}&remarks={}&group={}",
            encode_url_safe("cdn.example.com"),
            encode_url_safe("1234:abcd"),
            encode_url_safe("日本 01"),
            encode_url_safe("grp"),
        );

        let node = decode(&link(&location, &query)).unwrap();
        assert_eq!(node.name(), "日本 01");
        assert_eq!(node.scheme(), Scheme::ShadowsocksR);
        assert_eq!(node.server(), "1.2.3.4");
        assert_eq!(node.port(), 8388);
        assert_eq!(
            node.protocol(),
            &NodeProtocol::ShadowsocksR {
                cipher: "aes-256-cfb".to_string(),
                password: "pw".to_string(),
                obfs: "tls1.2_ticket_auth".to_string(),
                protocol: "auth_aes128_md5".to_string(),
                obfs_param: Some("cdn.example.com".to_string()),
                protocol_param: Some("1234:abcd".to_string()),
            }
        );
    }

    #[test]
    fn test_unpadded_payload() {
        let location = format!("h.example:443:origin:rc4-md5:plain:{}", encode_url_safe("secret"));
        let query = format!("remarks={}", encode_url_safe("n"));
        let unpadded = link(&location, &query).trim_end_matches('=').to_string();

        let node = decode(&unpadded).unwrap();
        assert_eq!(node.server(), "h.example");
        assert!(matches!(
            node.protocol(),
            NodeProtocol::ShadowsocksR { obfs_param: None, protocol_param: None, .. }
        ));
    }

    #[test]
    fn test_ipv6_server() {
        let location = format!("2001:db8::1:443:origin:rc4-md5:plain:{}", encode_url_safe("secret"));
        let query = format!("remarks={}", encode_url_safe("v6"));
        let node = decode(&link(&location, &query)).unwrap();
        assert_eq!(node.server(), "2001:db8::1");
        assert_eq!(node.port(), 443);
    }

    #[test]
    fn test_allow_lists() {
        let pw = encode_url_safe("pw");
        let remarks = format!("remarks={}", encode_url_safe("n"));
        let cases = [
            (format!("h:1:origin:aes-256-gcm:plain:{}", pw), "cipher"),
            (format!("h:1:origin:rc4-md5:tls1.3_fake:{}", pw), "obfs"),
            (format!("h:1:auth_chain_z:rc4-md5:plain:{}", pw), "protocol"),
        ];
        for (location, expected) in cases {
            match decode(&link(&location, &remarks)) {
                Err(NodeDecodeError::NotAllowed { field, .. }) => assert_eq!(field, expected),
                other => panic!("unexpected result for {}: {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_missing_remarks() {
        let location = format!("h:1:origin:rc4-md5:plain:{}", encode_url_safe("pw"));
        assert!(matches!(
            decode(&link(&location, "")),
            Err(NodeDecodeError::MissingField { field: "name", .. })
        ));
    }

    #[test]
    fn test_standard_alphabet_link() {
        // 密码 "a?>" 编码为 "YT8+"，整段编码后包含 '/'
        let location = format!("1.2.3.4:443:origin:rc4-md5:plain:{}", codec::encode_standard("a?>"));
        let query = format!("remarks={}", codec::encode_standard("n"));
        let payload = codec::encode_standard(format!("{}/?{}", location, query));
        assert!(payload.contains('/'));
        let standard = format!("ssr://{}", payload);

        let node = decode(&standard).unwrap();
        assert_eq!(node.name(), "n");
        assert_eq!(node.server(), "1.2.3.4");
        assert!(matches!(
            node.protocol(),
            NodeProtocol::ShadowsocksR { password, .. } if password == "a?>"
        ));
    }

    #[test]
    fn test_too_few_fields() {
        let link = format!("ssr://{}", encode_url_safe("h:1:origin"));
        assert!(matches!(decode(&link), Err(NodeDecodeError::Malformed { .. })));
    }
}
