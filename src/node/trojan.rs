// Trojan 链接: trojan://password@host:port?sni=...&allowInsecure=0|1#name
// 暂不支持 ws 和 gRPC 传输
use super::{host_of, percent_decode, CanonicalNode, NodeDecodeError, NodeProtocol, Scheme};
use url::Url;

const SCHEME: Scheme = Scheme::Trojan;

pub fn decode(link: &str) -> Result<CanonicalNode, NodeDecodeError> {
    let url = Url::parse(link).map_err(|e| NodeDecodeError::malformed(SCHEME, e))?;

    let mut sni = None;
    let mut skip_cert_verify = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "sni" => sni = Some(value.into_owned()),
            "allowInsecure" => skip_cert_verify = Some(value == "1"),
            _ => {}
        }
    }

    let name = url.fragment().map(percent_decode).unwrap_or_default();
    CanonicalNode::new(
        name,
        host_of(&url),
        url.port().unwrap_or(0),
        NodeProtocol::Trojan {
            password: percent_decode(url.username()),
            sni,
            skip_cert_verify,
        },
    )
}

pub(crate) fn validate(password: &str) -> Result<(), NodeDecodeError> {
    if password.is_empty() {
        return Err(NodeDecodeError::MissingField {
            scheme: SCHEME,
            field: "password",
        });
    }
    Ok(())
}
