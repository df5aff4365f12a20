// Base64 编解码
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// 订阅内容常见缺失 `=` 填充，解码时一律容忍
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_end_matches('=')
        .to_string()
}

/// 标准 base64 解码，自动修复填充
pub fn decode_standard(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(normalize(text))?)
}

/// URL-safe base64 解码，自动修复填充；同时接受标准字母表中的 `+` 和 `/`
pub fn decode_url_safe(text: &str) -> Result<Vec<u8>, DecodeError> {
    let text = normalize(text).replace('+', "-").replace('/', "_");
    Ok(URL_SAFE.decode(text)?)
}

pub fn decode_standard_str(text: &str) -> Result<String, DecodeError> {
    Ok(String::from_utf8(decode_standard(text)?)?)
}

pub fn decode_url_safe_str(text: &str) -> Result<String, DecodeError> {
    Ok(String::from_utf8(decode_url_safe(text)?)?)
}

pub fn encode_standard(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

pub fn encode_url_safe(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_standard_repairs_padding() {
        assert_eq!(decode_standard_str("YWVzLTI1Ni1nY206cGFzcw==").unwrap(), "aes-256-gcm:pass");
        assert_eq!(decode_standard_str("YWVzLTI1Ni1nY206cGFzcw").unwrap(), "aes-256-gcm:pass");
        assert_eq!(decode_standard_str("YWJj").unwrap(), "abc");
        assert_eq!(decode_standard_str("YWI").unwrap(), "ab");
    }

    #[test]
    fn test_decode_ignores_line_wrapping() {
        let wrapped = "c3M6Ly9h\nYmNk\r\n";
        assert_eq!(decode_standard_str(wrapped).unwrap(), "ss://abcd");
    }

    #[test]
    fn test_decode_url_safe() {
        let encoded = encode_url_safe([0xfb, 0xff, 0xbf]);
        assert_eq!(encoded, "-_-_");
        assert_eq!(decode_url_safe(&encoded).unwrap(), vec![0xfb, 0xff, 0xbf]);
        assert!(decode_standard("-_-_").is_err());
    }

    #[test]
    fn test_decode_url_safe_accepts_standard_alphabet() {
        assert_eq!(decode_url_safe("+/+/").unwrap(), vec![0xfb, 0xff, 0xbf]);
        assert_eq!(decode_url_safe("-_+/").unwrap(), vec![0xfb, 0xff, 0xbf]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_standard("ab!c").is_err());
        // 单个余留字符无法补齐
        assert!(decode_standard("YWJjZ").is_err());
    }
}
