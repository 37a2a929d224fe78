//! IP 地址处理工具
//!
//! 提供客户端 IP 提取功能：
//! - 私有 IP 自动检测（私网对端视为反向代理）
//! - X-Forwarded-For / X-Real-IP 回退

use std::net::IpAddr;

use actix_web::HttpRequest;
use tracing::debug;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            // IPv6 私有地址：
            // - fc00::/7 (ULA, RFC 4193)
            // - fe80::/10 (Link-local)
            // - ::1 (Loopback)
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// 从请求头提取转发的 IP（X-Forwarded-For 或 X-Real-IP）
pub fn extract_forwarded_ip_from_headers(
    headers: &actix_web::http::header::HeaderMap,
) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            // 其次 X-Real-IP
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(String::from)
        })
}

/// 从 HttpRequest 提取真实客户端 IP
///
/// 策略：连接来自私有 IP/localhost 时假设有反向代理，优先使用转发头；
/// 公网直连场景一律使用连接 IP，防止伪造。
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let conn_info = req.connection_info();
    let peer_ip = conn_info.peer_addr()?;

    if let Ok(ip_addr) = peer_ip.parse::<IpAddr>()
        && is_private_or_local(&ip_addr)
        && let Some(real_ip) = extract_forwarded_ip_from_headers(req.headers())
    {
        debug!(
            "Auto-detect proxy (private IP {}): using forwarded IP {}",
            peer_ip, real_ip
        );
        return Some(real_ip);
    }

    Some(peer_ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};

    #[test]
    fn test_is_private_or_local_ipv4() {
        // 私有地址
        assert!(is_private_or_local(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"172.16.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"192.168.1.1".parse().unwrap()));
        // localhost
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        // 公网地址
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_or_local(&"1.1.1.1".parse().unwrap()));
    }

    #[test]
    fn test_is_private_or_local_ipv6() {
        assert!(is_private_or_local(&"::1".parse().unwrap()));
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(is_private_or_local(&"fe80::1".parse().unwrap()));
        assert!(!is_private_or_local(
            &"2001:4860:4860::8888".parse().unwrap()
        ));
    }

    #[test]
    fn test_forwarded_ip_prefers_first_xff_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        headers.insert(
            HeaderName::from_static("x-real-ip"),
            HeaderValue::from_static("198.51.100.9"),
        );
        assert_eq!(
            extract_forwarded_ip_from_headers(&headers),
            Some("203.0.113.7".to_string())
        );
    }

    #[test]
    fn test_forwarded_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-real-ip"),
            HeaderValue::from_static("198.51.100.9"),
        );
        assert_eq!(
            extract_forwarded_ip_from_headers(&headers),
            Some("198.51.100.9".to_string())
        );
        assert_eq!(extract_forwarded_ip_from_headers(&HeaderMap::new()), None);
    }
}
