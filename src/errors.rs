use actix_web::http::StatusCode;
use std::fmt;

#[derive(Debug, Clone)]
pub enum LinkhubError {
    Validation(String),
    Configuration(String),
    Authentication(String),
    Conflict(String),
    NotFound(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Serialization(String),
    Notification(String),
}

impl LinkhubError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkhubError::Validation(_) => "E001",
            LinkhubError::Configuration(_) => "E002",
            LinkhubError::Authentication(_) => "E003",
            LinkhubError::Conflict(_) => "E004",
            LinkhubError::NotFound(_) => "E005",
            LinkhubError::DatabaseConfig(_) => "E006",
            LinkhubError::DatabaseConnection(_) => "E007",
            LinkhubError::DatabaseOperation(_) => "E008",
            LinkhubError::Serialization(_) => "E009",
            LinkhubError::Notification(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkhubError::Validation(_) => "Validation Error",
            LinkhubError::Configuration(_) => "Configuration Error",
            LinkhubError::Authentication(_) => "Authentication Error",
            LinkhubError::Conflict(_) => "Conflict Error",
            LinkhubError::NotFound(_) => "Resource Not Found",
            LinkhubError::DatabaseConfig(_) => "Database Configuration Error",
            LinkhubError::DatabaseConnection(_) => "Database Connection Error",
            LinkhubError::DatabaseOperation(_) => "Database Operation Error",
            LinkhubError::Serialization(_) => "Serialization Error",
            LinkhubError::Notification(_) => "Notification Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkhubError::Validation(msg)
            | LinkhubError::Configuration(msg)
            | LinkhubError::Authentication(msg)
            | LinkhubError::Conflict(msg)
            | LinkhubError::NotFound(msg)
            | LinkhubError::DatabaseConfig(msg)
            | LinkhubError::DatabaseConnection(msg)
            | LinkhubError::DatabaseOperation(msg)
            | LinkhubError::Serialization(msg)
            | LinkhubError::Notification(msg) => msg,
        }
    }

    /// HTTP 状态码映射（契约见接口表）
    pub fn http_status(&self) -> StatusCode {
        match self {
            LinkhubError::Validation(_) => StatusCode::BAD_REQUEST,
            LinkhubError::Authentication(_) => StatusCode::FORBIDDEN,
            LinkhubError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkhubError::Conflict(_) => StatusCode::CONFLICT,
            LinkhubError::Configuration(_)
            | LinkhubError::DatabaseConfig(_)
            | LinkhubError::DatabaseConnection(_)
            | LinkhubError::DatabaseOperation(_)
            | LinkhubError::Serialization(_)
            | LinkhubError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for LinkhubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for LinkhubError {}

// 便捷的构造函数
impl LinkhubError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinkhubError::Validation(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        LinkhubError::Configuration(msg.into())
    }

    pub fn authentication<T: Into<String>>(msg: T) -> Self {
        LinkhubError::Authentication(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        LinkhubError::Conflict(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkhubError::NotFound(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkhubError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkhubError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkhubError::DatabaseOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkhubError::Serialization(msg.into())
    }

    pub fn notification<T: Into<String>>(msg: T) -> Self {
        LinkhubError::Notification(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LinkhubError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkhubError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for LinkhubError {
    fn from(err: std::io::Error) -> Self {
        LinkhubError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkhubError {
    fn from(err: serde_json::Error) -> Self {
        LinkhubError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkhubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            LinkhubError::validation("bad dest").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LinkhubError::authentication("bad signature").http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LinkhubError::configuration("missing page id").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            LinkhubError::conflict("token collision").http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_display_format() {
        let err = LinkhubError::validation("unknown dest");
        assert_eq!(err.to_string(), "Validation Error: unknown dest");
        assert_eq!(err.code(), "E001");
    }
}
