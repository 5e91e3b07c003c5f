/// HTTP 用戶端
pub mod http;
