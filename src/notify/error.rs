// ==========================================
// 疫情通报采集系统 - 通知错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("通知发送失败: {0}")]
    Transport(String),

    #[error("通知服务拒绝请求: HTTP {status}")]
    Rejected { status: u16 },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NotifyError::Rejected {
                status: status.as_u16(),
            },
            None => NotifyError::Transport(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type NotifyResult<T> = Result<T, NotifyError>;
