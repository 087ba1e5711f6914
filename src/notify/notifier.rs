// ==========================================
// 疫情通报采集系统 - 运维通知
// ==========================================
// 职责: 把异常 / 失败以单行消息推送给运维
// 红线: 通知失败不影响运行结果
// ==========================================

use crate::config::PushoverConfig;
use crate::domain::types::FederalState;
use crate::notify::error::NotifyResult;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

// ==========================================
// Notifier Trait
// ==========================================
// 实现者: PushoverNotifier / LogNotifier
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送一条通知
    ///
    /// # 参数
    /// - state: 出错的联邦州（用于标题）
    /// - message: 单行消息
    async fn notify(&self, state: FederalState, message: &str) -> NotifyResult<()>;
}

/// 通知标题
pub fn notification_title(state: FederalState) -> String {
    format!("Corona {}: Fehler!", state.short())
}

/// 发送通知，失败时仅记录日志
pub async fn notify_quietly(notifier: &dyn Notifier, state: FederalState, message: &str) {
    if let Err(e) = notifier.notify(state, message).await {
        warn!(state = %state, error = %e, "通知发送失败");
    }
}

// ==========================================
// LogNotifier - 未配置推送渠道时的默认实现
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, state: FederalState, message: &str) -> NotifyResult<()> {
        info!(state = %state, title = %notification_title(state), "{}", message);
        Ok(())
    }
}

// ==========================================
// PushoverNotifier
// ==========================================
#[derive(Debug, Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    title: String,
    message: &'a str,
}

pub struct PushoverNotifier {
    http_client: reqwest::Client,
    config: PushoverConfig,
}

impl PushoverNotifier {
    pub fn new(config: PushoverConfig, user_agent: &str) -> NotifyResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, state: FederalState, message: &str) -> NotifyResult<()> {
        // 消息同时进入日志
        info!(state = %state, "{}", message);

        let body = PushoverMessage {
            token: &self.config.token,
            user: &self.config.user,
            title: notification_title(state),
            message,
        };

        self.http_client
            .post(PUSHOVER_URL)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// 按配置选择通知实现
pub fn notifier_from_config(
    pushover: Option<&PushoverConfig>,
    user_agent: &str,
) -> NotifyResult<Box<dyn Notifier>> {
    match pushover {
        Some(config) => Ok(Box::new(PushoverNotifier::new(config.clone(), user_agent)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}
