// ==========================================
// 疫情通报采集系统 - 通知层
// ==========================================

pub mod error;
pub mod notifier;

pub use error::{NotifyError, NotifyResult};
pub use notifier::{
    notification_title, notifier_from_config, notify_quietly, LogNotifier, Notifier,
    PushoverNotifier,
};
