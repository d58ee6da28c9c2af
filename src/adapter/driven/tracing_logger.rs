use crate::domain::port::{LogLevel, Logger};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// 追加コンテキストを `key=value` 形式の1行にまとめる
/// キーの順序を固定するため辞書順に並べる
pub fn format_context(context: &HashMap<String, String>) -> String {
    context
        .iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// tracingログ実装
/// ロガーポートの出力を `tracing` のイベントに変換する
///
/// 出力先・書式・レベルの絞り込みは `tracing_subscriber` の設定に従う。
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }

    fn emit(
        &self,
        level: LogLevel,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        let correlation_id = correlation_id.map(|id| id.to_string()).unwrap_or_default();
        let context = context.as_ref().map(format_context).unwrap_or_default();

        match level {
            LogLevel::Debug => tracing::debug!(component, %correlation_id, %context, "{}", message),
            LogLevel::Info => tracing::info!(component, %correlation_id, %context, "{}", message),
            LogLevel::Warning => tracing::warn!(component, %correlation_id, %context, "{}", message),
            LogLevel::Error => tracing::error!(component, %correlation_id, %context, "{}", message),
        }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for TracingLogger {
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Debug, component, message, correlation_id, context);
    }

    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Info, component, message, correlation_id, context);
    }

    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Warning, component, message, correlation_id, context);
    }

    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        self.emit(LogLevel::Error, component, message, correlation_id, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_context_is_sorted() {
        let mut context = HashMap::new();
        context.insert("raffle_id".to_string(), "r-1".to_string());
        context.insert("count".to_string(), "3".to_string());
        context.insert("holder".to_string(), "u-9".to_string());

        assert_eq!(format_context(&context), "count=3, holder=u-9, raffle_id=r-1");
    }

    #[test]
    fn test_format_empty_context() {
        assert_eq!(format_context(&HashMap::new()), "");
    }

    #[test]
    fn test_logger_accepts_all_levels() {
        let logger = TracingLogger::new();
        let mut context = HashMap::new();
        context.insert("key".to_string(), "value".to_string());

        logger.debug("Test", "debug", None, None);
        logger.info("Test", "info", Some(Uuid::new_v4()), Some(context.clone()));
        logger.warn("Test", "warn", None, Some(context.clone()));
        logger.error("Test", "error", Some(Uuid::new_v4()), Some(context));
    }
}
