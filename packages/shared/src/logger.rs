//! Logger setup shared by the Advisor Chat binaries.

use tracing_subscriber::EnvFilter;

/// Build the default filter directive for a binary.
///
/// Both the binary itself and the chat client library log at `default_level`.
pub fn default_directive(bin_name: &str, default_level: &str) -> String {
    format!(
        "{}={},advisor_chat_client={}",
        bin_name.replace('-', "_"),
        default_level,
        default_level
    )
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the default directive. Logs are written
/// to stderr so that stdout stays free for the terminal UI.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(bin_name, default_level)));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = result {
        tracing::warn!("Logger already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_normalizes_bin_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに変換される
        // when (操作):
        let directive = default_directive("advisor-chat", "debug");

        // then (期待する結果):
        assert_eq!(directive, "advisor_chat=debug,advisor_chat_client=debug");
    }
}
