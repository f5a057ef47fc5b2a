//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};

#[test]
fn test_logging_initializes_once() {
    // Only one global subscriber per process: the second call must fail
    // with a logging error instead of panicking.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn);

    assert!(init_logging(config.clone()).is_ok());
    assert!(matches!(
        init_logging(config),
        Err(core_runtime::Error::Logging(_))
    ));
}

#[test]
fn test_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("access_token", "ghp_abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("credential", "ghp_abc"), "[REDACTED]");
    assert_eq!(
        redact_if_sensitive("authorization", "Bearer ghp_abc"),
        "[REDACTED]"
    );
}

#[test]
fn test_emails_are_partially_redacted() {
    let redacted = redact_if_sensitive("committer", "mahiro@example.com");

    assert!(redacted.starts_with('m'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_repository_values_pass_through() {
    assert_eq!(redact_if_sensitive("slug", "hello-world"), "hello-world");
    assert_eq!(redact_if_sensitive("branch", "main"), "main");
    assert_eq!(
        redact_if_sensitive("commit", "3b18e512dba79e4c8300dd08aeb37f8e728b8dad"),
        "3b18e512dba79e4c8300dd08aeb37f8e728b8dad"
    );
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("content/blog/hello.md"), "hello.md");
    assert_eq!(strip_path("images/hello/3f2a9c.png"), "3f2a9c.png");
    assert_eq!(strip_path("C:\\blog\\public\\favicon.ico"), "favicon.ico");
    assert_eq!(strip_path("blog.config.yaml"), "blog.config.yaml");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_filter("core_sync=trace,provider_github=debug")
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(
        config.filter.as_deref(),
        Some("core_sync=trace,provider_github=debug")
    );
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
