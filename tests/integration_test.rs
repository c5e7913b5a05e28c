use dualstream::config::{Config, ConfigError, Provider};
use std::collections::HashMap;

fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_anthropic_key_selects_anthropic_model_label() {
    let config = load(&[("ANTHROPIC_API_KEY", "sk-ant-test"), ("OPENAI_API_KEY", "sk-test")])
        .expect("config");
    assert_eq!(config.provider, Provider::Anthropic);
    assert!(config.display_model().starts_with("anthropic:claude-"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_openai_key_alone_selects_openai_model_label() {
    let config = load(&[("OPENAI_API_KEY", "sk-test")]).expect("config");
    assert_eq!(config.provider, Provider::OpenAi);
    assert_eq!(config.display_model(), "openai:gpt-4o-mini");
}

#[test]
fn test_missing_credentials_produce_two_stderr_lines() {
    let error = load(&[]).expect_err("no credentials");
    let config_error = error
        .downcast_ref::<ConfigError>()
        .expect("typed config error");
    assert_eq!(
        config_error.stderr_lines(),
        [
            "Error: no API key found.",
            "Set ANTHROPIC_API_KEY or OPENAI_API_KEY to choose a model.",
        ]
    );
}

#[test]
fn test_config_validation_rejects_invalid_models_for_remote_api() {
    let config = load(&[
        ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ("ANTHROPIC_MODEL", "local/mock-model"),
    ])
    .expect("config");
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_allows_local_endpoint_models() {
    let config = load(&[
        ("ANTHROPIC_API_KEY", "local"),
        ("ANTHROPIC_MODEL", "local/llama3.3"),
        ("ANTHROPIC_API_URL", "http://localhost:8000/v1/messages"),
    ])
    .expect("config");
    assert!(config.validate().is_ok());
}

#[test]
fn test_binary_without_credentials_exits_one_with_two_stderr_lines() {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_dualstream"))
        .env_clear()
        .stdin(std::process::Stdio::null())
        .output()
        .expect("run dualstream");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.lines().collect::<Vec<_>>(),
        [
            "Error: no API key found.",
            "Set ANTHROPIC_API_KEY or OPENAI_API_KEY to choose a model.",
        ]
    );
}
