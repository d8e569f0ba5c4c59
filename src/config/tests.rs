use super::*;
use serial_test::serial;

fn clear_env() {
    for name in [
        ENV_API_KEY,
        ENV_ENDPOINT,
        ENV_DEPLOYMENT,
        ENV_EMBEDDING_DEPLOYMENT,
        ENV_API_VERSION,
        ENV_BATCH_SIZE,
    ] {
        // SAFETY: tests in this module are serialized and single-threaded
        // with respect to env access via #[serial].
        unsafe { env::remove_var(name) };
    }
}

fn set_required_vars() {
    // SAFETY: see clear_env.
    unsafe {
        env::set_var(ENV_API_KEY, "test-key");
        env::set_var(ENV_ENDPOINT, "https://example.openai.azure.com/");
        env::set_var(ENV_DEPLOYMENT, "gpt-4o-mini");
    }
}

#[test]
#[serial]
fn loads_with_required_vars_and_defaults() {
    clear_env();
    set_required_vars();

    let config = Config::from_env().expect("config should load");

    assert_eq!(config.service.api_key, "test-key");
    assert_eq!(config.service.deployment, "gpt-4o-mini");
    assert_eq!(
        config.service.embedding_deployment,
        DEFAULT_EMBEDDING_DEPLOYMENT
    );
    assert_eq!(config.service.api_version, DEFAULT_API_VERSION);
    assert_eq!(config.service.batch_size, DEFAULT_BATCH_SIZE);
}

#[test]
#[serial]
fn missing_api_key_is_a_startup_error() {
    clear_env();
    // SAFETY: see clear_env.
    unsafe {
        env::set_var(ENV_ENDPOINT, "https://example.openai.azure.com/");
        env::set_var(ENV_DEPLOYMENT, "gpt-4o-mini");
    }

    let result = Config::from_env();

    assert!(matches!(result, Err(ConfigError::MissingVar(ENV_API_KEY))));
}

#[test]
#[serial]
fn missing_endpoint_names_the_variable() {
    clear_env();
    // SAFETY: see clear_env.
    unsafe {
        env::set_var(ENV_API_KEY, "test-key");
        env::set_var(ENV_DEPLOYMENT, "gpt-4o-mini");
    }

    let result = Config::from_env();

    let err = result.expect_err("should fail");
    assert!(err.to_string().contains(ENV_ENDPOINT));
}

#[test]
#[serial]
fn invalid_endpoint_url_is_rejected() {
    clear_env();
    set_required_vars();
    // SAFETY: see clear_env.
    unsafe { env::set_var(ENV_ENDPOINT, "not a url") };

    let result = Config::from_env();

    assert!(matches!(result, Err(ConfigError::InvalidEndpoint(..))));
}

#[test]
#[serial]
fn invalid_batch_size_is_rejected() {
    clear_env();
    set_required_vars();
    // SAFETY: see clear_env.
    unsafe { env::set_var(ENV_BATCH_SIZE, "zero") };

    assert!(matches!(
        Config::from_env(),
        Err(ConfigError::InvalidBatchSize(_))
    ));

    // SAFETY: see clear_env.
    unsafe { env::set_var(ENV_BATCH_SIZE, "0") };

    assert!(matches!(
        Config::from_env(),
        Err(ConfigError::InvalidBatchSize(_))
    ));
}

#[test]
#[serial]
fn optional_vars_override_defaults() {
    clear_env();
    set_required_vars();
    // SAFETY: see clear_env.
    unsafe {
        env::set_var(ENV_EMBEDDING_DEPLOYMENT, "text-embedding-3-small");
        env::set_var(ENV_BATCH_SIZE, "16");
    }

    let config = Config::from_env().expect("config should load");

    assert_eq!(config.service.embedding_deployment, "text-embedding-3-small");
    assert_eq!(config.service.batch_size, 16);
}

#[test]
fn overlap_must_be_smaller_than_max_chunk_size() {
    let config = Config {
        service: ServiceConfig {
            api_key: "k".to_string(),
            endpoint: Url::parse("https://example.com/").expect("valid url"),
            deployment: "gpt-4o-mini".to_string(),
            embedding_deployment: DEFAULT_EMBEDDING_DEPLOYMENT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            batch_size: 100,
        },
        chunking: ChunkingConfig {
            max_chunk_chars: 100,
            overlap_chars: 100,
        },
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge { .. })
    ));
}
