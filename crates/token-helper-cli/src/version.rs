pub const NAME: &str = "vault-token-helper-gcp-kms";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const URL: &str = "https://github.com/sethvargo/vault-token-helper-gcp-kms";

/// Commit the binary was built from, injected at build time.
pub fn git_commit() -> &'static str {
    option_env!("VAULT_TOKEN_HELPER_GIT_COMMIT").unwrap_or("unknown")
}

/// `name version (commit)`, printed by the `version` command.
pub fn human_version() -> String {
    format!("{NAME} {VERSION} ({})", git_commit())
}

/// User agent sent to Cloud KMS.
pub fn user_agent() -> String {
    format!("{NAME}/{VERSION} (+{URL})")
}
