//! `${VAR}` substitution for values read from `wv.toml`.
//!
//! `${VAR:-fallback}` takes the fallback when the variable is unset. A plain
//! `${VAR}` with no value behind it is a configuration error, not an empty
//! string.

use std::env::VarError;

use crate::ConfigError;

/// Substitute `${VAR}` references in a configuration value.
///
/// Values without a `${` marker come back untouched. Bare `$VAR` (no braces)
/// is left alone.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    // Skip the parser when there is nothing to substitute
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    match shellexpand::env_with_context(value, env_context) {
        Ok(expanded) => Ok(expanded.into_owned()),
        Err(err) => Err(ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", err.var_name),
        }),
    }
}

/// Expand a path-valued configuration string.
///
/// Applies [`expand_env`] first, then expands a leading `~` to the user's
/// home directory.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    let expanded = expand_env(value, field)?;
    Ok(shellexpand::tilde(&expanded).into_owned())
}

/// Variable lookup for [`shellexpand::env_with_context`].
///
/// An unset variable surfaces as an error so plain `${VAR}` references fail
/// loudly; `${VAR:-fallback}` catches the error and uses its fallback.
fn env_context(var: &str) -> Result<Option<String>, VarError> {
    std::env::var(var).map(Some)
}
