//! Helpers for running configuration tests inside `figment::Jail`.
//!
//! A jail gives each test a scratch working directory and an isolated
//! environment, so factory configuration files and `FABRIQUE_*` variables
//! never leak between tests.

use anyhow::{Result, anyhow};

/// Executes `f` inside a [`figment::Jail`], returning the closure's output.
///
/// The jail is torn down once the closure completes, even when it fails.
///
/// # Errors
///
/// Returns an error if the jail cannot be created or the closure returns a
/// [`figment::error::Error`].
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> figment::error::Result<T>,
{
    let mut output = None;
    figment::Jail::try_with(|jail| {
        jail.clear_env();
        output = Some(f(jail)?);
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output.ok_or_else(|| anyhow!("jail closure did not return a value"))
}

/// Converts a factory error into a [`figment::Error`] so jail closures can
/// use `?` on factory results.
#[expect(
    clippy::needless_pass_by_value,
    reason = "callers hand over the Arc returned by a failed load"
)]
#[must_use]
pub fn jail_error(err: std::sync::Arc<fabrique::FactoryError>) -> figment::Error {
    figment::Error::from(err.to_string())
}
