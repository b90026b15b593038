//! Operator confirmation

use color_eyre::eyre::Result;
use dialoguer::Confirm;

/// The single yes/no gate before any plan executes
///
/// A negative answer aborts the invocation cleanly (exit 0).
pub fn confirm_execution(plan_count: usize) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(format!("I will execute {plan_count} plans, continue"))
        .default(true)
        .interact()?;

    Ok(confirmed)
}
