// Dataset sweep: every prompt × every combination of listener-context options, run
// through the recommendation engine and reshaped into flat track rows.

pub mod handlers;
pub mod options;
pub mod profile;
pub mod runner;
