//! Exit code constants for the cooplock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable file)
//! - 2: Configuration failure
//! - 3: Scenario failure
//! - 4: Scenario ran but callbacks failed without recovery

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or unreadable input.
pub const USER_ERROR: i32 = 1;

/// Configuration could not be loaded or validated.
pub const CONFIG_FAILURE: i32 = 2;

/// Scenario could not be loaded or validated.
pub const SCENARIO_FAILURE: i32 = 3;

/// Scenario ran, but lock callbacks failed and nothing recovered them.
pub const UNCAUGHT_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            CONFIG_FAILURE,
            SCENARIO_FAILURE,
            UNCAUGHT_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
