//! Submission throttle policy.
//!
//! Pure, total, deterministic: the Director re-evaluates this against
//! fresh occupancy before every single submission, since each accepted
//! pilot perturbs the numbers.

use gridpilot_ce::CeOccupancy;

/// Configured ceilings the policy enforces.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleLimits {
    /// Waiting-job ceiling applied while the resource runs nothing.
    pub max_waiting_jobs: u64,
    /// Hard ceiling on waiting + running + the pilot about to be sent.
    pub max_number_jobs: u64,
    /// Waiting/running ratio above which the resource is saturated.
    pub waiting_to_running_ratio: f64,
}

/// Decide whether one more pilot may be sent at the observed occupancy.
pub fn should_submit(occupancy: CeOccupancy, limits: &ThrottleLimits) -> bool {
    let CeOccupancy {
        waiting_jobs,
        running_jobs,
    } = occupancy;

    // The hard ceiling overrides every other rule.
    if waiting_jobs.saturating_add(running_jobs).saturating_add(1) > limits.max_number_jobs {
        return false;
    }

    if running_jobs == 0 {
        return waiting_jobs < limits.max_waiting_jobs;
    }

    // A single waiting job is no evidence of saturation: pilots enter the
    // waiting state on submission, so exactly one pending job may just be
    // the previous pilot still being scheduled.
    let ratio = waiting_jobs as f64 / running_jobs as f64;
    ratio < limits.waiting_to_running_ratio || waiting_jobs == 1
}
