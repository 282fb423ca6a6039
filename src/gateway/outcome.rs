//! Outcome classification of backend status tokens.

/// Success token of SubmitOrder.
pub const SUBMIT_ACCEPTED: &str = "ACCEPTED";
/// Success token of CancelOrder.
pub const CANCEL_ACCEPTED: &str = "CANCELLED";
/// Success token of ModifyOrder.
pub const MODIFY_ACCEPTED: &str = "MODIFIED";

/// Business outcome of a completed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected,
}

impl Outcome {
    /// Case-insensitive match of `status` against the success token.
    ///
    /// Empty, missing, or unrecognised statuses are `Rejected`; this never fails.
    pub fn classify(status: &str, success_token: &str) -> Self {
        if status.eq_ignore_ascii_case(success_token) {
            Outcome::Accepted
        } else {
            Outcome::Rejected
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
        }
    }
}
