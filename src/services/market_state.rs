//! Market and match lifecycle transitions
//!
//! Pure transition functions: no I/O, no transaction handling. Callers
//! (the API layer, the settlement engine's force-close path) load the
//! current row, call `transition`, and persist the result themselves inside
//! their own transaction.

use crate::error::CoreError;
use crate::models::{MarketStatus, MatchStatus};

/// Validates a market status transition, returning the error the caller
/// should surface if the edge is illegal.
///
/// OPEN -> SUSPENDED -> OPEN -> CLOSED -> SETTLED, with SETTLED terminal.
pub fn transition_market(from: MarketStatus, to: MarketStatus) -> Result<(), CoreError> {
    use MarketStatus::*;
    let allowed = matches!(
        (from, to),
        (Open, Suspended) | (Suspended, Open) | (Open, Closed) | (Closed, Settled)
    );
    if allowed {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "market cannot transition {:?} -> {:?}",
            from, to
        )))
    }
}

/// Validates a match status transition.
///
/// UPCOMING -> LIVE -> COMPLETED; UPCOMING/LIVE -> CANCELLED is also allowed.
/// CANCELLED and COMPLETED are both terminal.
pub fn transition_match(from: MatchStatus, to: MatchStatus) -> Result<(), CoreError> {
    use MatchStatus::*;
    let allowed = matches!(
        (from, to),
        (Upcoming, Live) | (Live, Completed) | (Upcoming, Cancelled) | (Live, Cancelled)
    );
    if allowed {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "match cannot transition {:?} -> {:?}",
            from, to
        )))
    }
}

/// `true` if the market accepts new order placement.
pub fn accepts_orders(status: MarketStatus) -> bool {
    matches!(status, MarketStatus::Open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_to_suspended_and_back_is_allowed() {
        assert!(transition_market(MarketStatus::Open, MarketStatus::Suspended).is_ok());
        assert!(transition_market(MarketStatus::Suspended, MarketStatus::Open).is_ok());
    }

    #[test]
    fn closed_to_settled_is_allowed_but_settled_is_terminal() {
        assert!(transition_market(MarketStatus::Closed, MarketStatus::Settled).is_ok());
        assert!(transition_market(MarketStatus::Settled, MarketStatus::Open).is_err());
    }

    #[test]
    fn suspended_cannot_jump_to_closed() {
        assert!(transition_market(MarketStatus::Suspended, MarketStatus::Closed).is_err());
    }

    #[test]
    fn only_open_accepts_orders() {
        assert!(accepts_orders(MarketStatus::Open));
        assert!(!accepts_orders(MarketStatus::Suspended));
        assert!(!accepts_orders(MarketStatus::Closed));
        assert!(!accepts_orders(MarketStatus::Settled));
    }

    #[test]
    fn match_lifecycle() {
        assert!(transition_match(MatchStatus::Upcoming, MatchStatus::Live).is_ok());
        assert!(transition_match(MatchStatus::Live, MatchStatus::Completed).is_ok());
        assert!(transition_match(MatchStatus::Upcoming, MatchStatus::Cancelled).is_ok());
        assert!(transition_match(MatchStatus::Completed, MatchStatus::Live).is_err());
    }
}
