//! Notifications emitted while cutting and playing.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::types::PieceId;

/// Result of releasing a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementOutcome {
    /// Released within tolerance: snapped and locked.
    Correct,
    /// Released too far from its target; still free.
    Incorrect,
}

/// Everything a puzzle reports to its observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleEvent {
    /// A cutting task finished.
    Progress {
        /// Pieces cut so far.
        completed: u32,
        /// Pieces requested.
        total: u32,
    },
    /// Every cutting task finished; the piece set is complete.
    CuttingFinished,
    /// A piece was released.
    PiecePlaced {
        /// Which piece.
        piece: PieceId,
        /// Whether it locked.
        outcome: PlacementOutcome,
    },
    /// The last free piece locked. Sent at most once per board.
    Solved,
}

/// Send `event` if there is an observer. A dropped receiver is not an
/// error: the observer simply stopped listening.
pub(crate) fn emit(events: Option<&Sender<PuzzleEvent>>, event: PuzzleEvent) {
    if let Some(tx) = events
        && tx.send(event).is_err()
    {
        log::trace!("event receiver gone, dropped {event:?}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn emit_delivers_in_order() {
        let (tx, rx) = mpsc::channel();
        emit(Some(&tx), PuzzleEvent::Progress { completed: 1, total: 2 });
        emit(Some(&tx), PuzzleEvent::CuttingFinished);
        assert_eq!(
            rx.try_recv().unwrap(),
            PuzzleEvent::Progress { completed: 1, total: 2 }
        );
        assert_eq!(rx.try_recv().unwrap(), PuzzleEvent::CuttingFinished);
    }

    #[test]
    fn emit_without_listener_is_silent() {
        emit(None, PuzzleEvent::Solved);
        let (tx, rx) = mpsc::channel();
        drop(rx);
        emit(Some(&tx), PuzzleEvent::Solved);
    }

    #[test]
    fn events_serialize() {
        let json = serde_json::to_string(&PuzzleEvent::PiecePlaced {
            piece: PieceId(3),
            outcome: PlacementOutcome::Correct,
        })
        .unwrap();
        assert!(json.contains("PiecePlaced"));
        assert!(json.contains("Correct"));
    }
}
