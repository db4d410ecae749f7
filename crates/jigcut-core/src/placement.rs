//! Drag-and-snap placement.
//!
//! Each piece is a small state machine: `Free` until released within
//! tolerance of its target, then `Locked` for good. A [`Board`] owns all
//! piece states plus the z-order and reports outcomes over the optional
//! event channel. All methods take `&self`; one mutex per piece keeps
//! independent pointers on different pieces from contending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::events::{PlacementOutcome, PuzzleEvent, emit};
use crate::extract::Piece;
use crate::scatter::{ScatterArea, scatter};
use crate::types::{PieceId, Point};

/// Per-axis snap distance for a piece of `width`×`height` pixels:
/// a tenth of its diagonal.
#[must_use]
pub fn snap_tolerance(width: f64, height: f64) -> f64 {
    width.hypot(height) / 10.0
}

/// Placement state of one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceStatus {
    /// Can be dragged.
    Free,
    /// Snapped to its target. Terminal.
    Locked,
}

/// Mutable placement data of one piece.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceState {
    id: PieceId,
    target: Point,
    position: Point,
    width: f64,
    height: f64,
    status: PieceStatus,
    /// Pointer minus top-left at press time; `None` when not held.
    grab: Option<Point>,
}

impl PieceState {
    /// A free piece resting on its target.
    #[must_use]
    pub const fn new(id: PieceId, target: Point, width: f64, height: f64) -> Self {
        Self {
            id,
            target,
            position: target,
            width,
            height,
            status: PieceStatus::Free,
            grab: None,
        }
    }

    /// Piece identifier.
    #[must_use]
    pub const fn id(&self) -> PieceId {
        self.id
    }

    /// Correct top-left position.
    #[must_use]
    pub const fn target(&self) -> Point {
        self.target
    }

    /// Current top-left position.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Current state.
    #[must_use]
    pub const fn status(&self) -> PieceStatus {
        self.status
    }

    /// Whether the piece has locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self.status, PieceStatus::Locked)
    }

    /// Per-axis snap distance for this piece.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        snap_tolerance(self.width, self.height)
    }

    fn within_tolerance(&self) -> bool {
        let tolerance = self.tolerance();
        (self.target.x - self.position.x).abs() <= tolerance
            && (self.target.y - self.position.y).abs() <= tolerance
    }
}

impl From<&Piece> for PieceState {
    fn from(piece: &Piece) -> Self {
        Self::new(
            piece.id(),
            piece.target(),
            f64::from(piece.width()),
            f64::from(piece.height()),
        )
    }
}

/// Kind of pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAction {
    /// Pointer went down on the piece.
    Press,
    /// Pointer moved while holding the piece.
    Move,
    /// Pointer went up.
    Release,
}

/// One pointer event aimed at a piece.
///
/// `x` and `y` are in display space; they are divided by `zoom` to get
/// board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Target piece.
    pub piece: PieceId,
    /// Gesture kind.
    pub action: PointerAction,
    /// Display x.
    pub x: f64,
    /// Display y.
    pub y: f64,
    /// Display zoom factor.
    pub zoom: f64,
}

impl PointerEvent {
    /// Unzoomed event.
    #[must_use]
    pub const fn new(piece: PieceId, action: PointerAction, x: f64, y: f64) -> Self {
        Self {
            piece,
            action,
            x,
            y,
            zoom: 1.0,
        }
    }

    /// Same event at a different zoom.
    #[must_use]
    pub const fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// Board coordinates, or `None` for an unusable zoom or position.
    fn board_point(&self) -> Option<Point> {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return None;
        }
        let point = Point::new(self.x / self.zoom, self.y / self.zoom);
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }
}

/// Result of one release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// The released piece.
    pub piece: PieceId,
    /// Whether it locked.
    pub placement: PlacementOutcome,
    /// Whether every piece is locked after this release.
    pub solved: bool,
}

/// All pieces of one game.
#[derive(Debug)]
pub struct Board {
    pieces: Vec<Mutex<PieceState>>,
    /// Drawing order, back to front.
    z_order: Mutex<Vec<PieceId>>,
    solved_sent: AtomicBool,
    events: Option<Sender<PuzzleEvent>>,
}

impl Board {
    /// A board over `states`. Each state's id must equal its index.
    #[must_use]
    pub fn new(states: Vec<PieceState>) -> Self {
        let z_order = states.iter().map(PieceState::id).collect();
        Self {
            pieces: states.into_iter().map(Mutex::new).collect(),
            z_order: Mutex::new(z_order),
            solved_sent: AtomicBool::new(false),
            events: None,
        }
    }

    /// A board with every piece free and resting on its target.
    #[must_use]
    pub fn from_pieces(pieces: &[Piece]) -> Self {
        Self::new(pieces.iter().map(PieceState::from).collect())
    }

    /// Report placements and the solve over `events`.
    #[must_use]
    pub fn with_events(mut self, events: Sender<PuzzleEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn piece(&self, id: PieceId) -> Option<MutexGuard<'_, PieceState>> {
        self.pieces
            .get(id.0)
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn order(&self) -> MutexGuard<'_, Vec<PieceId>> {
        self.z_order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bring_to_front(&self, id: PieceId) {
        let mut order = self.order();
        order.retain(|&p| p != id);
        order.push(id);
    }

    fn send_to_back(&self, id: PieceId) {
        let mut order = self.order();
        order.retain(|&p| p != id);
        order.insert(0, id);
    }

    /// Number of pieces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Whether the board has no pieces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Snapshot of one piece.
    #[must_use]
    pub fn state(&self, id: PieceId) -> Option<PieceState> {
        self.piece(id).map(|s| s.clone())
    }

    /// Current top-left of a piece.
    #[must_use]
    pub fn position(&self, id: PieceId) -> Option<Point> {
        self.piece(id).map(|s| s.position())
    }

    /// Whether a piece has locked.
    #[must_use]
    pub fn is_locked(&self, id: PieceId) -> Option<bool> {
        self.piece(id).map(|s| s.is_locked())
    }

    /// Number of locked pieces.
    #[must_use]
    pub fn locked_count(&self) -> usize {
        (0..self.pieces.len())
            .filter(|&i| self.is_locked(PieceId(i)) == Some(true))
            .count()
    }

    /// Whether every piece is locked.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.locked_count() == self.pieces.len()
    }

    /// Drawing order, back to front.
    #[must_use]
    pub fn z_order(&self) -> Vec<PieceId> {
        self.order().clone()
    }

    /// Move a free piece without a gesture. Returns `false` for locked or
    /// unknown pieces.
    pub fn set_position(&self, id: PieceId, position: Point) -> bool {
        let Some(mut state) = self.piece(id) else {
            return false;
        };
        if state.is_locked() {
            return false;
        }
        state.position = position;
        true
    }

    /// Scatter every free piece at random inside `area`, deterministic in
    /// `seed`. Locked pieces stay put at the back; the free pieces are
    /// stacked in their shuffled order.
    pub fn scatter(&self, area: ScatterArea, seed: u64) {
        let free: Vec<(PieceId, f64, f64)> = (0..self.pieces.len())
            .filter_map(|i| {
                let state = self.piece(PieceId(i))?;
                (!state.is_locked()).then_some((state.id, state.width, state.height))
            })
            .collect();
        let placed = scatter(&free, area, seed);
        for &(id, position) in &placed {
            self.set_position(id, position);
        }
        let mut order = self.order();
        order.retain(|id| placed.iter().all(|&(p, _)| p != *id));
        order.extend(placed.iter().map(|&(id, _)| id));
        log::debug!("scattered {} free pieces", placed.len());
    }

    /// Pick up a piece at `pointer`. Returns `false` if it is locked or
    /// unknown.
    pub fn press(&self, id: PieceId, pointer: Point) -> bool {
        {
            let Some(mut state) = self.piece(id) else {
                return false;
            };
            if state.is_locked() {
                return false;
            }
            state.grab = Some(Point::new(
                pointer.x - state.position.x,
                pointer.y - state.position.y,
            ));
        }
        self.bring_to_front(id);
        log::trace!("press {id:?} at ({}, {})", pointer.x, pointer.y);
        true
    }

    /// Drag a piece so that `pointer` minus the grab offset is its new
    /// top-left. No clamping. Returns `false` if it is locked or unknown.
    pub fn drag(&self, id: PieceId, pointer: Point) -> bool {
        let Some(mut state) = self.piece(id) else {
            return false;
        };
        if state.is_locked() {
            return false;
        }
        let offset = state.grab.unwrap_or_default();
        state.position = Point::new(pointer.x - offset.x, pointer.y - offset.y);
        true
    }

    /// Drop a piece at `pointer` and judge its placement.
    ///
    /// Without a prior press the piece does not move and is judged where
    /// it lies. Returns `None` for locked or unknown pieces.
    pub fn release(&self, id: PieceId, pointer: Point) -> Option<ReleaseOutcome> {
        let placement = {
            let mut state = self.piece(id)?;
            if state.is_locked() {
                return None;
            }
            if let Some(offset) = state.grab.take() {
                state.position = Point::new(pointer.x - offset.x, pointer.y - offset.y);
            }
            if state.within_tolerance() {
                state.position = state.target;
                state.status = PieceStatus::Locked;
                PlacementOutcome::Correct
            } else {
                PlacementOutcome::Incorrect
            }
        };
        log::debug!("release {id:?}: {placement:?}");
        emit(
            self.events.as_ref(),
            PuzzleEvent::PiecePlaced {
                piece: id,
                outcome: placement,
            },
        );

        let mut solved = false;
        if placement == PlacementOutcome::Correct {
            self.send_to_back(id);
            solved = self.is_solved();
            if solved && !self.solved_sent.swap(true, Ordering::AcqRel) {
                log::info!("puzzle solved ({} pieces)", self.pieces.len());
                emit(self.events.as_ref(), PuzzleEvent::Solved);
            }
        }
        Some(ReleaseOutcome {
            piece: id,
            placement,
            solved,
        })
    }

    /// Dispatch one pointer event. Returns the outcome for releases that
    /// were acted on; everything else (including ignored events) gives
    /// `None`.
    pub fn handle(&self, event: PointerEvent) -> Option<ReleaseOutcome> {
        let Some(pointer) = event.board_point() else {
            log::debug!("ignoring {event:?}: unusable coordinates");
            return None;
        };
        match event.action {
            PointerAction::Press => {
                self.press(event.piece, pointer);
                None
            }
            PointerAction::Move => {
                self.drag(event.piece, pointer);
                None
            }
            PointerAction::Release => self.release(event.piece, pointer),
        }
    }
}
