//! Integration tests: play a cut puzzle to completion and check the snap
//! rule on a 100x100 piece.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::mpsc;

use image::{Rgba, RgbaImage};
use jigcut_core::{
    Board, PieceId, PieceState, PlacementOutcome, Point, PointerAction, PointerEvent,
    PuzzleConfig, PuzzleEvent, ScatterArea, build_puzzle, snap_tolerance,
};

fn square_piece_board(target: Point) -> Board {
    Board::new(vec![PieceState::new(PieceId(0), target, 100.0, 100.0)])
}

/// Pick the piece up where it lies and drop it with its top-left at `at`.
fn drag_to(board: &Board, id: PieceId, at: Point) -> Option<PlacementOutcome> {
    let from = board.position(id).unwrap();
    board.handle(PointerEvent::new(id, PointerAction::Press, from.x, from.y));
    board.handle(PointerEvent::new(id, PointerAction::Move, at.x, at.y));
    board
        .handle(PointerEvent::new(id, PointerAction::Release, at.x, at.y))
        .map(|o| o.placement)
}

#[test]
fn release_ten_off_on_both_axes_locks() {
    let target = Point::new(200.0, 150.0);
    let board = square_piece_board(target);
    board.set_position(PieceId(0), Point::new(600.0, 600.0));
    let outcome = drag_to(&board, PieceId(0), Point::new(210.0, 160.0));
    assert_eq!(outcome, Some(PlacementOutcome::Correct));
    assert_eq!(board.position(PieceId(0)), Some(target));
}

#[test]
fn release_twenty_off_does_not_lock() {
    let target = Point::new(200.0, 150.0);
    let board = square_piece_board(target);
    board.set_position(PieceId(0), Point::new(600.0, 600.0));
    let outcome = drag_to(&board, PieceId(0), Point::new(220.0, 150.0));
    assert_eq!(outcome, Some(PlacementOutcome::Incorrect));
    assert_eq!(board.position(PieceId(0)), Some(Point::new(220.0, 150.0)));
    assert_eq!(board.is_locked(PieceId(0)), Some(false));
}

#[test]
fn release_just_inside_and_outside_tolerance() {
    let tolerance = snap_tolerance(100.0, 100.0);
    assert!((tolerance - 14.14).abs() < 0.01);
    let eps = 1e-3;

    let inside = square_piece_board(Point::default());
    let outcome = drag_to(&inside, PieceId(0), Point::new(tolerance - eps, 0.0));
    assert_eq!(outcome, Some(PlacementOutcome::Correct));

    let outside = square_piece_board(Point::default());
    let outcome = drag_to(&outside, PieceId(0), Point::new(tolerance + eps, 0.0));
    assert_eq!(outcome, Some(PlacementOutcome::Incorrect));
}

#[test]
fn locked_piece_stays_put() {
    let board = square_piece_board(Point::new(5.0, 5.0));
    assert_eq!(
        drag_to(&board, PieceId(0), Point::new(5.0, 5.0)),
        Some(PlacementOutcome::Correct)
    );
    board.handle(PointerEvent::new(PieceId(0), PointerAction::Move, 500.0, 500.0));
    let release = board.handle(PointerEvent::new(
        PieceId(0),
        PointerAction::Release,
        500.0,
        500.0,
    ));
    assert!(release.is_none());
    assert_eq!(board.position(PieceId(0)), Some(Point::new(5.0, 5.0)));
}

#[test]
fn cut_scatter_and_solve() {
    let image = RgbaImage::from_pixel(240, 160, Rgba([90, 120, 150, 255]));
    let config = PuzzleConfig {
        rows: 2,
        cols: 3,
        seed: Some(42.0),
        origin: Point::new(10.0, 20.0),
        ..PuzzleConfig::default()
    };
    let puzzle = build_puzzle(image, &config, None).unwrap();

    let (tx, rx) = mpsc::channel();
    let board = puzzle.board().with_events(tx);
    board.scatter(
        ScatterArea {
            x: 0.0,
            y: 400.0,
            width: 600.0,
            height: 300.0,
        },
        1,
    );
    for piece in &puzzle.pieces {
        let p = board.position(piece.id()).unwrap();
        assert!(p.y >= 400.0, "{:?} not scattered: {p:?}", piece.id());
    }

    for (i, piece) in puzzle.pieces.iter().enumerate() {
        let outcome = drag_to(&board, piece.id(), piece.target());
        assert_eq!(outcome, Some(PlacementOutcome::Correct));
        assert_eq!(board.is_solved(), i + 1 == puzzle.pieces.len());
    }
    drop(board);

    let events: Vec<_> = rx.iter().collect();
    let placed = events
        .iter()
        .filter(|e| matches!(e, PuzzleEvent::PiecePlaced { .. }))
        .count();
    assert_eq!(placed, 6);
    assert_eq!(events.last(), Some(&PuzzleEvent::Solved));
    assert_eq!(
        events.iter().filter(|e| **e == PuzzleEvent::Solved).count(),
        1
    );
}
