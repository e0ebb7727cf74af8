use webcam_calibration::board::{Board, ChessboardConfig, create_default_9x9_board};

#[test]
fn test_board_init() {
    let board = create_default_9x9_board();
    assert_eq!(board.cols, 9);
    assert_eq!(board.rows, 9);
    assert_eq!(board.points_3d.len(), 81);

    // row-major, columns along x
    let p1 = board.points_3d[1];
    assert!((p1.x - 20.0).abs() < 1e-6);
    assert!(p1.y.abs() < 1e-6);

    let p9 = board.points_3d[9];
    assert!(p9.x.abs() < 1e-6);
    assert!((p9.y - 20.0).abs() < 1e-6);

    let last = board.points_3d[80];
    assert!((last.x - 160.0).abs() < 1e-6);
    assert!((last.y - 160.0).abs() < 1e-6);
    assert!(board.points_3d.iter().all(|p| p.z == 0.0));
}

#[test]
fn test_rectangular_board() {
    let config = ChessboardConfig {
        inner_cols: 7,
        inner_rows: 5,
        square_size: 25.0,
    };
    assert_eq!(config.corner_count(), 35);
    let board = Board::from_config(&config);
    assert_eq!(board.points_3d.len(), 35);
    // k = r * cols + c
    let p = board.points_3d[2 * 7 + 3];
    assert!((p.x - 75.0).abs() < 1e-6);
    assert!((p.y - 50.0).abs() < 1e-6);

    let c = board.center();
    assert!((c.x - 75.0).abs() < 1e-6);
    assert!((c.y - 50.0).abs() < 1e-6);
}

#[test]
fn test_empty_board() {
    let board = Board::init_chessboard(0, 4, 20.0);
    assert!(board.points_3d.is_empty());
}
