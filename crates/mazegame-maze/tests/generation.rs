use std::collections::VecDeque;
use std::io::Write;

use mazegame_maze::{
    GeneratorMode, Maze, MazeConfig, PATH, PositionProvider, WALL, WallGenerator, build_maze,
    load_map_file,
};
use mazegame_protocol::ViewDirection;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn reachable_paths(maze: &Maze) -> usize {
    let start = (0..maze.height() as i32)
        .flat_map(|y| (0..maze.width() as i32).map(move |x| (x, y)))
        .find(|&(x, y)| maze.get(x, y) == PATH);
    let Some(start) = start else {
        return 0;
    };
    let mut seen = vec![false; maze.width() * maze.height()];
    let mut queue = VecDeque::from([start]);
    seen[start.1 as usize * maze.width() + start.0 as usize] = true;
    let mut count = 0;
    while let Some((x, y)) = queue.pop_front() {
        count += 1;
        for dir in ViewDirection::ALL {
            if !maze.is_walkable(x, y, dir) {
                continue;
            }
            let (dx, dy) = dir.delta();
            let (nx, ny) = (x + dx, y + dy);
            let idx = ny as usize * maze.width() + nx as usize;
            if !seen[idx] {
                seen[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }
    count
}

// =============================================================================
// Generation
// =============================================================================

#[test]
fn test_generate_every_path_cell_reachable() {
    for seed in 0..20 {
        let maze = WallGenerator::new(false, Some(seed)).generate(40, 30);
        assert_eq!(reachable_paths(&maze), maze.walkable_count(), "seed {seed}");
    }
}

#[test]
fn test_generate_template_keeps_outside_area() {
    let mut lines = vec!["---------------".to_string()];
    lines.push("-#############-".to_string());
    for _ in 0..13 {
        lines.push(format!("-#{}#-", ".".repeat(11)));
    }
    lines.push("-#############-".to_string());
    lines.push("---------------".to_string());
    let template = Maze::from_lines(&lines);
    let maze = WallGenerator::new(true, Some(7)).generate_into(template);

    assert_eq!(maze.to_lines()[0], "-".repeat(15));
    assert_eq!(maze.get(1, 1), WALL);
    assert_eq!(reachable_paths(&maze), maze.walkable_count());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_build_maze_map_mode_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "#####\n#...#\n#.#.#\n#...#\n#####").unwrap();

    let config = MazeConfig {
        mode: GeneratorMode::Map,
        map_file: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let maze = build_maze(&config);
    assert_eq!((maze.width(), maze.height()), (5, 5));
    assert_eq!(maze.walkable_count(), 8);
}

#[test]
fn test_build_maze_missing_map_falls_back_to_random() {
    let dir = tempfile::tempdir().unwrap();
    let config = MazeConfig {
        mode: GeneratorMode::Template,
        map_file: Some(dir.path().join("missing.txt")),
        width: 20,
        height: 16,
        seed: Some(3),
        ..Default::default()
    };
    let maze = build_maze(&config);
    assert_eq!((maze.width(), maze.height()), (20, 16));
}

#[test]
fn test_load_map_file_empty_is_error() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert!(load_map_file(file.path()).is_err());
}

// =============================================================================
// Position sampling
// =============================================================================

#[test]
fn test_sampling_never_returns_occupied_cell() {
    let maze = WallGenerator::new(false, Some(11)).generate(20, 20);
    let mut rng = StdRng::seed_from_u64(11);
    let provider = PositionProvider::new(&maze, &mut rng);

    let mut placed = 0;
    loop {
        let next = match placed % 4 {
            0 => provider.random_free(&maze, &mut rng),
            1 => provider.for_teleport(&maze, &mut rng),
            2 => provider.for_gem(&maze, &mut rng),
            _ => provider.for_trap(&maze, &mut rng),
        };
        let Some(p) = next else { break };
        assert_eq!(maze.get(p.x, p.y), PATH);
        assert!(!maze.is_occupied(p.x, p.y));
        maze.occupy(p.x, p.y);
        placed += 1;
    }
    assert_eq!(placed, provider.walkable_count());
    assert_eq!(maze.occupied_count(), placed);
}
