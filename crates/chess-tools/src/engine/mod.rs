pub mod position;
pub mod process;
pub mod session;
pub mod types;

pub use position::{
    ParsedPosition, build_position, describe_position, load_start_position, parse_fen_only,
    parse_position_line,
};
pub use process::{BestMoveLine, EngineConfig, EngineProcess, parse_bestmove, resolve_engine_path};
pub use session::{
    Console, DEFAULT_DEPTH, MoveEvent, SessionConfig, SessionResult, run_interactive, run_selfplay,
};
pub use types::{
    EvalLog, GameOutcome, InfoSnapshot, LineCallback, Mover, SearchOutcome, duration_to_millis,
    side_label,
};
