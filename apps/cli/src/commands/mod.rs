//! 命令定义和实现

pub mod debug;
pub mod distance;
pub mod mark;
pub mod r#move;

pub use debug::DebugCommand;
pub use distance::{DistanceCommand, LoopCommand};
pub use mark::MarkCommand;
pub use r#move::MoveCommand;
