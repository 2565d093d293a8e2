// Session module - session context, session loop and the built-in interpreter
pub mod echo;
pub mod repl;
pub mod session;

pub use echo::LineEcho;
pub use repl::{run_session, Console, Interpreter, ReplExit, ReplMode, SessionEnd};
pub use session::{Session, SessionConfig};
