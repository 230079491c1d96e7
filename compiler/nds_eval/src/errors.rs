//! Error types for evaluation.
//!
//! `EvalErrorKind` is the structured category; factory functions (e.g.
//! `division_by_zero()`) populate both `kind` and `message` and are the
//! public way to build errors. Control flow is not encoded here: break,
//! continue and return travel as [`Completion`](crate::Completion) values.

use std::fmt;

use nds_ir::Span;

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Misused control-flow construct.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MisusedSignal {
    Break,
    Continue,
    Return,
    /// `exit_function` with no active call.
    ExitWithoutCall,
}

/// Typed error category.
///
/// The `Display` impl produces the message stored on [`EvalError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Parse failure surfaced by a front end.
    Syntax {
        message: String,
    },

    // Resolution
    UndefinedVariable {
        name: String,
    },
    UndefinedFunction {
        name: String,
    },
    NotCallable {
        name: String,
        type_name: &'static str,
    },

    // Calls
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    RecursionLimit {
        limit: usize,
    },

    // Loops
    InfiniteLoopGuard {
        limit: usize,
    },
    InvalidStep,
    /// A `parallel for` domain larger than the configured cap.
    ParallelDomainTooLarge {
        iterations: usize,
        limit: usize,
    },

    // Arithmetic/operators
    DivisionByZero,
    TypeMismatch {
        expected: String,
        got: String,
    },

    MacroExpansion {
        message: String,
    },
    ControlFlowMisuse {
        signal: MisusedSignal,
    },

    // Imports
    ModuleNotFound {
        path: String,
    },
    CircularImport {
        chain: Vec<String>,
    },
    ModuleLoad {
        path: String,
        message: String,
    },

    // Collaborators
    UniverseNotInitialized,
    Universe {
        message: String,
    },
    Persistence {
        message: String,
    },

    /// A parallel-loop iteration ran past the per-call deadline.
    Timeout {
        limit_ms: u128,
    },

    Custom {
        message: String,
    },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { message } => write!(f, "syntax error: {message}"),

            Self::UndefinedVariable { name } => write!(f, "undefined variable: {name}"),
            Self::UndefinedFunction { name } => write!(f, "unknown function: {name}"),
            Self::NotCallable { name, type_name } => {
                write!(f, "'{name}' is a {type_name}, not a function")
            }

            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let plural = if *expected == 1 { "" } else { "s" };
                write!(
                    f,
                    "function '{name}' expects {expected} argument{plural}, got {got}"
                )
            }
            Self::RecursionLimit { limit } => {
                write!(f, "maximum recursion depth exceeded (limit {limit})")
            }

            Self::InfiniteLoopGuard { limit } => {
                write!(f, "while loop exceeded {limit} iterations")
            }
            Self::InvalidStep => write!(f, "range step cannot be zero"),
            Self::ParallelDomainTooLarge { iterations, limit } => write!(
                f,
                "parallel loop has {iterations} iterations, more than the limit of {limit}"
            ),

            Self::DivisionByZero => write!(f, "division by zero"),
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }

            Self::MacroExpansion { message } => write!(f, "macro expansion failed: {message}"),
            Self::ControlFlowMisuse { signal } => match signal {
                MisusedSignal::Break => write!(f, "'break' outside of a loop"),
                MisusedSignal::Continue => write!(f, "'continue' outside of a loop"),
                MisusedSignal::Return => write!(f, "'return' outside of a function"),
                MisusedSignal::ExitWithoutCall => {
                    write!(f, "cannot exit function: no active call")
                }
            },

            Self::ModuleNotFound { path } => write!(f, "module not found: {path}"),
            Self::CircularImport { chain } => {
                write!(f, "circular import: {}", chain.join(" -> "))
            }
            Self::ModuleLoad { path, message } => {
                write!(f, "cannot load module '{path}': {message}")
            }

            Self::UniverseNotInitialized => write!(f, "universe not initialized"),
            Self::Universe { message } => write!(f, "universe error: {message}"),
            Self::Persistence { message } => write!(f, "persistence error: {message}"),

            Self::Timeout { limit_ms } => {
                write!(f, "iteration timed out after {limit_ms}ms")
            }

            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Function or macro name.
    pub name: String,
    /// Position of the call site.
    pub span: Option<Span>,
}

/// Snapshot of the call stack at an error site, innermost frame first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: {}", frame.name)?;
            if let Some(span) = frame.span {
                write!(f, " at {span}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()` for factory-built errors.
    pub message: String,
    /// Position of the statement that failed.
    pub span: Option<Span>,
    /// Call stack at the error site, when raised inside a call.
    pub backtrace: Option<EvalBacktrace>,
    /// Secondary context lines.
    pub notes: Vec<String>,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_kind(EvalErrorKind::Custom { message })
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            span: None,
            backtrace: None,
            notes: Vec::new(),
        }
    }

    /// Attach a source span to this error.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach `span` only if no inner statement already did.
    #[must_use]
    pub fn or_span(mut self, span: Option<Span>) -> Self {
        if self.span.is_none() {
            self.span = span;
        }
        self
    }

    /// Attach a backtrace to this error.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(span) = self.span {
            write!(f, " (at {span})")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Factories

#[cold]
pub fn syntax_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Syntax {
        message: message.into(),
    })
}

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_function(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedFunction {
        name: name.to_string(),
    })
}

#[cold]
pub fn not_callable(name: &str, type_name: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        name: name.to_string(),
        type_name,
    })
}

#[cold]
pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn recursion_limit_exceeded(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RecursionLimit { limit })
}

#[cold]
pub fn infinite_loop_guard(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InfiniteLoopGuard { limit })
}

#[cold]
pub fn zero_step() -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidStep)
}

#[cold]
pub fn parallel_domain_too_large(iterations: usize, limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ParallelDomainTooLarge { iterations, limit })
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn invalid_operands(op: &str, left: &str, right: &str) -> EvalError {
    EvalError::new(format!("operator '{op}' cannot be applied to {left} and {right}"))
        .with_note("arithmetic works on numbers; '+' also joins two strings")
}

#[cold]
pub fn math_domain_error(function: &str) -> EvalError {
    EvalError::new(format!("math domain error in {function}"))
}

#[cold]
pub fn unknown_macro(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MacroExpansion {
        message: format!("undefined macro '{name}'"),
    })
}

#[cold]
pub fn macro_arity_mismatch(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MacroExpansion {
        message: format!("macro '{name}' expects {expected} arguments, got {got}"),
    })
}

#[cold]
pub fn macro_depth_exceeded(limit: usize, pending: &[&str]) -> EvalError {
    let err = EvalError::from_kind(EvalErrorKind::MacroExpansion {
        message: format!("maximum expansion depth {limit} exceeded"),
    });
    if pending.is_empty() {
        err
    } else {
        err.with_note(format!("still expanding: {}", pending.join(", ")))
    }
}

#[cold]
pub fn unterminated_macro_call(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MacroExpansion {
        message: format!("unterminated argument list in call to macro '{name}'"),
    })
}

#[cold]
pub fn break_outside_loop() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ControlFlowMisuse {
        signal: MisusedSignal::Break,
    })
}

#[cold]
pub fn continue_outside_loop() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ControlFlowMisuse {
        signal: MisusedSignal::Continue,
    })
}

#[cold]
pub fn return_outside_function() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ControlFlowMisuse {
        signal: MisusedSignal::Return,
    })
}

/// `return` reached the boundary of a parallel-loop iteration.
#[cold]
pub fn return_in_parallel_body() -> EvalError {
    EvalError::new("'return' cannot leave a parallel loop body")
}

#[cold]
pub fn no_active_call() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ControlFlowMisuse {
        signal: MisusedSignal::ExitWithoutCall,
    })
}

#[cold]
pub fn module_not_found(path: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuleNotFound {
        path: path.to_string(),
    })
}

#[cold]
pub fn circular_import(chain: Vec<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::CircularImport { chain })
}

#[cold]
pub fn module_load_failed(path: &str, message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ModuleLoad {
        path: path.to_string(),
        message: message.into(),
    })
}

#[cold]
pub fn imports_unavailable(path: &str) -> EvalError {
    module_load_failed(path, "no module loader configured")
}

#[cold]
pub fn universe_not_initialized() -> EvalError {
    EvalError::from_kind(EvalErrorKind::UniverseNotInitialized)
}

#[cold]
pub fn universe_failure(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Universe {
        message: message.into(),
    })
}

#[cold]
pub fn persistence_unavailable() -> EvalError {
    EvalError::from_kind(EvalErrorKind::Persistence {
        message: "no state store configured".to_string(),
    })
}

#[cold]
pub fn persistence_failure(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Persistence {
        message: message.into(),
    })
}

#[cold]
pub fn iteration_timed_out(limit_ms: u128) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Timeout { limit_ms })
}
