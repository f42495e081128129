use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into three groups that are handled very differently by callers:
///
/// ## Rewrite errors
/// - [`Error::Malformed`], [`Error::OutOfBounds`], [`Error::UnknownOpcode`],
///   [`Error::UndefinedLabel`], [`Error::BranchOutOfRange`]
///
/// These never leave the rewriter's class-level entry point: a class whose methods fail to
/// rewrite is reported as unchanged.
///
/// ## Usage errors
/// - [`Error::InvalidLabel`], [`Error::DuplicateLabel`], [`Error::KindMismatch`],
///   [`Error::AlreadyInstalled`]
///
/// These indicate a programming mistake in how symbolic inputs or the runtime were set up and
/// are surfaced synchronously.
///
/// ## Solver and I/O errors
/// - [`Error::Solver`], [`Error::Io`], [`Error::Json`]
///
/// These are recovered inside the solver channel and degrade to "no solution".
///
/// # Examples
///
/// ```rust
/// use pathcond::{Error, symbolic::SymbolicManager};
///
/// let manager = SymbolicManager::default();
/// manager.make_double("thickness", 12.0)?;
///
/// match manager.make_double("thickness", 3.0) {
///     Err(Error::DuplicateLabel(label)) => assert_eq!(label, "thickness"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// # Ok::<(), pathcond::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The instruction stream is damaged and could not be decoded or re-encoded.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding an instruction stream.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The byte at the given offset is not a known opcode.
    #[error("Unknown opcode 0x{opcode:02X} at offset {offset}")]
    UnknownOpcode {
        /// The offending opcode byte
        opcode: u8,
        /// Offset of the opcode within the method code
        offset: usize,
    },

    /// A branch refers to an offset that is not the start of an instruction.
    #[error("Branch target {0} is not an instruction boundary")]
    UndefinedLabel(u32),

    /// A relocated branch offset no longer fits into its encoding.
    #[error("Branch offset {offset} does not fit into {size} bytes")]
    BranchOutOfRange {
        /// The required relative offset
        offset: i64,
        /// Size of the offset field in bytes
        size: u8,
    },

    /// A symbolic label is empty or contains whitespace.
    #[error("Invalid label: \"{0}\"")]
    InvalidLabel(String),

    /// A symbolic label was already used since the last reset.
    #[error("Duplicate label: \"{0}\"")]
    DuplicateLabel(String),

    /// The concrete value does not belong to the requested symbolic kind.
    #[error("Value {value} can not be made symbolic as {kind}")]
    KindMismatch {
        /// The requested kind
        kind: String,
        /// Display form of the offending value
        value: String,
    },

    /// The process-wide dispatcher has already been installed.
    #[error("The runtime dispatcher is already installed")]
    AlreadyInstalled,

    /// The constraint solver answered with something that could not be understood.
    #[error("Solver error - {0}")]
    Solver(String),

    /// I/O error on the solver connection.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding of a solver message failed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
