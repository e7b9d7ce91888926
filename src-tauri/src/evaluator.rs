use std::{
    env,
    ffi::{c_char, CStr, CString},
    fmt,
    path::{Path, PathBuf},
};

use libloading::Library;
use thiserror::Error;

use crate::{EVALUATOR_FALLBACK_RESULT, GIAC_LIBRARY_ENV, GIAC_LIBRARY_NAME};

const EVALUATE_SYMBOL: &[u8] = b"giac_evaluate\0";
const FREE_SYMBOL: &[u8] = b"giac_free\0";

type EvaluateFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type FreeFn = unsafe extern "C" fn(*mut c_char);

#[derive(Debug, Error)]
pub(crate) enum EvaluatorError {
    #[error("evaluator fallback was forced")]
    Forced,
    #[error("failed to load evaluator library {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("evaluator library {path} is missing symbol {symbol}: {source}")]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
}

pub(crate) trait Evaluator: Send + Sync {
    fn evaluate(&self, command: &str) -> String;
}

/// Stands in when the native evaluator cannot be used. The front-end treats
/// `"?"` as "compute it yourself" and switches to its WebAssembly build.
#[derive(Debug, Default)]
pub(crate) struct FallbackEvaluator;

impl Evaluator for FallbackEvaluator {
    fn evaluate(&self, _command: &str) -> String {
        EVALUATOR_FALLBACK_RESULT.to_string()
    }
}

pub(crate) struct NativeEvaluator {
    // Function pointers below are only valid while the library stays loaded.
    _library: Library,
    evaluate: EvaluateFn,
    free: FreeFn,
}

impl NativeEvaluator {
    pub(crate) fn load(path: &Path) -> Result<Self, EvaluatorError> {
        // SAFETY: loading runs the library's initializers; the library is the
        // evaluator shipped alongside the executable.
        let library = unsafe { Library::new(path) }.map_err(|source| EvaluatorError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the signatures match the exported C ABI of the evaluator.
        let evaluate = unsafe { library.get::<EvaluateFn>(EVALUATE_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|source| EvaluatorError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: "giac_evaluate",
                source,
            })?;
        let free = unsafe { library.get::<FreeFn>(FREE_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|source| EvaluatorError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: "giac_free",
                source,
            })?;

        Ok(Self {
            _library: library,
            evaluate,
            free,
        })
    }
}

impl Evaluator for NativeEvaluator {
    fn evaluate(&self, command: &str) -> String {
        let Ok(input) = CString::new(command) else {
            tracing::warn!(command, "evaluator command contains an interior NUL byte");
            return EVALUATOR_FALLBACK_RESULT.to_string();
        };

        // SAFETY: `input` outlives the call and the returned buffer is owned by
        // the library until handed back through `giac_free`.
        unsafe {
            let output = (self.evaluate)(input.as_ptr());
            if output.is_null() {
                return EVALUATOR_FALLBACK_RESULT.to_string();
            }
            let result = CStr::from_ptr(output).to_string_lossy().into_owned();
            (self.free)(output);
            result
        }
    }
}

pub(crate) struct EvaluatorHandle {
    evaluator: Box<dyn Evaluator>,
    fallback_reason: Option<String>,
}

impl EvaluatorHandle {
    /// Always yields a usable handle; load failures degrade to the stub.
    pub(crate) fn initialize(force_fallback: bool, library_path: Option<PathBuf>) -> Self {
        if force_fallback {
            tracing::debug!("forcing evaluator fallback");
            return Self::fallback(EvaluatorError::Forced.to_string());
        }

        let Some(path) = library_path.or_else(default_library_path) else {
            tracing::error!("cannot determine evaluator library location");
            return Self::fallback("evaluator library location is unknown".to_string());
        };

        match NativeEvaluator::load(&path) {
            Ok(native) => {
                tracing::debug!(path = %path.display(), "loaded native evaluator");
                Self::with_evaluator(Box::new(native))
            }
            Err(error) => {
                tracing::error!(%error, "error on loading evaluator");
                tracing::debug!("falling back to the front-end evaluator");
                Self::fallback(error.to_string())
            }
        }
    }

    pub(crate) fn with_evaluator(evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            evaluator,
            fallback_reason: None,
        }
    }

    pub(crate) fn fallback(reason: String) -> Self {
        Self {
            evaluator: Box::new(FallbackEvaluator),
            fallback_reason: Some(reason),
        }
    }

    pub(crate) fn available(&self) -> bool {
        self.fallback_reason.is_none()
    }

    pub(crate) fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    pub(crate) fn evaluate(&self, command: &str) -> String {
        self.evaluator.evaluate(command)
    }
}

impl fmt::Debug for EvaluatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorHandle")
            .field("available", &self.available())
            .field("fallback_reason", &self.fallback_reason)
            .finish()
    }
}

pub(crate) fn library_path_from_env() -> Option<PathBuf> {
    env::var(GIAC_LIBRARY_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn default_library_path() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir = exe.parent()?;
    Some(dir.join(libloading::library_filename(GIAC_LIBRARY_NAME)))
}
