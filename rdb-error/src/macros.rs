/// Возвращает из функции `Err(StackError)`.
///
/// - `bail!(err)` принимает любую ошибку, из которой строится `StackError`;
/// - `bail!(code, "msg")` и `bail!(code, "fmt {}", arg)` строят
///   [`GenericError`](crate::GenericError) с кодом статуса.
///
/// ```ignore
/// use rdb_error::{bail, StatusCode};
///
/// fn buffer_size(n: usize) -> rdb_error::RdbResult<usize> {
///     if n == 0 {
///         bail!(StatusCode::InvalidArgs, "buffer size must be positive");
///     }
///     Ok(n)
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $msg:expr) => {
        return Err($crate::StackError::new($crate::GenericError::new($code, $msg)))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::StackError::new($crate::GenericError::new(
            $code,
            format!($fmt, $($arg)*),
        )))
    };
}

/// `bail!` с теми же формами аргументов, если условие ложно.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($rest:tt)+) => {
        if !($cond) {
            $crate::bail!($($rest)+);
        }
    };
}

/// Добавляет к ошибке в `Result` строку контекста, превращая её в
/// [`StackError`](crate::StackError).
pub trait ResultExt<T> {
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>;

    /// Как `context`, но строка строится только при ошибке.
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<crate::StackError>,
{
    #[track_caller]
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(ctx)),
        }
    }

    #[track_caller]
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(f())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
