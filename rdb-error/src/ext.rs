use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс ошибок, которые можно положить в
/// [`StackError`](crate::StackError).
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Нужен для `StackError::downcast_ref`.
    fn as_any(&self) -> &dyn Any;
}
