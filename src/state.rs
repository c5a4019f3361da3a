//! State: the lifecycle of one query or mutation.
//!
//! `Idle → Loading → (Success | Error)`. `Idle` is entered (or re-entered) while
//! required inputs are absent; `Loading` once the underlying service call is
//! dispatched. Terminal states hold until the next invocation or key change.

/// Represents the state of an async operation
#[derive(Clone, PartialEq, Debug)]
pub enum State<T, E> {
    /// Nothing has been dispatched, usually because a required input is missing
    Idle,
    /// The operation is pending
    Loading,
    /// The operation completed successfully with data
    Success(T),
    /// The operation failed with an error
    Error(E),
}

impl<T, E> Default for State<T, E> {
    fn default() -> Self {
        State::Idle
    }
}

impl<T, E> From<Result<T, E>> for State<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => State::Success(data),
            Err(error) => State::Error(error),
        }
    }
}

impl<T, E> State<T, E> {
    /// Returns true if nothing has been dispatched
    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    /// Returns true if the state is currently loading
    pub fn is_loading(&self) -> bool {
        matches!(self, State::Loading)
    }

    /// Returns true if the state contains successful data
    pub fn is_success(&self) -> bool {
        matches!(self, State::Success(_))
    }

    /// Returns true if the state contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, State::Error(_))
    }

    /// Returns the data if successful, None otherwise
    pub fn data(&self) -> Option<&T> {
        match self {
            State::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error if failed, None otherwise
    pub fn error(&self) -> Option<&E> {
        match self {
            State::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Maps a State<T, E> to State<U, E> by applying a function to the contained data if successful.
    pub fn map<U, F>(self, op: F) -> State<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            State::Success(data) => State::Success(op(data)),
            State::Error(e) => State::Error(e),
            State::Loading => State::Loading,
            State::Idle => State::Idle,
        }
    }

    /// Maps a State<T, E> to State<T, F> by applying a function to the contained error if failed.
    pub fn map_err<F, O>(self, op: O) -> State<T, F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            State::Success(data) => State::Success(data),
            State::Error(e) => State::Error(op(e)),
            State::Loading => State::Loading,
            State::Idle => State::Idle,
        }
    }

    /// Chains a State<T, E> to State<U, E> by applying a function to the contained data if successful.
    pub fn and_then<U, F>(self, op: F) -> State<U, E>
    where
        F: FnOnce(T) -> State<U, E>,
    {
        match self {
            State::Success(data) => op(data),
            State::Error(e) => State::Error(e),
            State::Loading => State::Loading,
            State::Idle => State::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_idle() {
        let state: State<u32, String> = State::default();
        assert!(state.is_idle());
        assert!(state.data().is_none());
    }

    #[test]
    fn converts_results() {
        let ok: State<u32, String> = Ok(3).into();
        assert_eq!(ok.data(), Some(&3));
        let err: State<u32, String> = Err("boom".to_string()).into();
        assert_eq!(err.error().map(String::as_str), Some("boom"));
    }

    #[test]
    fn combinators_preserve_pending_states() {
        let loading: State<u32, String> = State::Loading;
        assert!(loading.map(|n| n * 2).is_loading());
        let idle: State<u32, String> = State::Idle;
        assert!(idle.and_then(|n| State::Success(n + 1)).is_idle());
        let failed: State<u32, &str> = State::Error("x");
        assert_eq!(failed.map_err(str::len), State::Error(1));
    }
}
