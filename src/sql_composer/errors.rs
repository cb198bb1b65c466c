use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ComposeError {
    #[error(
        "Unsafe composition reached the query boundary (a poisoned fragment was interpolated where a fragment or bind value was expected)"
    )]
    UnsafeComposition,
}
