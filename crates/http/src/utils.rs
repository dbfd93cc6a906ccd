//! Internal helper macros.

/// Returns `Err($error)` from the enclosing function unless `$predicate` holds.
///
/// The parser uses it for every grammar check:
///
/// ```ignore
/// ensure!(is_token(byte), ParseError::malformed("invalid method"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
