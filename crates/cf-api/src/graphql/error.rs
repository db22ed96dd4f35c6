//! Mapping of `AppError` onto GraphQL error extensions.
//!
//! Clients branch on `extensions.code`; validation failures also carry
//! `invalidArgs` and friend-protocol failures a machine-readable `reason`.

use async_graphql::{Error, ErrorExtensions, Value};
use cf_core::error::{AppError, ErrorKind};

pub fn code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::BadUserInput => "BAD_USER_INPUT",
        ErrorKind::NotFound => "NOT_FOUND",
        ErrorKind::AuthenticationError => "UNAUTHENTICATED",
        ErrorKind::UnknownError => "INTERNAL_SERVER_ERROR",
    }
}

pub trait IntoGraphqlError {
    fn into_graphql(self) -> Error;
}

impl IntoGraphqlError for AppError {
    fn into_graphql(self) -> Error {
        let kind = self.kind();
        if kind == ErrorKind::UnknownError {
            tracing::error!(error = %self, "request failed");
        }

        Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", code(kind));
            match &self {
                AppError::ValidationError(errors) => {
                    let fields = errors
                        .fields()
                        .into_iter()
                        .map(|field| Value::from(field.to_string()))
                        .collect();
                    ext.set("invalidArgs", Value::List(fields));
                }
                AppError::Friendship(reason) => ext.set("reason", reason.reason()),
                _ => {}
            }
        })
    }
}

/// `.gql()` on service results; `?` alone would drop the extensions.
pub trait GqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GqlResultExt<T> for cf_core::Result<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(IntoGraphqlError::into_graphql)
    }
}

pub fn unauthenticated() -> Error {
    AppError::Unauthorized("you must be logged in".into()).into_graphql()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::{FriendshipError, ValidationErrors};

    fn extension(err: &Error, key: &str) -> Option<Value> {
        err.extensions.as_ref().and_then(|ext| ext.get(key).cloned())
    }

    #[test]
    fn test_validation_errors_list_invalid_args() {
        let err = AppError::from(ValidationErrors::single("content", "'content' field cannot be empty")).into_graphql();
        assert_eq!(extension(&err, "code"), Some(Value::from("BAD_USER_INPUT")));
        assert_eq!(
            extension(&err, "invalidArgs"),
            Some(Value::List(vec![Value::from("content")]))
        );
    }

    #[test]
    fn test_friendship_errors_carry_reason() {
        let err = AppError::from(FriendshipError::NoSuchRequest).into_graphql();
        assert_eq!(err.message, "no such friend request");
        assert_eq!(extension(&err, "reason"), Some(Value::from("NO_SUCH_REQUEST")));
    }

    #[test]
    fn test_kinds_map_to_codes() {
        let cases = [
            (AppError::not_found("Thread", "x"), "NOT_FOUND"),
            (AppError::Unauthorized("no".into()), "UNAUTHENTICATED"),
            (AppError::Internal("db down".into()), "INTERNAL_SERVER_ERROR"),
            (AppError::Conflict("email taken".into()), "BAD_USER_INPUT"),
        ];
        for (err, expected) in cases {
            assert_eq!(extension(&err.into_graphql(), "code"), Some(Value::from(expected)));
        }
    }
}
